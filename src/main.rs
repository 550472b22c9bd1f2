//! # TAG IMU Bridge
//!
//! Stream decoded samples from a Tamagawa TAG IMU as JSON Lines.
//!
//! Samples go to stdout, logs go to stderr (or a rolling file). Commands are read
//! from stdin: `ver`, `ofc <int>`, `hrst`.

use anyhow::{anyhow, Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use tag_imu_bridge::config::{Config, LoggingConfig};
use tag_imu_bridge::driver::{console, Driver};
use tag_imu_bridge::serial::ImuSerial;
use tag_imu_bridge::telemetry::{spawn_sink_thread, JsonlSink};

/// Log file name prefix inside `logging.dir`
const LOG_FILE_PREFIX: &str = "tag-imu-bridge.log";

/// Main entry point for TAG IMU Bridge
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration (first argument, defaults otherwise)
///    - Set up logging with tracing subscriber
///    - Open the serial port (fatal on failure)
///
/// 2. **Main Loop**
///    - Send `$TSC,BIN,30` to start streaming
///    - Publish every measurement frame as one JSON line on stdout (own thread)
///    - Forward console commands to the device
///
/// 3. **Graceful Shutdown**
///    - Ctrl+C cancels the driver within one read timeout
///    - Log counters and close the port
///
/// # Errors
///
/// Returns error (non-zero exit) if the configuration is invalid or the serial
/// port cannot be opened, or if the link fails while running.
///
/// # Examples
///
/// ```bash
/// cargo run --release -- config/default.toml > samples.jsonl
/// ```
#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => Config::default(),
    };

    let _log_guard = init_logging(&config.logging);

    info!("TAG IMU Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let serial = ImuSerial::open(&config.serial)?;
    let device_path = serial.device_path().to_string();

    let (cmd_tx, cmd_rx) = mpsc::channel(config.commands.queue_depth);
    if config.commands.console {
        // Blocking stdin lives on its own thread so it never holds up runtime shutdown
        std::thread::spawn(move || {
            let queued = console::forward_lines(std::io::stdin().lock(), cmd_tx);
            info!("Console input closed after {} commands", queued);
        });
    } else {
        drop(cmd_tx);
    }

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down..."),
            Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
        }
        shutdown.cancel();
    });

    info!("Press Ctrl+C to exit");

    // stdout writes block, so they stay off the runtime
    let (sink, sink_thread) = spawn_sink_thread(JsonlSink::stdout())?;

    let mut driver = Driver::new(&config, sink);
    let result = driver.run(serial.into_stream(), cmd_rx, cancel).await;

    let stats = driver.stats();
    info!(
        "Total samples published: {} ({} frames rejected, {} commands sent)",
        stats.samples_published, stats.frames_rejected, stats.commands_sent
    );

    // Closing the channel lets the sink thread drain and exit
    drop(driver);
    sink_thread
        .join()
        .map_err(|_| anyhow!("sample sink thread panicked"))?;

    ImuSerial::close(result?, &device_path)?;
    Ok(())
}

/// Install the tracing subscriber
///
/// `RUST_LOG` overrides the configured level. Returns the guard that flushes the
/// file writer; keep it alive until exit.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = build_filter(config);

    match &config.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_ascii_lowercase()))
}
