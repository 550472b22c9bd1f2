//! # Driver Module
//!
//! Runs the TAG IMU link: frame reading, decoding, publishing and command writes.
//!
//! This module handles:
//! - Sending the streaming start command
//! - The read loop (synchronize, decode, convert, publish)
//! - The write loop (queued commands to the device)
//! - Cooperative shutdown through a `CancellationToken`
//!
//! The reader and the writer run as separate tasks on split halves of the port, so a
//! command never waits behind a blocked frame read or a slow sink. Only the write half
//! is shared, behind the dispatcher's mutex.

pub mod console;
pub mod dispatcher;

pub use dispatcher::CommandDispatcher;

use std::io;
use std::time::Duration;

use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::Config;
use crate::error::{Result, TagImuError};
use crate::serial::port_trait::{SerialPortIO, TokioSerialPort};
use crate::tag::convert::to_sample;
use crate::tag::decoder::{decode_frame, Frame};
use crate::tag::protocol::CommandRequest;
use crate::tag::sync::FrameSynchronizer;
use crate::telemetry::SampleSink;

/// Number of published samples between status log messages
const LOG_INTERVAL_SAMPLES: u64 = 1000;

/// Counters kept by the driver
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DriverStats {
    /// Measurement frames decoded and published
    pub samples_published: u64,

    /// Frames dropped by the decoder
    pub frames_rejected: u64,

    /// Version responses received
    pub version_responses: u64,

    /// Reads that hit the timeout
    pub read_timeouts: u64,

    /// Samples the sink failed to take
    pub sink_failures: u64,

    /// Commands written, including the start command
    pub commands_sent: u64,

    /// Command writes that failed
    pub command_failures: u64,
}

/// TAG IMU driver
///
/// Owns the sink and the per-link settings. The serial stream is lent to [`Driver::run`]
/// and handed back when it returns.
pub struct Driver<K> {
    frame_id: String,
    read_timeout: Duration,
    sink: K,
    stats: DriverStats,
}

impl<K: SampleSink> Driver<K> {
    /// Create a driver from configuration
    pub fn new(config: &Config, sink: K) -> Self {
        Self::with_settings(config.imu.frame_id.clone(), config.serial.read_timeout(), sink)
    }

    pub fn with_settings(frame_id: impl Into<String>, read_timeout: Duration, sink: K) -> Self {
        Self {
            frame_id: frame_id.into(),
            read_timeout,
            sink,
            stats: DriverStats::default(),
        }
    }

    pub fn stats(&self) -> DriverStats {
        self.stats
    }

    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Decode one raw frame and publish it if it is a measurement
    ///
    /// Rejected frames are dropped silently (debug log only). Version responses
    /// are logged for diagnostics.
    pub fn handle_frame(&mut self, frame: &[u8]) {
        match decode_frame(frame) {
            Ok(Frame::Measurement(raw)) => {
                let sample = to_sample(&self.frame_id, Utc::now(), &raw);

                match self.sink.publish(&sample) {
                    Ok(()) => {
                        self.stats.samples_published += 1;
                        if self.stats.samples_published % LOG_INTERVAL_SAMPLES == 0 {
                            info!(
                                "Published {} samples ({} frames rejected)",
                                self.stats.samples_published, self.stats.frames_rejected
                            );
                        }
                    }
                    Err(e) => {
                        self.stats.sink_failures += 1;
                        warn!("Failed to publish sample {}: {}", sample.counter, e);
                    }
                }
            }
            Ok(Frame::Version(text)) => {
                self.stats.version_responses += 1;
                info!("Version response: {}", String::from_utf8_lossy(text));
            }
            Err(e) => {
                self.stats.frames_rejected += 1;
                debug!("Discarding frame ({} bytes): {}", frame.len(), e);
            }
        }
    }

    /// Run the link until cancelled
    ///
    /// The read loop runs on the calling task and the write loop on a spawned one.
    /// # Arguments
    ///
    /// * `stream` - Opened serial stream (or any full-duplex byte stream)
    /// * `commands` - Queue of commands to send; closing it does not stop reading
    /// * `cancel` - Shutdown signal
    ///
    /// # Returns
    ///
    /// * `Result<T>` - The stream, handed back after a clean shutdown
    ///
    /// # Errors
    ///
    /// Returns error if the link fails or reaches end of stream. A failed start
    /// command or command write is logged and counted, never returned.
    pub async fn run<T>(
        &mut self,
        stream: T,
        commands: mpsc::Receiver<CommandRequest>,
        cancel: CancellationToken,
    ) -> Result<T>
    where
        T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let dispatcher = CommandDispatcher::new(TokioSerialPort::new(writer));

        match dispatcher.start_streaming().await {
            Ok(()) => self.stats.commands_sent += 1,
            Err(e) => {
                self.stats.command_failures += 1;
                warn!("Streaming start command failed: {}", e);
            }
        }

        // Child token: the reader stops the writer on link failure without
        // cancelling the caller's token.
        let stop = cancel.child_token();
        let mut sync = FrameSynchronizer::new(reader, self.read_timeout);

        // Stops the writer task even if this future is dropped mid-run
        let _stop_guard = stop.clone().drop_guard();
        let write_task = {
            let dispatcher = dispatcher.clone();
            let stop = stop.clone();
            tokio::spawn(async move { write_loop(&dispatcher, commands, &stop).await })
        };

        info!("Reading TAG frames (read timeout {:?})", self.read_timeout);
        let read_result = self.read_loop(&mut sync, &stop).await;

        // The read loop cancels `stop` on exit, so the writer is already winding down
        let (sent, failed) = write_task
            .await
            .map_err(|e| TagImuError::Io(io::Error::other(format!("command writer failed: {}", e))))?;
        self.stats.commands_sent += sent;
        self.stats.command_failures += failed;

        info!("Driver stopped: {:?}", self.stats);
        read_result?;

        let reader = sync.into_inner();
        let writer = dispatcher
            .into_inner()
            .ok_or_else(|| TagImuError::Io(io::Error::other("command writer still shared")))?
            .into_inner();
        Ok(reader.unsplit(writer))
    }

    async fn read_loop<R>(
        &mut self,
        sync: &mut FrameSynchronizer<R>,
        stop: &CancellationToken,
    ) -> Result<()>
    where
        R: AsyncRead + Unpin,
    {
        let result = loop {
            if stop.is_cancelled() {
                break Ok(());
            }

            tokio::select! {
                biased;

                _ = stop.cancelled() => break Ok(()),

                frame = sync.next_frame() => match frame {
                    Ok(Some(frame)) => self.handle_frame(&frame),
                    Ok(None) => {
                        self.stats.read_timeouts += 1;
                        trace!("No frame within {:?}", sync.read_timeout());
                    }
                    Err(e) => {
                        error!("Serial read failed: {}", e);
                        break Err(TagImuError::Io(e));
                    }
                },
            }
        };

        stop.cancel();
        result
    }
}

/// Send queued commands until stopped
///
/// # Returns
///
/// * `(u64, u64)` - Commands sent and commands that failed
pub async fn write_loop<P: SerialPortIO>(
    dispatcher: &CommandDispatcher<P>,
    mut commands: mpsc::Receiver<CommandRequest>,
    stop: &CancellationToken,
) -> (u64, u64) {
    let mut sent = 0;
    let mut failed = 0;

    loop {
        tokio::select! {
            biased;

            _ = stop.cancelled() => break,

            command = commands.recv() => match command {
                Some(command) => match dispatcher.dispatch(&command).await {
                    Ok(()) => sent += 1,
                    Err(e) => {
                        failed += 1;
                        warn!("{}", e);
                    }
                },
                None => {
                    debug!("Command queue closed");
                    stop.cancelled().await;
                    break;
                }
            },
        }
    }

    (sent, failed)
}
