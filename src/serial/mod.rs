//! # Serial Communication Module
//!
//! Handles the serial link to the TAG IMU.
//!
//! This module handles:
//! - Opening the serial port at 115,200 baud, 8N1, no flow control
//! - Exposing the stream for the reader / writer split
//! - Closing the port on shutdown

pub mod port_trait;

use crate::config::SerialConfig;
use crate::error::{Result, TagImuError};
use crate::tag::protocol::TAG_BAUD_RATE;
use tracing::{debug, info};

/// TAG IMU serial port handler
pub struct ImuSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for ImuSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImuSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ImuSerial {
    /// Open the configured serial device
    ///
    /// # Arguments
    ///
    /// * `config` - Serial configuration (device path, baud rate)
    ///
    /// # Returns
    ///
    /// * `Result<ImuSerial>` - Opened serial port or error
    ///
    /// # Errors
    ///
    /// Returns `TagImuError::ChannelOpen` if the device cannot be opened or configured
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tag_imu_bridge::config::SerialConfig;
    /// use tag_imu_bridge::serial::ImuSerial;
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let serial = ImuSerial::open(&SerialConfig::default())?;
    ///     println!("Connected to: {}", serial.device_path());
    ///     Ok(())
    /// }
    /// ```
    pub fn open(config: &SerialConfig) -> Result<Self> {
        debug!("Opening serial port: {}", config.port);

        let port = Self::open_port(&config.port, config.baud_rate)?;
        info!("Successfully opened TAG IMU at {} ({} baud, 8N1)", config.port, config.baud_rate);

        Ok(Self {
            port,
            device_path: config.port.clone(),
        })
    }

    /// Open a specific serial port with TAG settings
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        use tokio_serial::SerialPortBuilderExt;

        if baud_rate != TAG_BAUD_RATE {
            return Err(TagImuError::ChannelOpen(format!(
                "Unsupported baud rate {} for {} (device requires {})",
                baud_rate, path, TAG_BAUD_RATE
            )));
        }

        tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TagImuError::ChannelOpen(format!("Failed to open {}: {}", path, e)))
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Hand out the stream for the driver
    pub fn into_stream(self) -> tokio_serial::SerialStream {
        self.port
    }

    /// Close a stream returned by the driver
    ///
    /// Bytes still queued in either direction are discarded, so a partial frame or an
    /// unsent command does not leak into the next owner of the device. Dropping the
    /// stream releases the exclusive lock and the descriptor.
    ///
    /// The line settings applied by [`ImuSerial::open`] (115200 8N1, no flow control)
    /// stay in effect: tokio-serial neither records nor restores the terminal settings
    /// the device had before it was opened. Restoring them is up to whoever owns the
    /// device afterwards, e.g. `stty -F <device> sane`.
    ///
    /// # Errors
    ///
    /// Returns `TagImuError::Io` if the buffers cannot be flushed; the port is closed
    /// either way
    pub fn close(stream: tokio_serial::SerialStream, device_path: &str) -> Result<()> {
        use tokio_serial::SerialPort;

        let cleared = stream.clear(tokio_serial::ClearBuffer::All);
        drop(stream);
        info!("Port {} closed", device_path);

        cleared.map_err(|e| {
            TagImuError::Io(std::io::Error::other(format!(
                "Failed to discard buffers on {}: {}",
                device_path, e
            )))
        })
    }
}
