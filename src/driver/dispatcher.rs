//! # Command Dispatcher
//!
//! Serializes commands and writes them to the shared serial write path.

use std::fmt::Display;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::{Result, TagImuError};
use crate::serial::port_trait::SerialPortIO;
use crate::tag::encoder::{encode_command, encode_start_streaming};
use crate::tag::protocol::{CommandRequest, TAG_START_STREAMING};

/// Sends commands to the device
///
/// The write path sits behind an async mutex so commands from any task go out
/// whole, one at a time. No response is awaited.
pub struct CommandDispatcher<P> {
    port: Arc<Mutex<P>>,
}

impl<P> Clone for CommandDispatcher<P> {
    fn clone(&self) -> Self {
        Self { port: Arc::clone(&self.port) }
    }
}

impl<P: SerialPortIO> CommandDispatcher<P> {
    pub fn new(port: P) -> Self {
        Self { port: Arc::new(Mutex::new(port)) }
    }

    /// Write one command as a single CR LF terminated string
    ///
    /// # Errors
    ///
    /// Returns `TagImuError::Write` if the write or flush fails
    pub async fn dispatch(&self, command: &CommandRequest) -> Result<()> {
        self.send(&encode_command(command), command).await
    }

    /// Send the streaming start command (`$TSC,BIN,30`)
    pub async fn start_streaming(&self) -> Result<()> {
        self.send(&encode_start_streaming(), TAG_START_STREAMING).await
    }

    async fn send(&self, bytes: &[u8], label: impl Display) -> Result<()> {
        let mut port = self.port.lock().await;
        port.write_all(bytes)
            .await
            .map_err(|e| TagImuError::Write(format!("Failed to send {}: {}", label, e)))?;
        port.flush()
            .await
            .map_err(|e| TagImuError::Write(format!("Failed to flush after {}: {}", label, e)))?;

        info!("Sent command: {}", label);
        Ok(())
    }

    /// Recover the write path once no other clone is alive
    pub fn into_inner(self) -> Option<P> {
        Arc::try_unwrap(self.port).ok().map(Mutex::into_inner)
    }
}
