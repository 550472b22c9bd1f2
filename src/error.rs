//! # Error Types
//!
//! Custom error types for TAG IMU Bridge using `thiserror`.

use thiserror::Error;

/// Frame-level decode errors
///
/// None of these are fatal: the frame is dropped and the read loop continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Frame is too short to carry a classification marker
    #[error("frame too short: {len} bytes, need at least {min}")]
    TooShort { len: usize, min: usize },

    /// Marker at offset 5 is neither `BIN,` nor `VER,`
    #[error("unknown frame marker: {marker:02X?}")]
    MarkerMismatch { marker: [u8; 4] },

    /// Measurement frame has the wrong total length
    #[error("measurement frame length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Main error type for TAG IMU Bridge
#[derive(Debug, Error)]
pub enum TagImuError {
    /// Frame decode errors
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Serial device could not be opened or configured
    #[error("failed to open serial channel: {0}")]
    ChannelOpen(String),

    /// Command could not be written to the serial channel
    #[error("serial write error: {0}")]
    Write(String),

    /// Console text did not parse into a command
    #[error("invalid command: {0}")]
    CommandParse(String),

    /// Sample sink rejected a sample
    #[error("sample sink error: {0}")]
    Sink(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for TAG IMU Bridge
pub type Result<T> = std::result::Result<T, TagImuError>;
