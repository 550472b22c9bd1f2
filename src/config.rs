//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TagImuError};
use crate::tag::protocol::TAG_BAUD_RATE;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub imu: ImuConfig,

    #[serde(default)]
    pub commands: CommandConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// IMU output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ImuConfig {
    #[serde(default = "default_frame_id")]
    pub frame_id: String,
}

/// Command queue configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CommandConfig {
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    #[serde(default = "default_console")]
    pub console: bool,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for a daily rolling log file; stderr only when unset
    #[serde(default)]
    pub dir: Option<String>,
}

// Default value functions
fn default_serial_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_baud_rate() -> u32 { TAG_BAUD_RATE }
fn default_read_timeout_ms() -> u64 { 1000 }

fn default_frame_id() -> String { "imu".to_string() }

fn default_queue_depth() -> usize { 10 }
fn default_console() -> bool { true }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for ImuConfig {
    fn default() -> Self {
        Self { frame_id: default_frame_id() }
    }
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            queue_depth: default_queue_depth(),
            console: default_console(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

impl SerialConfig {
    /// Read timeout as a `Duration`
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tag_imu_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        // The device only speaks 115200 8N1
        if self.serial.baud_rate != TAG_BAUD_RATE {
            return Err(invalid(format!("baud_rate must be {}", TAG_BAUD_RATE)));
        }

        if self.serial.read_timeout_ms == 0 || self.serial.read_timeout_ms > 10000 {
            return Err(invalid("read_timeout_ms must be between 1 and 10000"));
        }

        if self.imu.frame_id.trim().is_empty() {
            return Err(invalid("imu frame_id cannot be empty"));
        }

        if self.commands.queue_depth == 0 || self.commands.queue_depth > 1000 {
            return Err(invalid("queue_depth must be between 1 and 1000"));
        }

        if !["trace", "debug", "info", "warn", "error"]
            .contains(&self.logging.level.to_ascii_lowercase().as_str())
        {
            return Err(invalid("log level must be one of: trace, debug, info, warn, error"));
        }

        if matches!(&self.logging.dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging dir cannot be empty when set"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> TagImuError {
    TagImuError::Config(toml::de::Error::custom(msg))
}
