//! # TAG Protocol Constants and Types
//!
//! Core definitions for the Tamagawa TAG streaming protocol.
//!
//! Frames are CR LF terminated. Every frame starts with a 5-byte `$TSC,` header,
//! followed by a 4-byte marker that classifies it:
//!
//! ```text
//! offset:  0    5    9  11  13  15        21        27        33      56  58
//!          $TSC,BIN,  ..|cnt|.. |gyro xyz |acc xyz  |rpy      | ...   |\r\n|
//! ```
//!
//! A measurement frame is 58 bytes on the wire, its own CR LF included, so
//! consecutive frames follow each other with no bytes in between.
//! All binary fields are signed 16-bit big-endian.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::TagImuError;

/// Frame delimiter (CR LF)
pub const TAG_DELIMITER: &[u8; 2] = b"\r\n";

/// Offset of the classification marker
pub const TAG_MARKER_OFFSET: usize = 5;

/// Length of the classification marker
pub const TAG_MARKER_LEN: usize = 4;

/// Minimum frame length needed to read the marker
pub const TAG_MIN_FRAME_LEN: usize = TAG_MARKER_OFFSET + TAG_MARKER_LEN;

/// Measurement frame length on the wire, CR LF included
pub const TAG_MEASUREMENT_FRAME_LEN: usize = 58;

/// Measurement frame length once the delimiter is stripped
pub const TAG_MEASUREMENT_PAYLOAD_LEN: usize = TAG_MEASUREMENT_FRAME_LEN - TAG_DELIMITER.len();

/// Measurement frame marker
pub const TAG_MARKER_BIN: &[u8; 4] = b"BIN,";

/// Version response marker
pub const TAG_MARKER_VER: &[u8; 4] = b"VER,";

/// Streaming rate parameter sent with the start command
pub const TAG_STREAMING_RATE: u32 = 30;

/// Streaming start command text (`$TSC,BIN,<rate>`), sent once at startup
pub const TAG_START_STREAMING: &str = "$TSC,BIN,30";

/// Serial baud rate required by the device
pub const TAG_BAUD_RATE: u32 = 115_200;

/// Full-scale divisor for every 16-bit field (2^15)
pub const TAG_LSB_DIVISOR: f64 = 32768.0;

/// Gyro full scale in deg/s
pub const TAG_GYRO_FULL_SCALE_DPS: f64 = 200.0;

/// Accelerometer full scale in m/s^2
pub const TAG_ACCEL_FULL_SCALE_MPS2: f64 = 100.0;

/// Attitude full scale in degrees
pub const TAG_ATTITUDE_FULL_SCALE_DEG: f64 = 180.0;

/// Binary fields of a measurement frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Counter,
    GyroX,
    GyroY,
    GyroZ,
    AccelX,
    AccelY,
    AccelZ,
    Roll,
    Pitch,
    Yaw,
}

impl Field {
    /// Every field, in frame order
    pub const ALL: [Field; 10] = [
        Field::Counter,
        Field::GyroX,
        Field::GyroY,
        Field::GyroZ,
        Field::AccelX,
        Field::AccelY,
        Field::AccelZ,
        Field::Roll,
        Field::Pitch,
        Field::Yaw,
    ];

    /// Offset of the high byte. The low byte follows it.
    ///
    /// Vendor layout, kept bit-for-bit. Bytes 13-14 are not used.
    pub const fn offset(self) -> usize {
        match self {
            Field::Counter => 11,
            Field::GyroX => 15,
            Field::GyroY => 17,
            Field::GyroZ => 19,
            Field::AccelX => 21,
            Field::AccelY => 23,
            Field::AccelZ => 25,
            Field::Roll => 27,
            Field::Pitch => 29,
            Field::Yaw => 31,
        }
    }
}

/// Raw counts extracted from a measurement frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawMeasurement {
    /// Frame counter (informational only)
    pub counter: i16,

    /// Gyro counts `[x, y, z]`
    pub gyro: [i16; 3],

    /// Accelerometer counts `[x, y, z]`
    pub accel: [i16; 3],

    /// Attitude counts `[roll, pitch, yaw]`
    pub attitude: [i16; 3],
}

/// Three-component vector
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Orientation quaternion in `(x, y, z, w)` order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    /// Identity rotation `(0, 0, 0, 1)`
    pub const IDENTITY: Quaternion = Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    /// Euclidean norm
    pub fn norm(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt()
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A decoded IMU sample, ready for publishing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedSample {
    /// Frame identifier (from configuration)
    pub frame_id: String,

    /// Capture time on the host
    pub stamp: DateTime<Utc>,

    /// Device frame counter, reinterpreted as unsigned
    pub counter: u16,

    /// Orientation (unit quaternion)
    pub orientation: Quaternion,

    /// Angular velocity in rad/s
    pub angular_velocity: Vector3,

    /// Linear acceleration in m/s^2
    pub linear_acceleration: Vector3,
}

impl Default for DecodedSample {
    /// Idle value before any frame arrives
    fn default() -> Self {
        Self {
            frame_id: String::new(),
            stamp: DateTime::<Utc>::UNIX_EPOCH,
            counter: 0,
            orientation: Quaternion::IDENTITY,
            angular_velocity: Vector3::default(),
            linear_acceleration: Vector3::default(),
        }
    }
}

/// Operator commands accepted by the device
///
/// The streaming start command is not one of them, see [`TAG_START_STREAMING`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRequest {
    /// Firmware version query (`$TSC,VER`)
    VersionQuery,

    /// Offset cancel with parameter (`$TSC,OFC,<p>`)
    OffsetCancel(i32),

    /// Heading reset (`$TSC,HRST`)
    HeadingReset,
}

impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandRequest::VersionQuery => write!(f, "$TSC,VER"),
            CommandRequest::OffsetCancel(param) => write!(f, "$TSC,OFC,{}", param),
            CommandRequest::HeadingReset => write!(f, "$TSC,HRST"),
        }
    }
}

impl FromStr for CommandRequest {
    type Err = TagImuError;

    /// Parse console text: `ver`, `ofc <int>` or `hrst` (case-insensitive)
    ///
    /// Anything after `hrst` is ignored, the device takes no heading-reset payload.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let verb = parts
            .next()
            .ok_or_else(|| TagImuError::CommandParse("empty command".to_string()))?;

        match verb.to_ascii_lowercase().as_str() {
            "ver" => Ok(CommandRequest::VersionQuery),
            "hrst" => Ok(CommandRequest::HeadingReset),
            "ofc" => {
                let arg = parts.next().ok_or_else(|| {
                    TagImuError::CommandParse("ofc requires an integer parameter".to_string())
                })?;
                let param = arg.parse::<i32>().map_err(|e| {
                    TagImuError::CommandParse(format!("invalid ofc parameter '{}': {}", arg, e))
                })?;
                Ok(CommandRequest::OffsetCancel(param))
            }
            other => Err(TagImuError::CommandParse(format!("unknown command '{}'", other))),
        }
    }
}
