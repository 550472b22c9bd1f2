//! # TAG Frame Decoder
//!
//! Classifies raw frames and extracts the binary fields of measurement frames.

use super::protocol::*;
use crate::error::FrameError;

/// A classified frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame<'a> {
    /// Measurement frame (`BIN,`) with its raw counts
    Measurement(RawMeasurement),

    /// Version response (`VER,`), raw text passed through
    Version(&'a [u8]),
}

/// Length-checked view over a measurement frame
///
/// Can only be built over a frame that is [`TAG_MEASUREMENT_FRAME_LEN`] bytes on the
/// wire, so field reads never leave the buffer.
#[derive(Debug, Clone, Copy)]
pub struct MeasurementFrame<'a> {
    bytes: &'a [u8],
}

impl<'a> MeasurementFrame<'a> {
    /// Wrap a frame, with or without its trailing CR LF
    ///
    /// # Errors
    ///
    /// Returns `FrameError::LengthMismatch` unless the frame is 58 bytes with its delimiter
    pub fn new(frame: &'a [u8]) -> Result<Self, FrameError> {
        let bytes = strip_delimiter(frame);
        if bytes.len() != TAG_MEASUREMENT_PAYLOAD_LEN {
            return Err(length_mismatch(bytes));
        }
        Ok(Self { bytes })
    }

    /// Read one signed 16-bit big-endian field
    pub fn field(&self, field: Field) -> Result<i16, FrameError> {
        let offset = field.offset();
        match self.bytes.get(offset..offset + 2) {
            Some(&[high, low]) => Ok(i16::from_be_bytes([high, low])),
            _ => Err(length_mismatch(self.bytes)),
        }
    }

    pub fn counter(&self) -> Result<i16, FrameError> {
        self.field(Field::Counter)
    }

    /// Gyro counts `[x, y, z]`
    pub fn gyro(&self) -> Result<[i16; 3], FrameError> {
        Ok([
            self.field(Field::GyroX)?,
            self.field(Field::GyroY)?,
            self.field(Field::GyroZ)?,
        ])
    }

    /// Accelerometer counts `[x, y, z]`
    pub fn accel(&self) -> Result<[i16; 3], FrameError> {
        Ok([
            self.field(Field::AccelX)?,
            self.field(Field::AccelY)?,
            self.field(Field::AccelZ)?,
        ])
    }

    /// Attitude counts `[roll, pitch, yaw]`
    pub fn attitude(&self) -> Result<[i16; 3], FrameError> {
        Ok([
            self.field(Field::Roll)?,
            self.field(Field::Pitch)?,
            self.field(Field::Yaw)?,
        ])
    }

    /// Extract all ten fields
    pub fn raw(&self) -> Result<RawMeasurement, FrameError> {
        Ok(RawMeasurement {
            counter: self.counter()?,
            gyro: self.gyro()?,
            accel: self.accel()?,
            attitude: self.attitude()?,
        })
    }
}

/// Drop one trailing CR LF, if present
fn strip_delimiter(frame: &[u8]) -> &[u8] {
    frame.strip_suffix(TAG_DELIMITER).unwrap_or(frame)
}

/// Lengths are reported as seen on the wire, delimiter included
fn length_mismatch(payload: &[u8]) -> FrameError {
    FrameError::LengthMismatch {
        expected: TAG_MEASUREMENT_FRAME_LEN,
        actual: payload.len() + TAG_DELIMITER.len(),
    }
}

/// Decode a raw frame
///
/// # Arguments
///
/// * `frame` - One frame, with its CR LF or with the delimiter already stripped
///
/// # Returns
///
/// * `Result<Frame>` - Measurement counts or version text
///
/// # Errors
///
/// Returns error if:
/// - Frame is shorter than 9 bytes (`TooShort`)
/// - Marker is neither `BIN,` nor `VER,` (`MarkerMismatch`)
/// - A `BIN,` frame is not exactly 58 bytes with its CR LF (`LengthMismatch`)
pub fn decode_frame(frame: &[u8]) -> Result<Frame<'_>, FrameError> {
    let frame = strip_delimiter(frame);
    if frame.len() < TAG_MIN_FRAME_LEN {
        return Err(FrameError::TooShort {
            len: frame.len(),
            min: TAG_MIN_FRAME_LEN,
        });
    }

    let mut marker = [0u8; TAG_MARKER_LEN];
    marker.copy_from_slice(&frame[TAG_MARKER_OFFSET..TAG_MIN_FRAME_LEN]);

    if &marker == TAG_MARKER_BIN {
        let view = MeasurementFrame::new(frame)?;
        Ok(Frame::Measurement(view.raw()?))
    } else if &marker == TAG_MARKER_VER {
        Ok(Frame::Version(frame))
    } else {
        Err(FrameError::MarkerMismatch { marker })
    }
}

/// Build a wire-ready measurement frame from raw counts
///
/// Header and unused bytes are filled with the `$TSC,BIN,` prefix and zeros, and the
/// last two bytes are the CR LF delimiter. Used to synthesise frames for replay and tests.
pub fn build_measurement_frame(raw: &RawMeasurement) -> [u8; TAG_MEASUREMENT_FRAME_LEN] {
    let mut frame = [0u8; TAG_MEASUREMENT_FRAME_LEN];
    frame[..TAG_MARKER_OFFSET].copy_from_slice(b"$TSC,");
    frame[TAG_MARKER_OFFSET..TAG_MIN_FRAME_LEN].copy_from_slice(TAG_MARKER_BIN);

    let values = [
        raw.counter,
        raw.gyro[0],
        raw.gyro[1],
        raw.gyro[2],
        raw.accel[0],
        raw.accel[1],
        raw.accel[2],
        raw.attitude[0],
        raw.attitude[1],
        raw.attitude[2],
    ];
    for (field, value) in Field::ALL.iter().zip(values) {
        let offset = field.offset();
        frame[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }
    frame[TAG_MEASUREMENT_PAYLOAD_LEN..].copy_from_slice(TAG_DELIMITER);

    frame
}
