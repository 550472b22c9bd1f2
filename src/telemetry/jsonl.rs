//! JSONL sample writer

use std::io::Write;

use super::SampleSink;
use crate::error::{Result, TagImuError};
use crate::tag::protocol::DecodedSample;

/// Writes one JSON object per sample, newline separated
///
/// ```text
/// {"frame_id":"imu","stamp":"2024-05-01T12:00:00.123Z","counter":17,"orientation":{...},...}
/// ```
pub struct JsonlSink<W> {
    writer: W,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonlSink<std::io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> SampleSink for JsonlSink<W> {
    fn publish(&mut self, sample: &DecodedSample) -> Result<()> {
        serde_json::to_writer(&mut self.writer, sample)
            .map_err(|e| TagImuError::Sink(format!("Failed to serialize sample: {}", e)))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::protocol::{Quaternion, Vector3};
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_writes_one_line_per_sample() {
        let mut sink = JsonlSink::new(Vec::new());
        sink.publish(&DecodedSample::default()).unwrap();
        sink.publish(&DecodedSample::default()).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(output.lines().count(), 2);
        assert!(output.ends_with('\n'));
    }

    #[test]
    fn test_sample_json_shape() {
        let sample = DecodedSample {
            frame_id: "imu".to_string(),
            stamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            counter: 17,
            orientation: Quaternion::IDENTITY,
            angular_velocity: Vector3::new(0.5, 0.0, -0.5),
            linear_acceleration: Vector3::new(0.0, 0.0, 9.75),
        };

        let mut sink = JsonlSink::new(Vec::new());
        sink.publish(&sample).unwrap();

        let line = String::from_utf8(sink.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();

        assert_eq!(value["frame_id"], "imu");
        assert_eq!(value["stamp"], "2024-05-01T12:00:00Z");
        assert_eq!(value["counter"], 17);
        assert_eq!(value["orientation"]["w"], 1.0);
        assert_eq!(value["orientation"]["x"], 0.0);
        assert_eq!(value["angular_velocity"]["z"], -0.5);
        assert_eq!(value["linear_acceleration"]["z"], 9.75);
    }
}
