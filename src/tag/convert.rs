//! # Unit Conversion
//!
//! Maps raw 16-bit counts to physical units and builds the orientation quaternion.
//!
//! | Quantity     | Scale                     | Unit   |
//! |--------------|---------------------------|--------|
//! | gyro         | 200 / 2^15 deg/s, to rad  | rad/s  |
//! | acceleration | 100 / 2^15                | m/s^2  |
//! | attitude     | 180 / 2^15 deg, to rad    | rad    |

use chrono::{DateTime, Utc};

use super::protocol::*;

/// Physical values of one measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Converted {
    /// Angular velocity in rad/s
    pub angular_velocity: Vector3,

    /// Linear acceleration in m/s^2
    pub linear_acceleration: Vector3,

    /// Roll, pitch, yaw in rad
    pub rpy: [f64; 3],

    /// Orientation built from `rpy`
    pub orientation: Quaternion,
}

/// Gyro counts to rad/s
pub fn angular_rate(raw: i16) -> f64 {
    (raw as f64 * (TAG_GYRO_FULL_SCALE_DPS / TAG_LSB_DIVISOR)).to_radians()
}

/// Accelerometer counts to m/s^2
pub fn linear_acceleration(raw: i16) -> f64 {
    raw as f64 * (TAG_ACCEL_FULL_SCALE_MPS2 / TAG_LSB_DIVISOR)
}

/// Attitude counts to rad
pub fn attitude_angle(raw: i16) -> f64 {
    (raw as f64 * (TAG_ATTITUDE_FULL_SCALE_DEG / TAG_LSB_DIVISOR)).to_radians()
}

impl Quaternion {
    /// Build a quaternion from roll (X), pitch (Y), yaw (Z) in radians
    ///
    /// Aerospace RPY convention: equivalent to rotating about fixed X, then Y, then Z,
    /// i.e. `q = qz(yaw) * qy(pitch) * qx(roll)`. Zero angles give exactly the identity.
    pub fn from_rpy(roll: f64, pitch: f64, yaw: f64) -> Self {
        let (sr, cr) = (roll * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sy, cy) = (yaw * 0.5).sin_cos();

        Self {
            x: sr * cp * cy - cr * sp * sy,
            y: cr * sp * cy + sr * cp * sy,
            z: cr * cp * sy - sr * sp * cy,
            w: cr * cp * cy + sr * sp * sy,
        }
    }
}

/// Convert one measurement to physical units
///
/// Pure: nothing is carried over between frames and the counter is not used.
pub fn convert(raw: &RawMeasurement) -> Converted {
    let [gx, gy, gz] = raw.gyro;
    let [ax, ay, az] = raw.accel;
    let rpy = raw.attitude.map(attitude_angle);

    Converted {
        angular_velocity: Vector3::new(angular_rate(gx), angular_rate(gy), angular_rate(gz)),
        linear_acceleration: Vector3::new(
            linear_acceleration(ax),
            linear_acceleration(ay),
            linear_acceleration(az),
        ),
        rpy,
        orientation: Quaternion::from_rpy(rpy[0], rpy[1], rpy[2]),
    }
}

/// Build a publishable sample from raw counts
pub fn to_sample(frame_id: &str, stamp: DateTime<Utc>, raw: &RawMeasurement) -> DecodedSample {
    let converted = convert(raw);

    DecodedSample {
        frame_id: frame_id.to_string(),
        stamp,
        counter: raw.counter as u16,
        orientation: converted.orientation,
        angular_velocity: converted.angular_velocity,
        linear_acceleration: converted.linear_acceleration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::decoder::{build_measurement_frame, decode_frame, Frame};
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPS: f64 = 1e-12;

    fn gyro_lsb() -> f64 {
        (200.0 / 32768.0) * PI / 180.0
    }

    fn accel_lsb() -> f64 {
        100.0 / 32768.0
    }

    fn attitude_lsb() -> f64 {
        (180.0 / 32768.0) * PI / 180.0
    }

    fn decode_counts(raw: &RawMeasurement) -> Converted {
        let frame = build_measurement_frame(raw);
        match decode_frame(&frame).unwrap() {
            Frame::Measurement(decoded) => convert(&decoded),
            other => panic!("Expected measurement, got: {:?}", other),
        }
    }

    #[test]
    fn test_scale_factors_through_decode() {
        let raw = RawMeasurement {
            counter: 7,
            gyro: [1, -16384, 32767],
            accel: [-32768, 3277, 0],
            attitude: [100, -100, 16384],
        };
        let c = decode_counts(&raw);

        assert!((c.angular_velocity.x - 1.0 * gyro_lsb()).abs() < EPS);
        assert!((c.angular_velocity.y - -16384.0 * gyro_lsb()).abs() < EPS);
        assert!((c.angular_velocity.z - 32767.0 * gyro_lsb()).abs() < EPS);
        assert!((c.linear_acceleration.x - -100.0).abs() < EPS);
        assert!((c.linear_acceleration.y - 3277.0 * accel_lsb()).abs() < EPS);
        assert_eq!(c.linear_acceleration.z, 0.0);
        assert!((c.rpy[0] - 100.0 * attitude_lsb()).abs() < EPS);
        assert!((c.rpy[1] - -100.0 * attitude_lsb()).abs() < EPS);
        assert!((c.rpy[2] - FRAC_PI_2).abs() < EPS);
    }

    #[test]
    fn test_full_scale_values() {
        // -32768 counts is exactly -full scale
        assert!((angular_rate(i16::MIN) - (-200.0f64).to_radians()).abs() < EPS);
        assert!((linear_acceleration(i16::MIN) - -100.0).abs() < EPS);
        assert!((attitude_angle(i16::MIN) - -PI).abs() < EPS);
    }

    #[test]
    fn test_physical_values_survive_quantization() {
        // rad/s, m/s^2, rad
        let gyro = [0.5, -1.25, 3.0];
        let accel = [9.80665, -0.3, 49.0];
        let rpy = [0.1, -0.7, 2.5];

        let to_counts = |value: f64, lsb: f64| (value / lsb).round() as i16;
        let raw = RawMeasurement {
            counter: 0,
            gyro: gyro.map(|v| to_counts(v, gyro_lsb())),
            accel: accel.map(|v| to_counts(v, accel_lsb())),
            attitude: rpy.map(|v| to_counts(v, attitude_lsb())),
        };
        let c = decode_counts(&raw);

        let got_gyro = [c.angular_velocity.x, c.angular_velocity.y, c.angular_velocity.z];
        let got_accel = [c.linear_acceleration.x, c.linear_acceleration.y, c.linear_acceleration.z];
        for i in 0..3 {
            assert!((got_gyro[i] - gyro[i]).abs() <= gyro_lsb() / 2.0 + EPS);
            assert!((got_accel[i] - accel[i]).abs() <= accel_lsb() / 2.0 + EPS);
            assert!((c.rpy[i] - rpy[i]).abs() <= attitude_lsb() / 2.0 + EPS);
        }
    }

    #[test]
    fn test_zero_attitude_is_identity() {
        let c = decode_counts(&RawMeasurement::default());
        assert_eq!(c.orientation.x, 0.0);
        assert_eq!(c.orientation.y, 0.0);
        assert_eq!(c.orientation.z, 0.0);
        assert_eq!(c.orientation.w, 1.0);
    }

    #[test]
    fn test_single_axis_rotations() {
        let half = (0.5f64).sqrt();

        let roll = Quaternion::from_rpy(FRAC_PI_2, 0.0, 0.0);
        assert!((roll.x - half).abs() < EPS && (roll.w - half).abs() < EPS);
        assert!(roll.y.abs() < EPS && roll.z.abs() < EPS);

        let pitch = Quaternion::from_rpy(0.0, FRAC_PI_2, 0.0);
        assert!((pitch.y - half).abs() < EPS && (pitch.w - half).abs() < EPS);
        assert!(pitch.x.abs() < EPS && pitch.z.abs() < EPS);

        let yaw = Quaternion::from_rpy(0.0, 0.0, FRAC_PI_2);
        assert!((yaw.z - half).abs() < EPS && (yaw.w - half).abs() < EPS);
        assert!(yaw.x.abs() < EPS && yaw.y.abs() < EPS);
    }

    #[test]
    fn test_combined_rotation_matches_composition() {
        // q = qz(yaw) * qy(pitch) * qx(roll)
        let (roll, pitch, yaw) = (0.3, -0.4, 1.1);
        let mul = |a: Quaternion, b: Quaternion| Quaternion {
            x: a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            y: a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            z: a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
            w: a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        };
        let qx = Quaternion::from_rpy(roll, 0.0, 0.0);
        let qy = Quaternion::from_rpy(0.0, pitch, 0.0);
        let qz = Quaternion::from_rpy(0.0, 0.0, yaw);

        let expected = mul(qz, mul(qy, qx));
        let q = Quaternion::from_rpy(roll, pitch, yaw);
        assert!((q.x - expected.x).abs() < EPS);
        assert!((q.y - expected.y).abs() < EPS);
        assert!((q.z - expected.z).abs() < EPS);
        assert!((q.w - expected.w).abs() < EPS);
    }

    #[test]
    fn test_orientation_is_unit_norm_across_range() {
        for roll in (i16::MIN..=i16::MAX).step_by(4099) {
            for pitch in (i16::MIN..=i16::MAX).step_by(5003) {
                for yaw in (i16::MIN..=i16::MAX).step_by(6007) {
                    let raw = RawMeasurement {
                        attitude: [roll, pitch, yaw],
                        ..Default::default()
                    };
                    let norm = convert(&raw).orientation.norm();
                    assert!((norm - 1.0).abs() < 1e-9, "norm {} at {:?}", norm, raw.attitude);
                }
            }
        }
    }

    #[test]
    fn test_to_sample() {
        let raw = RawMeasurement {
            counter: -1,
            gyro: [16384, 0, 0],
            accel: [0, 0, 3213],
            attitude: [0, 0, 0],
        };
        let stamp = DateTime::<Utc>::UNIX_EPOCH;
        let sample = to_sample("imu", stamp, &raw);

        assert_eq!(sample.frame_id, "imu");
        assert_eq!(sample.stamp, stamp);
        assert_eq!(sample.counter, 0xFFFF);
        assert_eq!(sample.orientation, Quaternion::IDENTITY);
        assert!((sample.angular_velocity.x - 100.0f64.to_radians()).abs() < EPS);
        assert!((sample.linear_acceleration.z - 3213.0 * accel_lsb()).abs() < EPS);
    }

    #[test]
    fn test_conversion_is_independent_of_counter() {
        let a = RawMeasurement { counter: 1, gyro: [5, 6, 7], ..Default::default() };
        let b = RawMeasurement { counter: -300, ..a };
        assert_eq!(convert(&a), convert(&b));
    }
}
