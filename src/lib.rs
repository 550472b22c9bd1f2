//! # TAG IMU Bridge Library
//!
//! Stream orientation, angular rate and acceleration from a Tamagawa TAG IMU.
//!
//! This library provides the serial protocol layer: synchronizing to the device's
//! CR LF framed byte stream, decoding measurement frames into physical units, and
//! writing device commands on the same link without disturbing frame reception.

pub mod config;
pub mod error;
pub mod tag;
pub mod driver;
pub mod serial;
pub mod telemetry;
