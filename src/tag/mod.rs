//! # TAG Protocol Module
//!
//! Implementation of the Tamagawa TAG serial protocol.
//!
//! This module handles:
//! - Frame synchronization on CR LF
//! - Measurement / version frame classification and field extraction
//! - Unit conversion and RPY to quaternion
//! - Command encoding

pub mod protocol;
pub mod sync;
pub mod decoder;
pub mod convert;
pub mod encoder;
