//! # TAG Command Encoder
//!
//! Serializes commands into the ASCII text the device expects.

use super::protocol::*;

/// Encode a command into its wire form
///
/// # Arguments
///
/// * `command` - Command to serialize
///
/// # Returns
///
/// * `Vec<u8>` - ASCII command text followed by CR LF, nothing else
///
/// # Examples
///
/// ```
/// use tag_imu_bridge::tag::encoder::encode_command;
/// use tag_imu_bridge::tag::protocol::CommandRequest;
///
/// assert_eq!(encode_command(&CommandRequest::OffsetCancel(42)), b"$TSC,OFC,42\r\n");
/// ```
pub fn encode_command(command: &CommandRequest) -> Vec<u8> {
    terminate(command.to_string())
}

/// Encode the streaming start command (`$TSC,BIN,30` + CR LF)
pub fn encode_start_streaming() -> Vec<u8> {
    terminate(TAG_START_STREAMING.to_string())
}

fn terminate(text: String) -> Vec<u8> {
    let mut bytes = text.into_bytes();
    bytes.extend_from_slice(TAG_DELIMITER);
    bytes
}
