//! # Frame Synchronization
//!
//! Splits the raw serial byte stream into CR LF terminated frames.

use std::io;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::{Decoder, FramedRead};
use tracing::warn;

use super::protocol::TAG_DELIMITER;

/// Upper bound on buffered bytes without a delimiter before they are dropped
pub const MAX_FRAME_LEN: usize = 256;

/// Codec yielding the bytes between CR LF delimiters
///
/// The delimiter is consumed and not included in the frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_len: usize,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::with_max_frame_len(MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(pos) = src.windows(TAG_DELIMITER.len()).position(|w| w == TAG_DELIMITER) {
            let frame = src.split_to(pos).freeze();
            let _ = src.split_to(TAG_DELIMITER.len());
            return Ok(Some(frame));
        }

        if src.len() > self.max_frame_len {
            // Keep a trailing CR, it may pair with an LF still in flight
            let keep = usize::from(src.last() == Some(&TAG_DELIMITER[0]));
            warn!(
                "Discarding {} bytes with no frame delimiter",
                src.len() - keep
            );
            let _ = src.split_to(src.len() - keep);
        }

        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                // Partial frame at end of stream
                src.clear();
                Ok(None)
            }
        }
    }
}

/// Timeout-bounded frame reader
///
/// Every read is bounded by `read_timeout`, so a silent device never stalls the caller.
/// Partial frames stay buffered across timeouts.
pub struct FrameSynchronizer<R> {
    framed: FramedRead<R, FrameCodec>,
    read_timeout: Duration,
}

impl<R: AsyncRead + Unpin> FrameSynchronizer<R> {
    pub fn new(reader: R, read_timeout: Duration) -> Self {
        Self {
            framed: FramedRead::new(reader, FrameCodec::new()),
            read_timeout,
        }
    }

    /// Read the next frame
    ///
    /// # Returns
    ///
    /// * `Ok(Some(frame))` - Bytes before the next CR LF
    /// * `Ok(None)` - No delimiter within the read timeout; retry
    ///
    /// # Errors
    ///
    /// Returns error if the link fails or reaches end of stream
    pub async fn next_frame(&mut self) -> io::Result<Option<Bytes>> {
        match tokio::time::timeout(self.read_timeout, self.framed.next()).await {
            Err(_elapsed) => Ok(None),
            Ok(Some(frame)) => frame.map(Some),
            Ok(None) => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "serial stream closed",
            )),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Consume the synchronizer and return the reader; buffered bytes are dropped
    pub fn into_inner(self) -> R {
        self.framed.into_inner()
    }
}
