//! # Telemetry Module
//!
//! Sinks that consume decoded IMU samples.
//!
//! This module handles:
//! - The `SampleSink` seam the driver publishes through
//! - Writing samples as JSONL (JSON Lines)
//! - Forwarding samples to in-process consumers over a channel
//! - Running a blocking sink on its own thread, off the async runtime

pub mod jsonl;

pub use jsonl::JsonlSink;

use std::thread::JoinHandle;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{Result, TagImuError};
use crate::tag::protocol::DecodedSample;

/// Consumer of decoded samples
///
/// Called once per accepted measurement frame, in arrival order.
#[cfg_attr(test, mockall::automock)]
pub trait SampleSink: Send {
    /// Publish one sample
    fn publish(&mut self, sample: &DecodedSample) -> Result<()>;
}

/// Sink forwarding samples into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DecodedSample>,
}

impl ChannelSink {
    /// Create a sink and the receiver its samples arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DecodedSample>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SampleSink for ChannelSink {
    fn publish(&mut self, sample: &DecodedSample) -> Result<()> {
        self.tx
            .send(sample.clone())
            .map_err(|_| TagImuError::Sink("sample receiver dropped".to_string()))
    }
}

/// Move a sink onto a dedicated thread
///
/// Returns a [`ChannelSink`] feeding the thread and the thread's handle. The thread
/// publishes samples in arrival order until every sender is dropped, then hands the
/// sink back through `join`. Publish failures on the thread are logged and skipped.
///
/// # Errors
///
/// Returns error if the thread cannot be spawned
pub fn spawn_sink_thread<K>(mut sink: K) -> Result<(ChannelSink, JoinHandle<K>)>
where
    K: SampleSink + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<DecodedSample>();

    let handle = std::thread::Builder::new()
        .name("sample-sink".to_string())
        .spawn(move || {
            let mut failures = 0u64;
            while let Some(sample) = rx.blocking_recv() {
                if let Err(e) = sink.publish(&sample) {
                    failures += 1;
                    warn!("Failed to publish sample {}: {}", sample.counter, e);
                }
            }
            debug!("Sample sink thread done ({} failures)", failures);
            sink
        })?;

    Ok((ChannelSink { tx }, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn test_channel_sink_forwards_in_order() {
        let (mut sink, mut rx) = ChannelSink::new();

        for counter in 0..3 {
            let sample = DecodedSample { counter, ..Default::default() };
            sink.publish(&sample).unwrap();
        }

        for counter in 0..3 {
            assert_eq!(rx.try_recv().unwrap().counter, counter);
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_reports_dropped_receiver() {
        let (mut sink, rx) = ChannelSink::new();
        drop(rx);

        let result = sink.publish(&DecodedSample::default());
        assert!(matches!(result, Err(TagImuError::Sink(_))));
    }

    #[test]
    fn test_sink_thread_publishes_in_order_and_returns_sink() {
        let (mut sink, handle) = spawn_sink_thread(JsonlSink::new(Vec::new())).unwrap();
        for counter in 0..3 {
            sink.publish(&DecodedSample { counter, ..Default::default() }).unwrap();
        }
        drop(sink);

        let output = String::from_utf8(handle.join().unwrap().into_inner()).unwrap();
        let counters: Vec<u64> = output
            .lines()
            .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
            .map(|value| value["counter"].as_u64().unwrap())
            .collect();
        assert_eq!(counters, vec![0, 1, 2]);
    }

    #[test]
    fn test_sink_thread_does_not_block_caller() {
        let mut slow = MockSampleSink::new();
        slow.expect_publish().times(1).returning(|_| {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        });

        let (mut sink, handle) = spawn_sink_thread(slow).unwrap();
        let started = Instant::now();
        sink.publish(&DecodedSample::default()).unwrap();
        assert!(started.elapsed() < Duration::from_millis(100));

        drop(sink);
        handle.join().unwrap();
    }

    #[test]
    fn test_sink_thread_survives_publish_failure() {
        let mut failing = MockSampleSink::new();
        failing
            .expect_publish()
            .times(2)
            .returning(|_| Err(TagImuError::Sink("stdout closed".to_string())));

        let (mut sink, handle) = spawn_sink_thread(failing).unwrap();
        sink.publish(&DecodedSample::default()).unwrap();
        sink.publish(&DecodedSample::default()).unwrap();
        drop(sink);

        handle.join().unwrap();
    }
}
