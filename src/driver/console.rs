//! Console command source
//!
//! Reads `ver`, `ofc <int>` and `hrst` lines and queues them for the dispatcher.

use std::io::BufRead;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::tag::protocol::CommandRequest;

/// Forward parsed command lines until input ends or the queue closes
///
/// Blocking; run it on its own thread. Malformed lines are logged and skipped.
///
/// # Returns
///
/// * `usize` - Number of commands queued
pub fn forward_lines<R: BufRead>(input: R, tx: mpsc::Sender<CommandRequest>) -> usize {
    let mut queued = 0;

    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Console read failed: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<CommandRequest>() {
            Ok(command) => {
                if tx.blocking_send(command).is_err() {
                    debug!("Command queue closed, console input stopped");
                    break;
                }
                queued += 1;
            }
            Err(e) => warn!("Ignoring console input: {}", e),
        }
    }

    queued
}
