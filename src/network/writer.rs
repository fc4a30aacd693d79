//! Outbound writer
//!
//! A single thread owns the outbound half of the transport and writes
//! encoded commands in the order they were queued. Submitters never touch
//! the socket, so the submit lock is never held across blocking I/O.

use std::io::{BufWriter, Write};

use bytes::Bytes;
use crossbeam::channel::Receiver;

use super::pending::AbortReason;

/// Drains the outbound queue into the transport
pub struct OutboundWriter<W: Write> {
    sink: BufWriter<W>,
    queue: Receiver<Bytes>,
}

impl<W: Write> OutboundWriter<W> {
    pub fn new(sink: W, queue: Receiver<Bytes>) -> Self {
        Self {
            sink: BufWriter::new(sink),
            queue,
        }
    }

    /// Write queued commands until every sender is dropped.
    ///
    /// Flushes whenever the queue runs dry, so pipelined commands share a
    /// syscall. Returns once the queue is closed and fully flushed.
    pub fn run(mut self) -> Result<(), AbortReason> {
        for bytes in self.queue.iter() {
            self.sink.write_all(&bytes).map_err(lost)?;
            if self.queue.is_empty() {
                self.sink.flush().map_err(lost)?;
            }
        }

        self.sink.flush().map_err(lost)?;
        tracing::trace!("Outbound queue closed");
        Ok(())
    }
}

fn lost(e: std::io::Error) -> AbortReason {
    AbortReason::Lost(format!("write failed: {}", e))
}
