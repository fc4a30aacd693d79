//! Command Correlator
//!
//! FIFO pairing of in-flight commands with inbound frames.
//!
//! The protocol has no request ids: the oldest registered call owns the
//! next frame. Registration order must therefore equal write order, which
//! the connection guarantees by doing both under one lock.

use std::collections::VecDeque;

use crate::error::{BeanError, Result};
use crate::protocol::{CommandKind, ResponseFrame};

use super::pending::{AbortReason, PendingCall, ResponseHandle};

/// Queue of calls awaiting a reply, oldest first
#[derive(Debug, Default)]
pub struct Correlator {
    queue: VecDeque<PendingCall>,
    next_seq: u64,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a call for a command of `kind` and append it to the tail
    pub fn register(&mut self, kind: CommandKind) -> ResponseHandle {
        let seq = self.next_seq;
        self.next_seq += 1;

        let (call, handle) = PendingCall::new(seq, kind);
        self.queue.push_back(call);
        handle
    }

    /// Hand `frame` to the oldest pending call.
    ///
    /// A frame with nothing pending means the stream is out of step with
    /// our writes; the connection has to be torn down.
    pub fn deliver(&mut self, frame: ResponseFrame) -> Result<()> {
        let call = self.queue.pop_front().ok_or_else(|| {
            BeanError::ProtocolViolation(format!(
                "response with no matching request: {}",
                frame.status_line()
            ))
        })?;

        let seq = call.seq();
        tracing::trace!("Delivering {} to call #{}", frame.status, seq);
        if !call.fulfill(Ok(frame)) {
            tracing::debug!("Discarded reply to cancelled call #{}", seq);
        }
        Ok(())
    }

    /// Fail every queued call with `reason` and empty the queue.
    ///
    /// Returns the number of calls aborted.
    pub fn abort_all(&mut self, reason: &AbortReason) -> usize {
        let count = self.queue.len();
        for call in self.queue.drain(..) {
            call.fulfill(Err(reason.clone()));
        }
        count
    }

    /// Number of calls awaiting a reply
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
