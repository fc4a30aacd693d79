//! Pending calls
//!
//! A [`PendingCall`] is the correlator's half of an in-flight command; the
//! [`ResponseHandle`] is the caller's half. The result slot is a one-shot
//! channel: `fulfill` consumes the call, so it can be resolved only once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};

use crate::error::{BeanError, Result};
use crate::protocol::{CommandKind, ResponseFrame};

/// Why a call was resolved without a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortReason {
    /// `close()` ran before the reply arrived
    Closed,
    /// Transport failed
    Lost(String),
    /// The inbound stream broke framing
    Violation(String),
}

impl AbortReason {
    pub fn into_error(self) -> BeanError {
        match self {
            AbortReason::Closed => BeanError::ConnectionClosed,
            AbortReason::Lost(msg) => BeanError::ConnectionLost(msg),
            AbortReason::Violation(msg) => BeanError::ProtocolViolation(msg),
        }
    }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbortReason::Closed => f.write_str("connection closed"),
            AbortReason::Lost(msg) => write!(f, "connection lost: {}", msg),
            AbortReason::Violation(msg) => write!(f, "protocol violation: {}", msg),
        }
    }
}

type Slot = std::result::Result<ResponseFrame, AbortReason>;

/// Correlator side of an in-flight command
#[derive(Debug)]
pub struct PendingCall {
    seq: u64,
    kind: CommandKind,
    slot: Sender<Slot>,
    interested: Arc<AtomicBool>,
}

impl PendingCall {
    /// Create a call and the handle its submitter waits on
    pub fn new(seq: u64, kind: CommandKind) -> (PendingCall, ResponseHandle) {
        let (tx, rx) = channel::bounded(1);
        let interested = Arc::new(AtomicBool::new(true));

        let call = PendingCall {
            seq,
            kind,
            slot: tx,
            interested: Arc::clone(&interested),
        };
        let handle = ResponseHandle {
            seq,
            kind,
            slot: rx,
            interested,
        };
        (call, handle)
    }

    /// Creation sequence number (diagnostics only)
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Whether the submitter still wants the result
    pub fn is_interested(&self) -> bool {
        self.interested.load(Ordering::Acquire)
    }

    /// Resolve the call. Returns `false` if the result was discarded because
    /// the submitter lost interest.
    pub fn fulfill(self, result: Slot) -> bool {
        if !self.is_interested() {
            return false;
        }
        // The slot has capacity one and is written once, so this never blocks
        self.slot.try_send(result).is_ok()
    }
}

/// Caller side of an in-flight command
///
/// Dropping the handle, or calling [`cancel`](Self::cancel), only stops
/// local waiting; the command stays on the wire and its reply is discarded
/// when it arrives.
#[derive(Debug)]
pub struct ResponseHandle {
    seq: u64,
    kind: CommandKind,
    slot: Receiver<Slot>,
    interested: Arc<AtomicBool>,
}

impl ResponseHandle {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Kind of the command this handle answers, for interpretation
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Block until the reply arrives or the connection ends
    pub fn wait(self) -> Result<ResponseFrame> {
        match self.slot.recv() {
            Ok(slot) => slot.map_err(AbortReason::into_error),
            // Call dropped unresolved: its connection generation is gone
            Err(_) => Err(BeanError::ConnectionLost("pending call dropped".to_string())),
        }
    }

    /// Block for at most `timeout`.
    ///
    /// On [`BeanError::Timeout`] the handle stays valid and can be waited on
    /// again; the request is not retracted.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<ResponseFrame> {
        match self.slot.recv_timeout(timeout) {
            Ok(slot) => slot.map_err(AbortReason::into_error),
            Err(RecvTimeoutError::Timeout) => Err(BeanError::Timeout),
            Err(RecvTimeoutError::Disconnected) => {
                Err(BeanError::ConnectionLost("pending call dropped".to_string()))
            }
        }
    }

    /// Non-blocking poll; `None` while the reply is outstanding
    pub fn try_result(&self) -> Option<Result<ResponseFrame>> {
        match self.slot.try_recv() {
            Ok(slot) => Some(slot.map_err(AbortReason::into_error)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(BeanError::ConnectionLost(
                "pending call dropped".to_string(),
            ))),
        }
    }

    /// Stop waiting. The reply, when it comes, is discarded.
    pub fn cancel(self) {}
}

impl Drop for ResponseHandle {
    fn drop(&mut self) {
        self.interested.store(false, Ordering::Release);
    }
}
