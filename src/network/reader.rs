//! Stream Reader
//!
//! Drains the inbound half of the transport, feeds the frame decoder and
//! hands every completed frame onward in arrival order.

use std::io::{ErrorKind, Read};

use crate::error::BeanError;
use crate::protocol::{FrameDecoder, ResponseFrame};

use super::pending::AbortReason;

/// Owns the inbound byte stream for one connection generation
pub struct StreamReader<R> {
    source: R,
    decoder: FrameDecoder,
    chunk_size: usize,
}

impl<R: Read> StreamReader<R> {
    pub fn new(source: R, decoder: FrameDecoder, chunk_size: usize) -> Self {
        Self {
            source,
            decoder,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Read until the stream ends or breaks.
    ///
    /// Every complete frame is passed to `deliver`, including frames decoded
    /// from the same chunk as a later violation. If `deliver` rejects a
    /// frame the loop stops with that reason. The returned reason is the
    /// single connection-loss signal for this stream.
    pub fn run<F>(mut self, mut deliver: F) -> AbortReason
    where
        F: FnMut(ResponseFrame) -> Result<(), AbortReason>,
    {
        let mut chunk = vec![0u8; self.chunk_size];

        loop {
            let n = match self.source.read(&mut chunk) {
                Ok(0) => return AbortReason::Lost("end of stream".to_string()),
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return AbortReason::Lost(e.to_string()),
            };

            tracing::trace!("Read {} bytes", n);
            self.decoder.extend(&chunk[..n]);

            loop {
                match self.decoder.next_frame() {
                    Ok(Some(frame)) => {
                        if let Err(reason) = deliver(frame) {
                            return reason;
                        }
                    }
                    Ok(None) => break,
                    Err(BeanError::ProtocolViolation(msg)) => return AbortReason::Violation(msg),
                    Err(e) => return AbortReason::Violation(e.to_string()),
                }
            }
        }
    }
}
