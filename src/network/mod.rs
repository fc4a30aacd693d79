//! Network Module
//!
//! The protocol engine: socket lifecycle, ordered writes, frame delivery.
//!
//! ## Architecture
//! - One reader thread per connection feeding the correlator
//! - One writer thread per connection draining the outbound queue
//! - Any number of submitting threads, serialized by one lock

mod connection;
mod correlator;
mod pending;
mod reader;
mod writer;

pub use connection::{Connection, ConnectionState};
pub use correlator::Correlator;
pub use pending::{AbortReason, PendingCall, ResponseHandle};
pub use reader::StreamReader;
pub use writer::OutboundWriter;
