//! Protocol Module
//!
//! Defines the beanstalkd text protocol as seen by a client.
//!
//! ## Protocol Format
//!
//! ### Request Format
//! ```text
//! put <pri> <delay> <ttr> <bytes>\r\n
//! <data>\r\n
//! ```
//!
//! ### Response Format
//! ```text
//! RESERVED <id> <bytes>\r\n
//! <data>\r\n
//! ```
//!
//! ### Pairing
//! Replies carry no request id. The n-th frame read from the socket
//! answers the n-th command written to it.
//!
//! ### Status Codes
//! Body-carrying: RESERVED, FOUND, OK. Everything else is a single line;
//! see [`Status::shape`] for the field layout of each.

mod command;
mod response;
mod codec;
mod interpret;

pub use command::{Command, CommandKind};
pub use response::{Field, FieldKind, ResponseFrame, Status, StatusShape};
pub use codec::{
    decode_command, encode_command, encode_frame, FrameDecoder, CRLF, MAX_LINE_LENGTH,
    MAX_PAYLOAD_SIZE,
};
pub use interpret::{interpret, parse_yaml_dict, parse_yaml_list, Job, Outcome, Reply, Stats};
