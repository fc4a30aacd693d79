//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Command Format
//! ```text
//! <verb> <arg> <arg> ... [<bytes>]\r\n
//! [<body: exactly bytes>\r\n]
//! ```
//!
//! ### Response Format
//! ```text
//! <STATUS> [<field> ...]\r\n
//! [<body: exactly the length named by the status' length field>\r\n]
//! ```
//!
//! Bodies are opaque: they are consumed by declared length and never scanned
//! for a terminator, so CR, LF and NUL inside job data are safe.

use bytes::{BufMut, Bytes, BytesMut};

use super::{Command, CommandKind, Field, FieldKind, ResponseFrame, Status};
use crate::error::{BeanError, Result};

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Longest status or command line accepted, terminator excluded
pub const MAX_LINE_LENGTH: usize = 1024;

/// Default maximum body size (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: verb + args + [body length] + CRLF + [body + CRLF]
pub fn encode_command(command: &Command) -> Result<Bytes> {
    validate_token("verb", command.verb())?;
    for arg in command.args() {
        validate_token("argument", arg)?;
    }

    let kind = command.kind();
    let body = command.payload();
    if kind != CommandKind::Other && kind.carries_body() != body.is_some() {
        return Err(BeanError::InvalidCommand(format!(
            "'{}' {} a body",
            command.verb(),
            if kind.carries_body() { "requires" } else { "does not take" }
        )));
    }

    let body_len = body.map(|b| b.len().to_string());
    let line_len = command.verb().len()
        + command.args().iter().map(|a| a.len() + 1).sum::<usize>()
        + body_len.as_ref().map(|l| l.len() + 1).unwrap_or(0);
    let total = line_len + CRLF.len() + body.map(|b| b.len() + CRLF.len()).unwrap_or(0);

    let mut message = BytesMut::with_capacity(total);
    message.put_slice(command.verb().as_bytes());
    for arg in command.args() {
        message.put_u8(b' ');
        message.put_slice(arg.as_bytes());
    }
    if let Some(len) = &body_len {
        message.put_u8(b' ');
        message.put_slice(len.as_bytes());
    }
    message.put_slice(CRLF);

    if let Some(body) = body {
        message.put_slice(body);
        message.put_slice(CRLF);
    }

    Ok(message.freeze())
}

/// Decode one command from the front of `bytes`
///
/// Returns the command and number of bytes consumed, or `None` if more
/// bytes are needed. Only verbs known to carry a body are decoded with one.
pub fn decode_command(bytes: &[u8]) -> Result<Option<(Command, usize)>> {
    let Some(line_end) = find_line_end(bytes)? else {
        return Ok(None);
    };
    let line = line_str(&bytes[..line_end])?;

    let mut tokens = split_tokens(line)?.into_iter();
    let verb = tokens
        .next()
        .ok_or_else(|| violation("empty command line"))?;
    let mut args: Vec<&str> = tokens.collect();
    let mut consumed = line_end + CRLF.len();

    let mut command = Command::new(verb);
    if CommandKind::from_verb(verb).carries_body() {
        let len_token = args
            .pop()
            .ok_or_else(|| violation(format!("'{}' without body length", verb)))?;
        let len = parse_number(len_token)?;
        if len > MAX_PAYLOAD_SIZE as u64 {
            return Err(violation(format!("body too large: {} bytes", len)));
        }
        let len = len as usize;

        if bytes.len() < consumed + len + CRLF.len() {
            return Ok(None);
        }
        let body = &bytes[consumed..consumed + len];
        expect_crlf(&bytes[consumed + len..consumed + len + CRLF.len()])?;
        consumed += len + CRLF.len();
        command = command.body(Bytes::copy_from_slice(body));
    }

    for arg in args {
        command = command.arg(arg);
    }
    Ok(Some((command, consumed)))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response frame to bytes
///
/// Format: status line + CRLF + [body + CRLF]
pub fn encode_frame(frame: &ResponseFrame) -> Bytes {
    let line = frame.status_line();
    let body_len = frame.body.as_ref().map(|b| b.len() + CRLF.len()).unwrap_or(0);

    let mut message = BytesMut::with_capacity(line.len() + CRLF.len() + body_len);
    message.put_slice(line.as_bytes());
    message.put_slice(CRLF);
    if let Some(body) = &frame.body {
        message.put_slice(body);
        message.put_slice(CRLF);
    }
    message.freeze()
}

/// State machine for frame parsing.
#[derive(Debug)]
enum DecodeState {
    /// Waiting for a complete status line.
    AwaitingStatusLine,
    /// Status line parsed, waiting for `len` body bytes plus CRLF.
    AwaitingBody {
        status: Status,
        fields: Vec<Field>,
        len: usize,
    },
}

/// Incremental decoder for the inbound byte stream.
///
/// Accepts arbitrarily sized chunks and yields frames in arrival order.
/// Once a violation is seen the decoder is poisoned: every later call fails,
/// since nothing after a bad frame boundary can be trusted.
pub struct FrameDecoder {
    /// Accumulated bytes from socket reads.
    buffer: BytesMut,
    /// Current parsing state.
    state: DecodeState,
    /// Maximum allowed body size.
    max_body_size: usize,
    /// The violation that poisoned the stream, reported on every later call
    poisoned: Option<String>,
}

impl FrameDecoder {
    /// Create a decoder with the default body limit
    pub fn new() -> Self {
        Self::with_max_body(MAX_PAYLOAD_SIZE)
    }

    /// Create a decoder with a custom body limit
    pub fn with_max_body(max_body_size: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(8 * 1024),
            state: DecodeState::AwaitingStatusLine,
            max_body_size,
            poisoned: None,
        }
    }

    /// Push a chunk and extract every frame it completes.
    ///
    /// Frames completed ahead of a violation in the same chunk are still
    /// returned; the violation then surfaces on the next call. It is
    /// returned directly only when no frame precedes it.
    pub fn feed(&mut self, data: &[u8]) -> Result<Vec<ResponseFrame>> {
        self.extend(data);

        let mut frames = Vec::new();
        loop {
            match self.next_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => return Ok(frames),
                Err(e) if frames.is_empty() => return Err(e),
                Err(_) => return Ok(frames),
            }
        }
    }

    /// Append bytes without extracting frames
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Extract the next complete frame, if the buffer holds one
    pub fn next_frame(&mut self) -> Result<Option<ResponseFrame>> {
        if let Some(reason) = &self.poisoned {
            return Err(violation(reason.clone()));
        }

        let result = self.try_extract_one();
        if let Err(e) = &result {
            self.poisoned = Some(match e {
                BeanError::ProtocolViolation(msg) => msg.clone(),
                other => other.to_string(),
            });
        }
        result
    }

    fn try_extract_one(&mut self) -> Result<Option<ResponseFrame>> {
        match std::mem::replace(&mut self.state, DecodeState::AwaitingStatusLine) {
            DecodeState::AwaitingStatusLine => {
                let Some(line_end) = find_line_end(&self.buffer)? else {
                    return Ok(None);
                };

                let line = self.buffer.split_to(line_end + CRLF.len());
                let (status, fields) = parse_status_line(line_str(&line[..line_end])?)?;

                let Some(idx) = status.shape().body_len_field else {
                    return Ok(Some(ResponseFrame::new(status, fields)));
                };

                // Shape validation guarantees the length field is a number
                let len = fields
                    .get(idx)
                    .and_then(Field::as_number)
                    .ok_or_else(|| violation(format!("{} without body length", status)))?;
                if len > self.max_body_size as u64 {
                    return Err(violation(format!(
                        "body too large: {} bytes (max {})",
                        len, self.max_body_size
                    )));
                }

                self.state = DecodeState::AwaitingBody {
                    status,
                    fields,
                    len: len as usize,
                };
                self.try_extract_one()
            }

            DecodeState::AwaitingBody { status, fields, len } => {
                if self.buffer.len() < len + CRLF.len() {
                    self.state = DecodeState::AwaitingBody { status, fields, len };
                    return Ok(None);
                }

                let body = self.buffer.split_to(len).freeze();
                let trailer = self.buffer.split_to(CRLF.len());
                expect_crlf(&trailer)?;

                Ok(Some(ResponseFrame { status, fields, body: Some(body) }))
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn violation(msg: impl Into<String>) -> BeanError {
    BeanError::ProtocolViolation(msg.into())
}

/// A token may not be empty or contain whitespace or control bytes; any of
/// those would shift the argument positions the server sees.
fn validate_token(what: &str, token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(BeanError::InvalidCommand(format!("empty {}", what)));
    }
    if let Some(b) = token.bytes().find(|b| *b <= b' ' || *b == 0x7f) {
        return Err(BeanError::InvalidCommand(format!(
            "{} {:?} contains byte 0x{:02x}",
            what, token, b
        )));
    }
    Ok(())
}

/// Index of the CR of the first CRLF, `None` if no full line is buffered yet
fn find_line_end(bytes: &[u8]) -> Result<Option<usize>> {
    let window = &bytes[..bytes.len().min(MAX_LINE_LENGTH + CRLF.len())];
    match window.iter().position(|b| *b == b'\n') {
        Some(0) => Err(violation("bare LF line terminator")),
        Some(lf) if bytes[lf - 1] != b'\r' => Err(violation("bare LF line terminator")),
        Some(lf) => Ok(Some(lf - 1)),
        None if bytes.len() > MAX_LINE_LENGTH + 1 => Err(violation(format!(
            "line longer than {} bytes",
            MAX_LINE_LENGTH
        ))),
        None => Ok(None),
    }
}

fn line_str(line: &[u8]) -> Result<&str> {
    std::str::from_utf8(line).map_err(|_| violation("line is not valid UTF-8"))
}

fn expect_crlf(trailer: &[u8]) -> Result<()> {
    if trailer != CRLF {
        return Err(violation(format!("body not followed by CRLF (got {:?})", trailer)));
    }
    Ok(())
}

fn split_tokens(line: &str) -> Result<Vec<&str>> {
    let tokens: Vec<&str> = line.split(' ').collect();
    if tokens.iter().any(|t| t.is_empty()) {
        return Err(violation(format!("malformed line {:?}", line)));
    }
    Ok(tokens)
}

fn parse_number(token: &str) -> Result<u64> {
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(violation(format!("expected a number, got {:?}", token)));
    }
    token
        .parse()
        .map_err(|_| violation(format!("number out of range: {:?}", token)))
}

fn parse_status_line(line: &str) -> Result<(Status, Vec<Field>)> {
    let mut tokens = split_tokens(line)?.into_iter();
    let token = tokens.next().unwrap_or_default();
    let status = Status::from_token(token)
        .ok_or_else(|| violation(format!("unknown status {:?}", token)))?;

    let shape = status.shape();
    let raw: Vec<&str> = tokens.collect();
    if raw.len() < shape.required || raw.len() > shape.fields.len() {
        return Err(violation(format!(
            "{} expects {}..={} fields, got {}",
            status,
            shape.required,
            shape.fields.len(),
            raw.len()
        )));
    }

    let fields = raw
        .into_iter()
        .zip(shape.fields)
        .map(|(value, kind)| match kind {
            FieldKind::Number => parse_number(value).map(Field::Number),
            FieldKind::Name => Ok(Field::Name(value.to_string())),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((status, fields))
}
