//! Response definitions
//!
//! The closed table of status tokens the server can send, and the frame
//! the decoder produces for each reply.

use bytes::Bytes;

/// Kind of a scalar field on a status line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Unsigned decimal integer
    Number,
    /// Tube name or other bare token
    Name,
}

/// A parsed status line field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Number(u64),
    Name(String),
}

impl Field {
    pub fn as_number(&self) -> Option<u64> {
        match self {
            Field::Number(n) => Some(*n),
            Field::Name(_) => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Field::Name(s) => Some(s),
            Field::Number(_) => None,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Field::Number(n) => write!(f, "{}", n),
            Field::Name(s) => f.write_str(s),
        }
    }
}

/// Shape of a status line: its fields and where the body length lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusShape {
    /// Every field the status may carry, in order
    pub fields: &'static [FieldKind],
    /// How many leading fields are mandatory
    pub required: usize,
    /// Index of the field holding the body length, if the status has a body
    pub body_len_field: Option<usize>,
}

impl StatusShape {
    const fn bare() -> Self {
        Self { fields: &[], required: 0, body_len_field: None }
    }

    const fn one(kind: FieldKind, required: usize) -> Self {
        let fields: &'static [FieldKind] = match kind {
            FieldKind::Number => &[FieldKind::Number],
            FieldKind::Name => &[FieldKind::Name],
        };
        Self { fields, required, body_len_field: None }
    }
}

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Inserted,
    Buried,
    ExpectedCrlf,
    JobTooBig,
    Draining,
    Using,
    Reserved,
    DeadlineSoon,
    TimedOut,
    Deleted,
    NotFound,
    Released,
    Touched,
    Watching,
    NotIgnored,
    Found,
    Kicked,
    Ok,
    Paused,
    OutOfMemory,
    InternalError,
    BadFormat,
    UnknownCommand,
}

impl Status {
    const TOKENS: [(&'static str, Status); 23] = [
        ("INSERTED", Status::Inserted),
        ("BURIED", Status::Buried),
        ("EXPECTED_CRLF", Status::ExpectedCrlf),
        ("JOB_TOO_BIG", Status::JobTooBig),
        ("DRAINING", Status::Draining),
        ("USING", Status::Using),
        ("RESERVED", Status::Reserved),
        ("DEADLINE_SOON", Status::DeadlineSoon),
        ("TIMED_OUT", Status::TimedOut),
        ("DELETED", Status::Deleted),
        ("NOT_FOUND", Status::NotFound),
        ("RELEASED", Status::Released),
        ("TOUCHED", Status::Touched),
        ("WATCHING", Status::Watching),
        ("NOT_IGNORED", Status::NotIgnored),
        ("FOUND", Status::Found),
        ("KICKED", Status::Kicked),
        ("OK", Status::Ok),
        ("PAUSED", Status::Paused),
        ("OUT_OF_MEMORY", Status::OutOfMemory),
        ("INTERNAL_ERROR", Status::InternalError),
        ("BAD_FORMAT", Status::BadFormat),
        ("UNKNOWN_COMMAND", Status::UnknownCommand),
    ];

    /// Parse a status token; `None` if it is not in the table
    pub fn from_token(token: &str) -> Option<Status> {
        Self::TOKENS
            .iter()
            .find(|(t, _)| *t == token)
            .map(|(_, status)| *status)
    }

    pub fn token(self) -> &'static str {
        Self::TOKENS
            .iter()
            .find(|(_, status)| *status == self)
            .map(|(t, _)| *t)
            .unwrap_or("UNKNOWN")
    }

    /// Fields and body layout of this status
    pub fn shape(self) -> StatusShape {
        const JOB_WITH_BODY: StatusShape = StatusShape {
            fields: &[FieldKind::Number, FieldKind::Number],
            required: 2,
            body_len_field: Some(1),
        };

        match self {
            Status::Inserted | Status::Watching => StatusShape::one(FieldKind::Number, 1),
            // `put` reports the id, `release`/`bury` do not
            Status::Buried => StatusShape::one(FieldKind::Number, 0),
            // `kick` reports a count, `kick-job` does not
            Status::Kicked => StatusShape::one(FieldKind::Number, 0),
            Status::Using => StatusShape::one(FieldKind::Name, 1),
            Status::Reserved | Status::Found => JOB_WITH_BODY,
            Status::Ok => StatusShape {
                fields: &[FieldKind::Number],
                required: 1,
                body_len_field: Some(0),
            },
            Status::ExpectedCrlf
            | Status::JobTooBig
            | Status::Draining
            | Status::DeadlineSoon
            | Status::TimedOut
            | Status::Deleted
            | Status::NotFound
            | Status::Released
            | Status::Touched
            | Status::NotIgnored
            | Status::Paused
            | Status::OutOfMemory
            | Status::InternalError
            | Status::BadFormat
            | Status::UnknownCommand => StatusShape::bare(),
        }
    }

    pub fn has_body(self) -> bool {
        self.shape().body_len_field.is_some()
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// One complete reply: status line plus optional body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    /// Status code
    pub status: Status,

    /// Fields from the status line, including the body length if any
    pub fields: Vec<Field>,

    /// Body for statuses that declare one
    pub body: Option<Bytes>,
}

impl ResponseFrame {
    /// Create a frame without a body
    pub fn new(status: Status, fields: Vec<Field>) -> Self {
        Self { status, fields, body: None }
    }

    /// Create a frame with a body; the length field is inserted where the
    /// status declares it.
    pub fn with_body(status: Status, mut fields: Vec<Field>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        if let Some(idx) = status.shape().body_len_field {
            fields.insert(idx.min(fields.len()), Field::Number(body.len() as u64));
        }
        Self { status, fields, body: Some(body) }
    }

    /// Numeric field at `idx`
    pub fn number(&self, idx: usize) -> Option<u64> {
        self.fields.get(idx).and_then(Field::as_number)
    }

    /// Name field at `idx`
    pub fn name(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).and_then(Field::as_name)
    }

    /// The status line as it appears on the wire, without CRLF
    pub fn status_line(&self) -> String {
        let mut line = self.status.token().to_string();
        for field in &self.fields {
            line.push(' ');
            line.push_str(&field.to_string());
        }
        line
    }
}
