//! Error types for beanwire
//!
//! Provides a unified error type for all operations, plus the closed set of
//! domain errors a beanstalkd server can answer with.

use thiserror::Error;

/// Result type alias using BeanError
pub type Result<T> = std::result::Result<T, BeanError>;

/// Unified error type for beanwire operations
#[derive(Debug, Error)]
pub enum BeanError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Command Errors (rejected before any I/O)
    // -------------------------------------------------------------------------
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Connect failed: {0}")]
    Connect(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Timed out waiting for response")]
    Timeout,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Unrecognized status: {0}")]
    UnrecognizedStatus(String),

    // -------------------------------------------------------------------------
    // Server Errors (domain level, connection stays healthy)
    // -------------------------------------------------------------------------
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BeanError {
    /// Whether this error ended the connection generation it came from.
    ///
    /// A fatal error means every later submission on the same connection
    /// fails too; the caller has to open a new one.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BeanError::ProtocolViolation(_)
                | BeanError::ConnectionLost(_)
                | BeanError::ConnectionClosed
        )
    }
}

/// Domain errors answered by the server
///
/// These are ordinary outcomes of a command; they never affect other
/// in-flight calls or the health of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ServerError {
    #[error("NOT_FOUND")]
    NotFound,

    /// The job was buried; `put` reports the id the server assigned.
    #[error("BURIED")]
    Buried(Option<u64>),

    #[error("DEADLINE_SOON")]
    DeadlineSoon,

    #[error("TIMED_OUT")]
    TimedOut,

    #[error("DRAINING")]
    Draining,

    #[error("OUT_OF_MEMORY")]
    OutOfMemory,

    #[error("INTERNAL_ERROR")]
    InternalError,

    #[error("JOB_TOO_BIG")]
    JobTooBig,

    #[error("EXPECTED_CRLF")]
    ExpectedCrlf,

    #[error("UNKNOWN_COMMAND")]
    UnknownCommand,

    #[error("BAD_FORMAT")]
    BadFormat,

    #[error("NOT_IGNORED")]
    NotIgnored,
}
