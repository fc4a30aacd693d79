//! Response interpretation
//!
//! Maps a decoded frame, given the kind of command that produced it, to a
//! typed reply or a domain error. Pure: no I/O, no connection state.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_yaml::Value;

use super::{CommandKind, ResponseFrame, Status};
use crate::error::{BeanError, Result, ServerError};

/// A job as returned by `reserve` and the `peek` family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: u64,
    pub body: Bytes,
}

/// Successful reply to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `put` accepted, with the id the server assigned
    Inserted(u64),
    /// Tube now in use
    Tube(String),
    Job(Job),
    /// Watch list size or number of kicked jobs
    Count(u64),
    /// YAML payload of the `stats` and `list` commands
    Data(Bytes),
    /// Bare acknowledgement
    Ack,
}

/// Either a typed reply or the domain error the server answered with
pub type Outcome = std::result::Result<Reply, ServerError>;

/// Interpret `frame` as the reply to a command of kind `kind`
///
/// Fails only with [`BeanError::UnrecognizedStatus`] when the status is not
/// one the command can legally receive.
pub fn interpret(kind: CommandKind, frame: &ResponseFrame) -> Result<Outcome> {
    use CommandKind as K;
    use Status as S;

    // Errors any command may receive
    match frame.status {
        S::OutOfMemory => return Ok(Err(ServerError::OutOfMemory)),
        S::InternalError => return Ok(Err(ServerError::InternalError)),
        S::BadFormat => return Ok(Err(ServerError::BadFormat)),
        S::UnknownCommand => return Ok(Err(ServerError::UnknownCommand)),
        _ => {}
    }

    let unrecognized = || {
        BeanError::UnrecognizedStatus(format!(
            "{} in reply to {}",
            frame.status_line(),
            kind.verb().unwrap_or("unknown verb")
        ))
    };

    let outcome = match (kind, frame.status) {
        (K::Put, S::Inserted) => Ok(Reply::Inserted(frame.number(0).ok_or_else(unrecognized)?)),
        (K::Put, S::Buried) => Err(ServerError::Buried(frame.number(0))),
        (K::Put, S::ExpectedCrlf) => Err(ServerError::ExpectedCrlf),
        (K::Put, S::JobTooBig) => Err(ServerError::JobTooBig),
        (K::Put, S::Draining) => Err(ServerError::Draining),

        (K::Use | K::ListTubeUsed, S::Using) => {
            Ok(Reply::Tube(frame.name(0).ok_or_else(unrecognized)?.to_string()))
        }

        (K::Reserve | K::ReserveWithTimeout | K::ReserveJob, S::Reserved)
        | (K::Peek | K::PeekReady | K::PeekDelayed | K::PeekBuried, S::Found) => {
            Ok(Reply::Job(job(frame).ok_or_else(unrecognized)?))
        }
        (K::Reserve | K::ReserveWithTimeout, S::DeadlineSoon) => Err(ServerError::DeadlineSoon),
        (K::Reserve | K::ReserveWithTimeout, S::TimedOut) => Err(ServerError::TimedOut),

        (K::Delete, S::Deleted)
        | (K::Release, S::Released)
        | (K::Bury, S::Buried)
        | (K::Touch, S::Touched)
        | (K::KickJob, S::Kicked)
        | (K::PauseTube, S::Paused) => Ok(Reply::Ack),
        (K::Release, S::Buried) => Err(ServerError::Buried(None)),

        (K::Watch | K::Ignore, S::Watching) | (K::Kick, S::Kicked) => {
            Ok(Reply::Count(frame.number(0).ok_or_else(unrecognized)?))
        }
        (K::Ignore, S::NotIgnored) => Err(ServerError::NotIgnored),

        (K::StatsJob | K::StatsTube | K::Stats | K::ListTubes | K::ListTubesWatched, S::Ok) => {
            Ok(Reply::Data(frame.body.clone().ok_or_else(unrecognized)?))
        }

        (
            K::ReserveJob
            | K::Delete
            | K::Release
            | K::Bury
            | K::Touch
            | K::Peek
            | K::PeekReady
            | K::PeekDelayed
            | K::PeekBuried
            | K::KickJob
            | K::StatsJob
            | K::StatsTube
            | K::PauseTube,
            S::NotFound,
        ) => Err(ServerError::NotFound),

        _ => return Err(unrecognized()),
    };

    Ok(outcome)
}

fn job(frame: &ResponseFrame) -> Option<Job> {
    Some(Job {
        id: frame.number(0)?,
        body: frame.body.clone()?,
    })
}

// =============================================================================
// YAML payloads
// =============================================================================

/// Key/value statistics from `stats`, `stats-tube` and `stats-job`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stats(BTreeMap<String, String>);

impl Stats {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Numeric value for `key`, `None` if absent or not a number
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key)?.parse().ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse the YAML list the server sends for `list-tubes*`
pub fn parse_yaml_list(body: &[u8]) -> Result<Vec<String>> {
    from_yaml::<Vec<Value>>(body)?
        .unwrap_or_default()
        .into_iter()
        .map(scalar)
        .collect()
}

/// Parse the YAML dictionary the server sends for `stats*`
pub fn parse_yaml_dict(body: &[u8]) -> Result<Stats> {
    let mut map = BTreeMap::new();
    for (key, value) in from_yaml::<BTreeMap<String, Value>>(body)?.unwrap_or_default() {
        map.insert(key, scalar(value)?);
    }
    Ok(Stats(map))
}

/// An empty document decodes to `None`
fn from_yaml<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>> {
    serde_yaml::from_slice(body)
        .map_err(|e| BeanError::ProtocolViolation(format!("malformed YAML payload: {}", e)))
}

fn scalar(value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(BeanError::ProtocolViolation(format!(
            "expected a scalar in YAML payload, got {:?}",
            other
        ))),
    }
}
