//! Command definitions
//!
//! Represents commands sent to the server. A command is a verb, ordered
//! argument tokens and an optional body; the named constructors below cover
//! every beanstalkd operation.

use bytes::Bytes;

/// Command types, keyed by verb
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Put,
    Use,
    Reserve,
    ReserveWithTimeout,
    ReserveJob,
    Delete,
    Release,
    Bury,
    Touch,
    Watch,
    Ignore,
    Peek,
    PeekReady,
    PeekDelayed,
    PeekBuried,
    Kick,
    KickJob,
    StatsJob,
    StatsTube,
    Stats,
    ListTubes,
    ListTubeUsed,
    ListTubesWatched,
    PauseTube,
    Quit,
    /// A verb this crate has no response table for
    Other,
}

impl CommandKind {
    const VERBS: [(&'static str, CommandKind); 25] = [
        ("put", CommandKind::Put),
        ("use", CommandKind::Use),
        ("reserve", CommandKind::Reserve),
        ("reserve-with-timeout", CommandKind::ReserveWithTimeout),
        ("reserve-job", CommandKind::ReserveJob),
        ("delete", CommandKind::Delete),
        ("release", CommandKind::Release),
        ("bury", CommandKind::Bury),
        ("touch", CommandKind::Touch),
        ("watch", CommandKind::Watch),
        ("ignore", CommandKind::Ignore),
        ("peek", CommandKind::Peek),
        ("peek-ready", CommandKind::PeekReady),
        ("peek-delayed", CommandKind::PeekDelayed),
        ("peek-buried", CommandKind::PeekBuried),
        ("kick", CommandKind::Kick),
        ("kick-job", CommandKind::KickJob),
        ("stats-job", CommandKind::StatsJob),
        ("stats-tube", CommandKind::StatsTube),
        ("stats", CommandKind::Stats),
        ("list-tubes", CommandKind::ListTubes),
        ("list-tube-used", CommandKind::ListTubeUsed),
        ("list-tubes-watched", CommandKind::ListTubesWatched),
        ("pause-tube", CommandKind::PauseTube),
        ("quit", CommandKind::Quit),
    ];

    /// Look up the kind for a verb token
    pub fn from_verb(verb: &str) -> CommandKind {
        Self::VERBS
            .iter()
            .find(|(v, _)| *v == verb)
            .map(|(_, kind)| *kind)
            .unwrap_or(CommandKind::Other)
    }

    /// The wire verb, `None` for [`CommandKind::Other`]
    pub fn verb(self) -> Option<&'static str> {
        Self::VERBS
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(v, _)| *v)
    }

    /// Whether commands of this kind carry a declared-length body
    pub fn carries_body(self) -> bool {
        matches!(self, CommandKind::Put)
    }
}

/// A command ready to be framed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: String,
    args: Vec<String>,
    body: Option<Bytes>,
}

impl Command {
    /// Start a command with the given verb and no arguments
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into(),
            args: Vec::new(),
            body: None,
        }
    }

    /// Append an argument token
    pub fn arg(mut self, arg: impl ToString) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Attach a body. Its length is appended as the last argument on the wire.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    /// Argument tokens, not including the body length
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn payload(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Get the command type
    pub fn kind(&self) -> CommandKind {
        CommandKind::from_verb(&self.verb)
    }

    // =========================================================================
    // Producer commands
    // =========================================================================

    pub fn put(priority: u32, delay: u32, ttr: u32, body: impl Into<Bytes>) -> Self {
        Self::new("put").arg(priority).arg(delay).arg(ttr).body(body)
    }

    pub fn use_tube(tube: &str) -> Self {
        Self::new("use").arg(tube)
    }

    // =========================================================================
    // Worker commands
    // =========================================================================

    pub fn reserve() -> Self {
        Self::new("reserve")
    }

    pub fn reserve_with_timeout(seconds: u32) -> Self {
        Self::new("reserve-with-timeout").arg(seconds)
    }

    pub fn reserve_job(id: u64) -> Self {
        Self::new("reserve-job").arg(id)
    }

    pub fn delete(id: u64) -> Self {
        Self::new("delete").arg(id)
    }

    pub fn release(id: u64, priority: u32, delay: u32) -> Self {
        Self::new("release").arg(id).arg(priority).arg(delay)
    }

    pub fn bury(id: u64, priority: u32) -> Self {
        Self::new("bury").arg(id).arg(priority)
    }

    pub fn touch(id: u64) -> Self {
        Self::new("touch").arg(id)
    }

    pub fn watch(tube: &str) -> Self {
        Self::new("watch").arg(tube)
    }

    pub fn ignore(tube: &str) -> Self {
        Self::new("ignore").arg(tube)
    }

    // =========================================================================
    // Other commands
    // =========================================================================

    pub fn peek(id: u64) -> Self {
        Self::new("peek").arg(id)
    }

    pub fn peek_ready() -> Self {
        Self::new("peek-ready")
    }

    pub fn peek_delayed() -> Self {
        Self::new("peek-delayed")
    }

    pub fn peek_buried() -> Self {
        Self::new("peek-buried")
    }

    pub fn kick(bound: u64) -> Self {
        Self::new("kick").arg(bound)
    }

    pub fn kick_job(id: u64) -> Self {
        Self::new("kick-job").arg(id)
    }

    pub fn stats_job(id: u64) -> Self {
        Self::new("stats-job").arg(id)
    }

    pub fn stats_tube(tube: &str) -> Self {
        Self::new("stats-tube").arg(tube)
    }

    pub fn stats() -> Self {
        Self::new("stats")
    }

    pub fn list_tubes() -> Self {
        Self::new("list-tubes")
    }

    pub fn list_tube_used() -> Self {
        Self::new("list-tube-used")
    }

    pub fn list_tubes_watched() -> Self {
        Self::new("list-tubes-watched")
    }

    pub fn pause_tube(tube: &str, delay: u32) -> Self {
        Self::new("pause-tube").arg(tube).arg(delay)
    }

    pub fn quit() -> Self {
        Self::new("quit")
    }
}
