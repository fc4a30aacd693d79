//! Client
//!
//! Typed beanstalkd operations on top of a [`Connection`]. Every method is
//! "build a command, submit it, interpret the reply"; no protocol state
//! lives here.

use std::time::Duration;

use bytes::Bytes;

use crate::config::Config;
use crate::error::{BeanError, Result};
use crate::network::{Connection, ConnectionState};
use crate::protocol::{interpret, parse_yaml_dict, parse_yaml_list, Command, Job, Reply, Stats};

/// Longest tube name the server accepts
pub const MAX_TUBE_NAME_LENGTH: usize = 200;

/// A beanstalkd client bound to one connection generation at a time
pub struct Client {
    config: Config,
    conn: Connection,
}

impl Client {
    /// Connect using `config`
    pub fn connect(config: Config) -> Result<Self> {
        let conn = Connection::open(&config)?;
        Ok(Self { config, conn })
    }

    /// Wrap an existing connection
    pub fn from_connection(conn: Connection, config: Config) -> Self {
        Self { config, conn }
    }

    /// Replace the current connection with a fresh generation.
    ///
    /// Calls pending on the old connection fail with `ConnectionClosed`.
    /// Tube selections (`use`, `watch`) are per connection and start over.
    pub fn reconnect(&mut self) -> Result<()> {
        let fresh = Connection::open(&self.config)?;
        let old = std::mem::replace(&mut self.conn, fresh);
        tracing::debug!(
            "Reconnected: generation #{} replaces #{}",
            self.conn.generation(),
            old.generation()
        );
        old.close()
    }

    pub fn close(&self) -> Result<()> {
        self.conn.close()
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Producer operations
    // =========================================================================

    /// Queue a job and return its id
    pub fn put(&self, priority: u32, delay: u32, ttr: u32, body: impl Into<Bytes>) -> Result<u64> {
        match self.request(&Command::put(priority, delay, ttr, body))? {
            Reply::Inserted(id) => Ok(id),
            other => Err(unexpected(other)),
        }
    }

    /// Select the tube `put` goes to
    pub fn use_tube(&self, tube: &str) -> Result<String> {
        validate_tube(tube)?;
        self.expect_tube(&Command::use_tube(tube))
    }

    // =========================================================================
    // Worker operations
    // =========================================================================

    /// Block until a job is available. Not subject to the response timeout.
    pub fn reserve(&self) -> Result<Job> {
        let reply = self.request_with(&Command::reserve(), None)?;
        expect_job(reply)
    }

    /// Reserve, giving up server-side after `seconds`
    pub fn reserve_with_timeout(&self, seconds: u32) -> Result<Job> {
        let wait = self
            .config
            .response_timeout()
            .map(|t| t + Duration::from_secs(u64::from(seconds)));
        let reply = self.request_with(&Command::reserve_with_timeout(seconds), wait)?;
        expect_job(reply)
    }

    pub fn reserve_job(&self, id: u64) -> Result<Job> {
        expect_job(self.request(&Command::reserve_job(id))?)
    }

    pub fn delete(&self, id: u64) -> Result<()> {
        self.expect_ack(&Command::delete(id))
    }

    pub fn release(&self, id: u64, priority: u32, delay: u32) -> Result<()> {
        self.expect_ack(&Command::release(id, priority, delay))
    }

    pub fn bury(&self, id: u64, priority: u32) -> Result<()> {
        self.expect_ack(&Command::bury(id, priority))
    }

    pub fn touch(&self, id: u64) -> Result<()> {
        self.expect_ack(&Command::touch(id))
    }

    /// Add a tube to the watch list, returning the list size
    pub fn watch(&self, tube: &str) -> Result<u64> {
        validate_tube(tube)?;
        self.expect_count(&Command::watch(tube))
    }

    /// Remove a tube from the watch list, returning the list size
    pub fn ignore(&self, tube: &str) -> Result<u64> {
        validate_tube(tube)?;
        self.expect_count(&Command::ignore(tube))
    }

    // =========================================================================
    // Inspection and admin operations
    // =========================================================================

    pub fn peek(&self, id: u64) -> Result<Job> {
        expect_job(self.request(&Command::peek(id))?)
    }

    pub fn peek_ready(&self) -> Result<Job> {
        expect_job(self.request(&Command::peek_ready())?)
    }

    pub fn peek_delayed(&self) -> Result<Job> {
        expect_job(self.request(&Command::peek_delayed())?)
    }

    pub fn peek_buried(&self) -> Result<Job> {
        expect_job(self.request(&Command::peek_buried())?)
    }

    /// Kick up to `bound` buried or delayed jobs, returning how many moved
    pub fn kick(&self, bound: u64) -> Result<u64> {
        self.expect_count(&Command::kick(bound))
    }

    pub fn kick_job(&self, id: u64) -> Result<()> {
        self.expect_ack(&Command::kick_job(id))
    }

    pub fn stats_job(&self, id: u64) -> Result<Stats> {
        parse_yaml_dict(&self.expect_data(&Command::stats_job(id))?)
    }

    pub fn stats_tube(&self, tube: &str) -> Result<Stats> {
        validate_tube(tube)?;
        parse_yaml_dict(&self.expect_data(&Command::stats_tube(tube))?)
    }

    pub fn stats(&self) -> Result<Stats> {
        parse_yaml_dict(&self.expect_data(&Command::stats())?)
    }

    pub fn list_tubes(&self) -> Result<Vec<String>> {
        parse_yaml_list(&self.expect_data(&Command::list_tubes())?)
    }

    pub fn list_tubes_watched(&self) -> Result<Vec<String>> {
        parse_yaml_list(&self.expect_data(&Command::list_tubes_watched())?)
    }

    pub fn list_tube_used(&self) -> Result<String> {
        self.expect_tube(&Command::list_tube_used())
    }

    pub fn pause_tube(&self, tube: &str, delay: u32) -> Result<()> {
        validate_tube(tube)?;
        self.expect_ack(&Command::pause_tube(tube, delay))
    }

    /// Ask the server to hang up, then close locally
    pub fn quit(&self) -> Result<()> {
        // The server closes without replying
        self.conn.submit(&Command::quit())?.cancel();
        self.conn.close()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn request(&self, command: &Command) -> Result<Reply> {
        self.request_with(command, self.config.response_timeout())
    }

    fn request_with(&self, command: &Command, timeout: Option<Duration>) -> Result<Reply> {
        let handle = self.conn.submit(command)?;
        let kind = handle.kind();

        let frame = match timeout {
            Some(timeout) => handle.wait_timeout(timeout)?,
            None => handle.wait()?,
        };

        interpret(kind, &frame)?.map_err(BeanError::Server)
    }

    fn expect_ack(&self, command: &Command) -> Result<()> {
        match self.request(command)? {
            Reply::Ack => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    fn expect_count(&self, command: &Command) -> Result<u64> {
        match self.request(command)? {
            Reply::Count(n) => Ok(n),
            other => Err(unexpected(other)),
        }
    }

    fn expect_tube(&self, command: &Command) -> Result<String> {
        match self.request(command)? {
            Reply::Tube(name) => Ok(name),
            other => Err(unexpected(other)),
        }
    }

    fn expect_data(&self, command: &Command) -> Result<Bytes> {
        match self.request(command)? {
            Reply::Data(data) => Ok(data),
            other => Err(unexpected(other)),
        }
    }
}

fn expect_job(reply: Reply) -> Result<Job> {
    match reply {
        Reply::Job(job) => Ok(job),
        other => Err(unexpected(other)),
    }
}

fn unexpected(reply: Reply) -> BeanError {
    BeanError::UnrecognizedStatus(format!("unexpected reply {:?}", reply))
}

/// Check a tube name against the server's naming rules
pub fn validate_tube(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_TUBE_NAME_LENGTH {
        return Err(BeanError::InvalidCommand(format!(
            "tube name must be 1..={} bytes, got {}",
            MAX_TUBE_NAME_LENGTH,
            name.len()
        )));
    }
    if name.starts_with('-') {
        return Err(BeanError::InvalidCommand(format!(
            "tube name {:?} starts with '-'",
            name
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || "-+/;.$_()".contains(*c)))
    {
        return Err(BeanError::InvalidCommand(format!(
            "tube name {:?} contains {:?}",
            name, c
        )));
    }
    Ok(())
}
