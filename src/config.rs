//! Configuration for beanwire
//!
//! Centralized configuration with sensible defaults.

use std::time::Duration;

use crate::error::{BeanError, Result};

/// Default beanstalkd address
pub const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:11300";

/// Main configuration for a beanwire connection
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Server address (host:port)
    pub server_addr: String,

    /// Connect timeout (milliseconds, 0 = OS default)
    pub connect_timeout_ms: u64,

    /// Socket write timeout (milliseconds, 0 = none).
    ///
    /// Also bounds `Connection::close` and drop, which wait for queued
    /// writes to flush. With 0, a peer that stops reading can block them
    /// indefinitely.
    pub write_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Client Configuration
    // -------------------------------------------------------------------------
    /// How long the client waits for a reply (milliseconds, 0 = forever).
    /// Never applied to a plain `reserve`.
    pub response_timeout_ms: u64,

    // -------------------------------------------------------------------------
    // Decoder Configuration
    // -------------------------------------------------------------------------
    /// Bytes requested from the socket per read
    pub read_buffer_size: usize,

    /// Largest declared body accepted from the server (in bytes)
    pub max_body_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_string(),
            connect_timeout_ms: 5000,
            write_timeout_ms: 5000,
            response_timeout_ms: 0,
            read_buffer_size: 8 * 1024,
            max_body_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Default config pointed at the given address
    pub fn from_addr(addr: impl Into<String>) -> Self {
        Self::builder().server_addr(addr).build()
    }

    /// Reject settings no connection can run with
    pub fn validate(&self) -> Result<()> {
        if self.server_addr.trim().is_empty() {
            return Err(BeanError::Config("server_addr is empty".to_string()));
        }
        if self.read_buffer_size == 0 {
            return Err(BeanError::Config("read_buffer_size must be positive".to_string()));
        }
        if self.max_body_size == 0 {
            return Err(BeanError::Config("max_body_size must be positive".to_string()));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        millis(self.connect_timeout_ms)
    }

    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }

    pub fn response_timeout(&self) -> Option<Duration> {
        millis(self.response_timeout_ms)
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the server address (host:port)
    pub fn server_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.server_addr = addr.into();
        self
    }

    /// Set the connect timeout (in milliseconds)
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.config.connect_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the response timeout (in milliseconds)
    pub fn response_timeout_ms(mut self, ms: u64) -> Self {
        self.config.response_timeout_ms = ms;
        self
    }

    /// Set the read chunk size (in bytes)
    pub fn read_buffer_size(mut self, size: usize) -> Self {
        self.config.read_buffer_size = size.max(1);
        self
    }

    /// Set the maximum accepted body size (in bytes)
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
