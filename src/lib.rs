//! # beanwire
//!
//! A beanstalkd work-queue client built around a strictly ordered,
//! pipelined protocol engine:
//! - Incremental frame decoding with declared-length binary bodies
//! - FIFO pairing of replies with commands (the protocol has no request ids)
//! - Any number of threads submitting on one connection
//! - Clean teardown: every pending call resolves, none hang
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Client (job operations)                     │
//! │        build Command → submit → interpret reply              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Connection Engine                           │
//! │      (one lock: enqueue write + register pending call)       │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │  Writer thread  │                │  Reader thread  │
//!   │  (encode/flush) │                │ (FrameDecoder)  │
//!   └────────┬────────┘                └────────┬────────┘
//!            │                                  │
//!            ▼                                  ▼
//!         socket ─────────── server ──────── socket
//!                                               │
//!                                               ▼
//!                                      ┌─────────────────┐
//!                                      │   Correlator    │
//!                                      │  (FIFO queue)   │
//!                                      └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{BeanError, Result, ServerError};
pub use config::Config;
pub use client::Client;
pub use network::{Connection, ConnectionState};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of beanwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
