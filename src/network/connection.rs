//! Connection Engine
//!
//! One [`Connection`] is one connection generation: a socket, its reader
//! and writer threads, and the queue of calls waiting on it. Nothing
//! survives the generation; reconnecting means opening a new `Connection`.
//!
//! ## Threads
//! - **Reader**: decodes frames and delivers them to the correlator
//! - **Writer**: drains the outbound queue into the socket
//!
//! ## Locking
//! `core` is the single critical section. `submit` enqueues the encoded
//! command for the writer and registers its call under it, so write order
//! and registration order cannot diverge. `deliver`, `abort_all` and the
//! state transitions take the same lock.

use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{BeanError, Result};
use crate::protocol::{encode_command, Command, FrameDecoder, ResponseFrame};

use super::correlator::Correlator;
use super::pending::{AbortReason, ResponseHandle};
use super::reader::StreamReader;
use super::writer::OutboundWriter;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    Closing,
}

/// State guarded by the connection lock
struct Core {
    state: ConnectionState,
    correlator: Correlator,
    /// Dropped to stop the writer thread
    outbound: Option<Sender<Bytes>>,
}

/// State shared with the reader and writer threads
struct Shared {
    generation: u64,
    peer_addr: String,
    core: Mutex<Core>,
    /// Kept to shut the socket down and wake the reader
    socket: TcpStream,
}

impl Shared {
    fn deliver(&self, frame: ResponseFrame) -> std::result::Result<(), AbortReason> {
        let mut core = self.core.lock();
        if core.state == ConnectionState::Disconnected {
            return Err(AbortReason::Closed);
        }

        core.correlator.deliver(frame).map_err(|e| match e {
            BeanError::ProtocolViolation(msg) => AbortReason::Violation(msg),
            other => AbortReason::Violation(other.to_string()),
        })
    }

    /// Tear the generation down after a transport or protocol failure.
    ///
    /// Idempotent: only the first caller moves the state and aborts calls.
    fn fail(&self, reason: AbortReason) {
        let aborted = {
            let mut core = self.core.lock();
            if core.state == ConnectionState::Disconnected {
                return;
            }
            core.state = ConnectionState::Disconnected;
            core.outbound = None;
            core.correlator.abort_all(&reason)
        };

        tracing::warn!(
            "Connection #{} to {} ended ({}), {} pending calls aborted",
            self.generation,
            self.peer_addr,
            reason,
            aborted
        );
        let _ = self.socket.shutdown(Shutdown::Both);
    }
}

/// A pipelined connection to one server
pub struct Connection {
    shared: Arc<Shared>,
    reader_thread: Mutex<Option<JoinHandle<()>>>,
    writer_thread: Mutex<Option<JoinHandle<()>>>,
}

impl Connection {
    /// Connect to `config.server_addr`
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        tracing::debug!("Connecting to {}", config.server_addr);
        let stream = connect(config)?;
        Self::from_stream(stream, config)
    }

    /// Start a connection generation on an already connected stream
    pub fn from_stream(stream: TcpStream, config: &Config) -> Result<Self> {
        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;
        stream.set_write_timeout(config.write_timeout())?;

        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Clone stream for separate read/write handles
        let read_half = stream.try_clone()?;
        let write_half = stream.try_clone()?;

        let (outbound_tx, outbound_rx) = channel::unbounded();
        let shared = Arc::new(Shared {
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
            peer_addr,
            core: Mutex::new(Core {
                state: ConnectionState::Connecting,
                correlator: Correlator::new(),
                outbound: Some(outbound_tx),
            }),
            socket: stream,
        });

        let reader = StreamReader::new(
            read_half,
            FrameDecoder::with_max_body(config.max_body_size),
            config.read_buffer_size,
        );
        let reader_shared = Arc::clone(&shared);
        let reader_thread = thread::Builder::new()
            .name(format!("beanwire-reader-{}", shared.generation))
            .spawn(move || {
                let reason = reader.run(|frame| reader_shared.deliver(frame));
                reader_shared.fail(reason);
            })
            .map_err(|e| {
                shared.fail(AbortReason::Lost("reader thread failed to start".to_string()));
                BeanError::Io(e)
            })?;

        let writer = OutboundWriter::new(write_half, outbound_rx);
        let writer_shared = Arc::clone(&shared);
        let writer_thread = thread::Builder::new()
            .name(format!("beanwire-writer-{}", shared.generation))
            .spawn(move || {
                if let Err(reason) = writer.run() {
                    writer_shared.fail(reason);
                }
            })
            .map_err(|e| {
                shared.fail(AbortReason::Lost("writer thread failed to start".to_string()));
                BeanError::Io(e)
            })?;

        {
            let mut core = shared.core.lock();
            // The reader may already have seen the peer hang up
            if core.state == ConnectionState::Connecting {
                core.state = ConnectionState::Open;
            }
        }
        tracing::debug!(
            "Connection #{} open to {}",
            shared.generation,
            shared.peer_addr
        );

        Ok(Self {
            shared,
            reader_thread: Mutex::new(Some(reader_thread)),
            writer_thread: Mutex::new(Some(writer_thread)),
        })
    }

    /// Write `command` and register its call, as one step.
    ///
    /// Malformed commands are rejected before anything is written. The
    /// returned handle resolves with the matching frame, or with the reason
    /// the connection ended first.
    pub fn submit(&self, command: &Command) -> Result<ResponseHandle> {
        let bytes = encode_command(command)?;

        let mut core = self.shared.core.lock();
        if core.state != ConnectionState::Open {
            return Err(BeanError::ConnectionClosed);
        }
        let outbound = core.outbound.as_ref().ok_or(BeanError::ConnectionClosed)?;
        if outbound.send(bytes).is_err() {
            return Err(BeanError::ConnectionLost("writer stopped".to_string()));
        }

        let handle = core.correlator.register(command.kind());
        tracing::trace!(
            "Submitted '{}' as call #{} on connection #{}",
            command.verb(),
            handle.seq(),
            self.shared.generation
        );
        Ok(handle)
    }

    /// Submit and block until the reply arrives
    pub fn call(&self, command: &Command) -> Result<ResponseFrame> {
        self.submit(command)?.wait()
    }

    /// Stop accepting submissions, flush queued writes, fail whatever is
    /// still pending with [`BeanError::ConnectionClosed`] and release the
    /// socket. Calling it again is a no-op.
    ///
    /// Blocks until the writer has flushed or failed, so a peer that stops
    /// reading holds this for up to the configured write timeout. With no
    /// write timeout the wait is unbounded.
    pub fn close(&self) -> Result<()> {
        {
            let mut core = self.shared.core.lock();
            if matches!(core.state, ConnectionState::Open | ConnectionState::Connecting) {
                core.state = ConnectionState::Closing;
                core.outbound = None;
            }
        }

        let mut result = Ok(());
        if let Some(writer) = self.writer_thread.lock().take() {
            if writer.join().is_err() {
                result = Err(BeanError::ConnectionLost("writer thread panicked".to_string()));
            }
        }

        let aborted = {
            let mut core = self.shared.core.lock();
            if core.state == ConnectionState::Closing {
                core.state = ConnectionState::Disconnected;
                core.correlator.abort_all(&AbortReason::Closed)
            } else {
                0
            }
        };

        let _ = self.shared.socket.shutdown(Shutdown::Both);
        if let Some(reader) = self.reader_thread.lock().take() {
            if reader.join().is_err() && result.is_ok() {
                result = Err(BeanError::ConnectionLost("reader thread panicked".to_string()));
            }
        }

        tracing::debug!(
            "Connection #{} to {} closed, {} pending calls aborted",
            self.shared.generation,
            self.shared.peer_addr,
            aborted
        );
        result
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> ConnectionState {
        self.shared.core.lock().state
    }

    /// Number of calls awaiting a reply
    pub fn pending(&self) -> usize {
        self.shared.core.lock().correlator.len()
    }

    /// Diagnostic id of this connection generation
    pub fn generation(&self) -> u64 {
        self.shared.generation
    }

    pub fn peer_addr(&self) -> &str {
        &self.shared.peer_addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn connect(config: &Config) -> Result<TcpStream> {
    let addrs: Vec<SocketAddr> = config
        .server_addr
        .to_socket_addrs()
        .map_err(|e| BeanError::Connect(format!("cannot resolve {}: {}", config.server_addr, e)))?
        .collect();

    let mut last_error = None;
    for addr in &addrs {
        let attempt = match config.connect_timeout() {
            Some(timeout) => TcpStream::connect_timeout(addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                tracing::debug!("Connect to {} failed: {}", addr, e);
                last_error = Some(e);
            }
        }
    }

    Err(BeanError::Connect(match last_error {
        Some(e) => format!("{}: {}", config.server_addr, e),
        None => format!("{}: no addresses resolved", config.server_addr),
    }))
}
