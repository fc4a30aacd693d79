//! Shared test helpers
//!
//! A scripted loopback server that speaks the wire protocol with the
//! crate's own codec, so tests control exactly which bytes arrive and when.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use beanwire::protocol::{decode_command, encode_frame, Command, Field, ResponseFrame, Status};
use beanwire::{Config, Connection};

/// Server side of one accepted connection
pub struct ServerConn {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl ServerConn {
    /// Read the next complete command, `None` once the client hangs up
    pub fn read_command(&mut self) -> Option<Command> {
        loop {
            if let Some((command, used)) = decode_command(&self.buf).unwrap() {
                self.buf.drain(..used);
                return Some(command);
            }

            let mut chunk = [0u8; 4096];
            match self.stream.read(&mut chunk) {
                Ok(0) | Err(_) => return None,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
            }
        }
    }

    /// Read exactly `n` commands
    pub fn read_commands(&mut self, n: usize) -> Vec<Command> {
        (0..n)
            .map(|_| self.read_command().expect("client hung up early"))
            .collect()
    }

    pub fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).unwrap();
        self.stream.flush().unwrap();
    }

    pub fn reply(&mut self, frame: &ResponseFrame) {
        self.send(&encode_frame(frame));
    }

    /// Answer every command with `respond` until the client hangs up
    pub fn serve<F>(mut self, mut respond: F)
    where
        F: FnMut(&Command) -> Option<ResponseFrame>,
    {
        while let Some(command) = self.read_command() {
            if let Some(frame) = respond(&command) {
                self.reply(&frame);
            }
        }
    }

    pub fn hang_up(self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// Spawn a server that accepts one connection and runs `script` on it
pub fn spawn_server<F>(script: F) -> (SocketAddr, JoinHandle<()>)
where
    F: FnOnce(ServerConn) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        script(ServerConn {
            stream,
            buf: Vec::new(),
        });
    });

    (addr, handle)
}

/// Spawn a server that accepts `count` connections one after another,
/// running `script` on each before accepting the next
pub fn spawn_sequential_server<F>(count: usize, mut script: F) -> (SocketAddr, JoinHandle<()>)
where
    F: FnMut(usize, ServerConn) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        for n in 0..count {
            let (stream, _) = listener.accept().unwrap();
            script(
                n,
                ServerConn {
                    stream,
                    buf: Vec::new(),
                },
            );
        }
    });

    (addr, handle)
}

pub fn test_config(addr: SocketAddr) -> Config {
    Config::builder()
        .server_addr(addr.to_string())
        .connect_timeout_ms(2000)
        .response_timeout_ms(5000)
        .build()
}

pub fn connect(addr: SocketAddr) -> Connection {
    Connection::open(&test_config(addr)).unwrap()
}

// =============================================================================
// Frame shorthands
// =============================================================================

pub fn inserted(id: u64) -> ResponseFrame {
    ResponseFrame::new(Status::Inserted, vec![Field::Number(id)])
}

pub fn reserved(id: u64, body: &[u8]) -> ResponseFrame {
    ResponseFrame::with_body(Status::Reserved, vec![Field::Number(id)], body.to_vec())
}

pub fn found(id: u64, body: &[u8]) -> ResponseFrame {
    ResponseFrame::with_body(Status::Found, vec![Field::Number(id)], body.to_vec())
}

pub fn ok(body: &str) -> ResponseFrame {
    ResponseFrame::with_body(Status::Ok, vec![], body.as_bytes().to_vec())
}

pub fn bare(status: Status) -> ResponseFrame {
    ResponseFrame::new(status, vec![])
}

/// How long to wait for something that must happen
pub const PATIENCE: Duration = Duration::from_secs(5);
