//! Connection Handler
//!
//! A single blocking client connection to the store.

use std::io::{BufReader, BufWriter};
use std::thread;
use std::time::Duration;

use crate::config::{Config, Endpoint};
use crate::error::{LockwireError, Result};
use crate::protocol::{read_reply, write_command, Command, Reply, ToArg};

use super::transport::Transport;

/// Lifecycle of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Connecting,
    Open,
}

/// Buffered halves of an open socket
struct Socket {
    reader: BufReader<Transport>,
    writer: BufWriter<Transport>,
}

/// A client connection
///
/// ## Lifecycle
/// - Created `Closed`; the first `execute` opens it.
/// - I/O and protocol failures drop the socket; the next `execute`
///   reconnects.
/// - An explicit `close()` is final until `open()` is called again.
///
/// One command is in flight at a time: replies are read in send order, so
/// concurrent callers need their own connection, a `SharedConnection`, or a
/// `ConnectionPool`.
pub struct Connection {
    config: Config,
    socket: Option<Socket>,
    state: ConnectionState,

    /// Set by close(), cleared by open()
    shut_down: bool,
}

impl Connection {
    /// Create a connection (no I/O until first use)
    pub fn new(config: Config) -> Self {
        Self {
            config,
            socket: None,
            state: ConnectionState::Closed,
            shut_down: false,
        }
    }

    /// Open the socket and run the AUTH/SELECT handshake
    ///
    /// No-op if already open.
    pub fn open(&mut self) -> Result<()> {
        if self.state == ConnectionState::Open {
            return Ok(());
        }

        self.shut_down = false;
        self.state = ConnectionState::Connecting;
        tracing::debug!("Opening connection to {}", self.config.endpoint);

        let socket = match self.connect_socket() {
            Ok(socket) => socket,
            Err(e) => {
                self.state = ConnectionState::Closed;
                tracing::debug!("Failed to open connection to {}: {}", self.config.endpoint, e);
                return Err(e);
            }
        };
        self.socket = Some(socket);
        self.state = ConnectionState::Open;

        if let Err(e) = self.handshake() {
            tracing::warn!("Handshake with {} failed: {}", self.config.endpoint, e);
            self.teardown();
            return Err(e);
        }

        tracing::debug!("Connection to {} established", self.config.endpoint);
        Ok(())
    }

    /// Connect and configure timeouts before anything is sent
    fn connect_socket(&self) -> Result<Socket> {
        let transport = Transport::connect(&self.config.endpoint, self.config.connect_timeout())?;
        transport.set_timeouts(self.config.data_timeout())?;

        // Clone stream for separate read/write handles
        let read_half = transport.try_clone()?;
        Ok(Socket {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(transport),
        })
    }

    fn handshake(&mut self) -> Result<()> {
        if let Some(password) = &self.config.password {
            let mut auth = Command::new("AUTH");
            if let Some(username) = &self.config.username {
                auth = auth.arg(username);
            }
            let auth = auth.arg(password);
            self.round_trip(&auth)?;
        }

        if self.config.database != 0 {
            let select = Command::new("SELECT").arg(self.config.database);
            self.round_trip(&select)?;
        }

        Ok(())
    }

    /// Execute a command and return its reply
    ///
    /// `name` may hold a multi-word verb ("CLIENT SETNAME"); it is split into
    /// separate tokens ahead of `args`.
    pub fn execute<I, A>(&mut self, name: &str, args: I) -> Result<Reply>
    where
        I: IntoIterator<Item = A>,
        A: ToArg,
    {
        self.execute_command(&Command::with_args(name, args))
    }

    /// Execute a prebuilt command and return its reply
    ///
    /// Server errors come back as `LockwireError::Remote` and leave the
    /// connection usable. Failures to open the socket or to write the command
    /// are retried up to `Config::retries` times on a fresh socket. Once the
    /// command has been written it is never resent: the server may already
    /// have applied it, so a lost reply surfaces as an error.
    pub fn execute_command(&mut self, command: &Command) -> Result<Reply> {
        if self.shut_down {
            return Err(LockwireError::Closed);
        }

        let mut attempt = 0;
        loop {
            match self.open().and_then(|_| self.send(command)) {
                Ok(()) => return self.receive(),
                Err(e) if e.is_retryable() && attempt < self.config.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} to {} failed before sending ({}), retrying ({}/{})",
                        command.name(),
                        self.config.endpoint,
                        e,
                        attempt,
                        self.config.retries
                    );
                    thread::sleep(Duration::from_millis(self.config.retry_interval_ms));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Write one command and read one reply on the open socket
    fn round_trip(&mut self, command: &Command) -> Result<Reply> {
        self.send(command)?;
        self.receive()
    }

    fn send(&mut self, command: &Command) -> Result<()> {
        let socket = self.socket.as_mut().ok_or(LockwireError::Closed)?;

        tracing::trace!("Sending {} to {}", command.name(), self.config.endpoint);

        let result = write_command(&mut socket.writer, command);
        self.check(result)
    }

    fn receive(&mut self) -> Result<Reply> {
        let socket = self.socket.as_mut().ok_or(LockwireError::Closed)?;
        let result = read_reply(&mut socket.reader);
        self.check(result)
    }

    /// Tear the socket down after a fatal error
    fn check<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_fatal() {
                // The stream may be desynchronized; never reuse it
                tracing::debug!(
                    "Dropping connection to {} after error: {}",
                    self.config.endpoint,
                    e
                );
                self.teardown();
            }
        }
        result
    }

    /// Close the connection
    ///
    /// Sends QUIT (ignoring its outcome), then shuts the socket down.
    /// Idempotent.
    pub fn close(&mut self) -> Result<()> {
        self.shut_down = true;
        self.state = ConnectionState::Closed;

        let Some(mut socket) = self.socket.take() else {
            return Ok(());
        };

        tracing::debug!("Closing connection to {}", self.config.endpoint);

        let quit = write_command(&mut socket.writer, &Command::new("QUIT"))
            .and_then(|_| read_reply(&mut socket.reader));
        if let Err(e) = quit {
            tracing::warn!("QUIT to {} failed: {}", self.config.endpoint, e);
        }

        match socket.writer.get_ref().shutdown() {
            Ok(()) => Ok(()),
            // The server may already have hung up after QUIT
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Drop the socket without QUIT (after a failure)
    fn teardown(&mut self) {
        if let Some(socket) = self.socket.take() {
            let _ = socket.writer.get_ref().shutdown();
        }
        self.state = ConnectionState::Closed;
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Whether the socket is open
    pub fn is_open(&self) -> bool {
        self.state == ConnectionState::Open
    }

    /// Whether close() was called (and open() not called since)
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// The configured endpoint
    pub fn endpoint(&self) -> &Endpoint {
        &self.config.endpoint
    }

    /// The configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.socket.is_some() {
            let _ = self.close();
        }
    }
}
