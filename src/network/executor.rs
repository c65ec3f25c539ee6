//! Command executors
//!
//! The seam between command users (the mutex, adapters) and whatever owns
//! the connection.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{Command, Reply};

use super::Connection;

/// Anything that can run one command and return its reply
pub trait Executor {
    fn execute_command(&self, command: &Command) -> Result<Reply>;
}

impl<T: Executor + ?Sized> Executor for &T {
    fn execute_command(&self, command: &Command) -> Result<Reply> {
        (**self).execute_command(command)
    }
}

impl<T: Executor + ?Sized> Executor for Arc<T> {
    fn execute_command(&self, command: &Command) -> Result<Reply> {
        (**self).execute_command(command)
    }
}

/// One connection shared behind a lock
///
/// Each command holds the lock for its full round trip.
pub struct SharedConnection {
    inner: Mutex<Connection>,
}

impl SharedConnection {
    /// Wrap a new, not yet opened connection
    pub fn new(config: Config) -> Self {
        Self::from_connection(Connection::new(config))
    }

    /// Wrap an existing connection
    pub fn from_connection(connection: Connection) -> Self {
        Self {
            inner: Mutex::new(connection),
        }
    }

    /// Run a closure with exclusive access to the connection
    pub fn with<R>(&self, f: impl FnOnce(&mut Connection) -> R) -> R {
        f(&mut self.inner.lock())
    }

    /// Close the underlying connection
    pub fn close(&self) -> Result<()> {
        self.inner.lock().close()
    }
}

impl Executor for SharedConnection {
    fn execute_command(&self, command: &Command) -> Result<Reply> {
        self.inner.lock().execute_command(command)
    }
}
