//! Connection Pool
//!
//! A bounded set of lazily created connections.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::config::Config;
use crate::error::{LockwireError, Result};
use crate::protocol::{Command, Reply};

use super::{Connection, Executor};

/// Pool of connections to one endpoint
///
/// ## Concurrency:
/// - Idle connections wait in a bounded crossbeam channel
/// - `created` counts connections handed out or idle (never above `size`)
/// - All methods use `&self`
pub struct ConnectionPool {
    config: Config,
    size: usize,
    idle_tx: Sender<Connection>,
    idle_rx: Receiver<Connection>,
    created: AtomicUsize,
}

impl ConnectionPool {
    /// Create an empty pool; connections are made on demand
    pub fn new(config: Config) -> Self {
        let size = config.pool_size.max(1);
        let (idle_tx, idle_rx) = channel::bounded(size);
        Self {
            config,
            size,
            idle_tx,
            idle_rx,
            created: AtomicUsize::new(0),
        }
    }

    /// Check out a connection
    ///
    /// Reuses an idle connection, creates one while under `pool_size`, and
    /// otherwise waits up to `pool_timeout_ms` for one to come back.
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        if let Ok(connection) = self.idle_rx.try_recv() {
            return Ok(self.wrap(connection));
        }

        let reserved = self
            .created
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.size).then_some(n + 1)
            })
            .is_ok();
        if reserved {
            tracing::debug!(
                "Pool for {} creating connection {}/{}",
                self.config.endpoint,
                self.created.load(Ordering::Acquire),
                self.size
            );
            return Ok(self.wrap(Connection::new(self.config.clone())));
        }

        let timeout = Duration::from_millis(self.config.pool_timeout_ms);
        match self.idle_rx.recv_timeout(timeout) {
            Ok(connection) => Ok(self.wrap(connection)),
            Err(RecvTimeoutError::Timeout) => Err(LockwireError::Pool(format!(
                "no connection available within {} ms",
                self.config.pool_timeout_ms
            ))),
            Err(RecvTimeoutError::Disconnected) => {
                Err(LockwireError::Pool("pool is shut down".to_string()))
            }
        }
    }

    fn wrap(&self, connection: Connection) -> PooledConnection<'_> {
        PooledConnection {
            pool: self,
            connection: Some(connection),
        }
    }

    fn put_back(&self, connection: Connection) {
        // A connection closed by its user leaves the pool for good
        if connection.is_shut_down() {
            self.created.fetch_sub(1, Ordering::AcqRel);
            return;
        }
        if let Err(rejected) = self.idle_tx.try_send(connection) {
            drop(rejected.into_inner());
            self.created.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Number of idle connections
    pub fn idle_count(&self) -> usize {
        self.idle_rx.len()
    }

    /// Number of connections currently owned by the pool or its users
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::Acquire)
    }

    /// Maximum number of connections
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Executor for ConnectionPool {
    fn execute_command(&self, command: &Command) -> Result<Reply> {
        self.get()?.execute_command(command)
    }
}

/// A connection checked out of a pool; returned on drop
pub struct PooledConnection<'a> {
    pool: &'a ConnectionPool,
    connection: Option<Connection>,
}

impl Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        self.connection
            .as_ref()
            .expect("pooled connection is present until drop")
    }
}

impl DerefMut for PooledConnection<'_> {
    fn deref_mut(&mut self) -> &mut Connection {
        self.connection
            .as_mut()
            .expect("pooled connection is present until drop")
    }
}

impl Drop for PooledConnection<'_> {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            self.pool.put_back(connection);
        }
    }
}
