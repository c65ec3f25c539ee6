//! Network Module
//!
//! Blocking client connections to the store.
//!
//! ## Architecture
//! - `Transport`: TCP or unix socket byte stream
//! - `Connection`: lazy open, AUTH/SELECT handshake, one command in flight
//! - `SharedConnection` / `ConnectionPool`: ways to share connections,
//!   both behind the `Executor` trait

mod transport;
mod connection;
mod commands;
mod executor;
mod pool;

pub(crate) use commands::{eval_command, set_outcome, ttl_millis};

pub use transport::Transport;
pub use connection::{Connection, ConnectionState};
pub use executor::{Executor, SharedConnection};
pub use pool::{ConnectionPool, PooledConnection};
