//! # lockwire
//!
//! A blocking client for RESP key-value stores with:
//! - A binary-safe command/reply codec
//! - Lazy connections over TCP or unix sockets (AUTH/SELECT handshake)
//! - Connection sharing via a locked connection or a bounded pool
//! - A lease-based distributed mutex with owner-checked release
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   DistributedMutex                           │
//! │          acquire: SET NX PX   release: EVAL check-and-DEL    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Executor
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌──────────────────┐     ┌──────────────────┐
//!   │ SharedConnection │     │  ConnectionPool  │
//!   └────────┬─────────┘     └────────┬─────────┘
//!            └────────────┬───────────┘
//!                         ▼
//!                 ┌───────────────┐
//!                 │  Connection   │
//!                 │ (TCP / unix)  │
//!                 └───────┬───────┘
//!                         ▼
//!                 ┌───────────────┐
//!                 │     Codec     │
//!                 │    (RESP)     │
//!                 └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod network;
pub mod mutex;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{LockwireError, Result};
pub use config::{Config, Endpoint};
pub use network::{Connection, ConnectionPool, Executor, SharedConnection};
pub use protocol::{Command, Reply, Status};
pub use mutex::{DistributedMutex, LockGuard, MutexOptions};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of lockwire
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
