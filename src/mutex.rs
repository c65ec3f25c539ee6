//! Distributed Mutex
//!
//! Exclusive, auto-expiring locks stored in the key-value server.
//!
//! ## Protocol
//! - **acquire**: `SET <key> <token> NX PX <lease>`; a single atomic write
//!   that only succeeds when no one holds the key.
//! - **release**: `EVAL` of a script that deletes the key only while it
//!   still holds our token, so an expired-and-reassigned lock is never
//!   deleted by its previous owner.
//!
//! ## Ownership
//! The server is the arbiter. Each mutex instance keeps a `name → token`
//! record of the locks it believes it holds; that belief can go stale when a
//! lease expires, and release tolerates it.

use std::collections::HashMap;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::error::Result;
use crate::network::{eval_command, set_outcome, ttl_millis, Executor};
use crate::protocol::Command;

/// Deletes KEYS[1] only if it still holds ARGV[1]; returns 1 or 0
pub const RELEASE_SCRIPT: &str = r#"if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end"#;

/// Length of an ownership token
pub const TOKEN_LEN: usize = 32;

/// Hashed together with the lock name to build its key
const KEY_DOMAIN: &[u8] = b"lockwire::mutex\0";

/// Tunables of a DistributedMutex
#[derive(Debug, Clone)]
pub struct MutexOptions {
    /// Server-side expiry of every lock
    pub lease: Duration,

    /// Prepended to every lock key
    pub key_prefix: String,

    /// Pause between acquire attempts
    pub retry_interval: Duration,

    /// Release still-held locks on drop
    pub auto_release: bool,
}

impl Default for MutexOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for MutexOptions {
    fn from(config: &Config) -> Self {
        Self {
            lease: Duration::from_millis(config.lock_lease_ms),
            key_prefix: config.lock_key_prefix.clone(),
            retry_interval: Duration::from_millis(config.lock_retry_interval_ms),
            auto_release: config.lock_auto_release,
        }
    }
}

/// Derive the store key of a lock
///
/// `prefix` followed by the hex SHA-256 of the lock name, so arbitrary names
/// map to fixed-size keys.
pub fn lock_key(prefix: &str, name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(KEY_DOMAIN);
    hasher.update(name.as_bytes());
    format!("{}{:x}", prefix, hasher.finalize())
}

/// Generate a fresh ownership token
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// A lease-based lock manager over any command executor
///
/// Per lock name:
/// ```text
/// UNLOCKED --acquire ok--> LOCKED --release ok / lease expiry--> UNLOCKED
/// ```
pub struct DistributedMutex<E: Executor> {
    executor: E,
    options: MutexOptions,

    /// Locks this instance believes it holds: name → token
    held: Mutex<HashMap<String, String>>,
}

impl<E: Executor> DistributedMutex<E> {
    /// Create a mutex over an executor
    pub fn new(executor: E, options: MutexOptions) -> Self {
        Self {
            executor,
            options,
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Create a mutex with options taken from a Config
    pub fn from_config(executor: E, config: &Config) -> Self {
        Self::new(executor, MutexOptions::from(config))
    }

    /// Acquire a lock
    ///
    /// Tries once, then keeps retrying every `retry_interval` until `timeout`
    /// has elapsed. A zero timeout means a single attempt. A timeout too large
    /// to add to the current instant (such as `Duration::MAX`) waits until the
    /// lock is won or a command fails.
    ///
    /// Returns `Ok(false)` when someone else still holds the lock; only
    /// transport, protocol and server failures are errors.
    pub fn acquire(&self, name: &str, timeout: Duration) -> Result<bool> {
        let key = self.key_for(name);
        let token = generate_token();
        // None: the timeout is too large to represent, so wait indefinitely
        let deadline = Instant::now().checked_add(timeout);
        let mut attempts: u64 = 0;

        loop {
            attempts += 1;
            if self.try_set(&key, &token)? {
                self.held.lock().insert(name.to_string(), token);
                tracing::debug!("Acquired lock '{}' after {} attempt(s)", name, attempts);
                return Ok(true);
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        tracing::debug!(
                            "Lock '{}' still held elsewhere after {} attempt(s)",
                            name,
                            attempts
                        );
                        return Ok(false);
                    }
                    self.options.retry_interval.min(deadline - now)
                }
                None => self.options.retry_interval,
            };
            thread::sleep(pause);
        }
    }

    fn try_set(&self, key: &str, token: &str) -> Result<bool> {
        let command = Command::new("SET")
            .arg(key)
            .arg(token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(self.options.lease));
        set_outcome(self.executor.execute_command(&command)?)
    }

    /// Release a lock
    ///
    /// Returns `Ok(false)` without touching the server when this instance
    /// holds no record for `name`, and `Ok(false)` when the lease already
    /// expired and the key no longer carries our token. The local record is
    /// dropped in both server outcomes.
    pub fn release(&self, name: &str) -> Result<bool> {
        let Some(token) = self.held.lock().get(name).cloned() else {
            return Ok(false);
        };

        let key = self.key_for(name);
        let command = eval_command(RELEASE_SCRIPT, &[key.as_str()], &[token.as_str()]);
        let deleted = self.executor.execute_command(&command)?.as_integer()?;

        {
            let mut held = self.held.lock();
            if held.get(name) == Some(&token) {
                held.remove(name);
            }
        }

        if deleted == 1 {
            tracing::debug!("Released lock '{}'", name);
            Ok(true)
        } else {
            tracing::debug!("Lock '{}' had expired before release", name);
            Ok(false)
        }
    }

    /// Acquire a lock and wrap it in a guard that releases on drop
    pub fn lock(&self, name: &str, timeout: Duration) -> Result<Option<LockGuard<'_, E>>> {
        Ok(self.acquire(name, timeout)?.then(|| LockGuard {
            mutex: self,
            name: name.to_string(),
            released: false,
        }))
    }

    /// Release every lock this instance holds
    ///
    /// Keeps going past failures and reports the first one. Returns how many
    /// locks were actually released.
    pub fn release_all(&self) -> Result<usize> {
        let mut released = 0;
        let mut first_error = None;

        for name in self.held_names() {
            match self.release(&name) {
                Ok(true) => released += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Failed to release lock '{}': {}", name, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(released),
        }
    }

    /// Whether this instance believes it holds `name`
    pub fn is_held(&self, name: &str) -> bool {
        self.held.lock().contains_key(name)
    }

    /// Names of all locks this instance believes it holds
    pub fn held_names(&self) -> Vec<String> {
        self.held.lock().keys().cloned().collect()
    }

    /// The store key for a lock name
    pub fn key_for(&self, name: &str) -> String {
        lock_key(&self.options.key_prefix, name)
    }

    /// The options this mutex was built with
    pub fn options(&self) -> &MutexOptions {
        &self.options
    }

    /// The executor commands are sent through
    pub fn executor(&self) -> &E {
        &self.executor
    }
}

impl<E: Executor> Drop for DistributedMutex<E> {
    fn drop(&mut self) {
        if !self.options.auto_release || self.held.lock().is_empty() {
            return;
        }
        if let Err(e) = self.release_all() {
            tracing::warn!("Auto-release on drop failed: {}", e);
        }
    }
}

/// A held lock; released when dropped
pub struct LockGuard<'a, E: Executor> {
    mutex: &'a DistributedMutex<E>,
    name: String,
    released: bool,
}

impl<E: Executor> LockGuard<'_, E> {
    /// Name of the held lock
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Release now and report whether we still owned the lock
    pub fn release(mut self) -> Result<bool> {
        self.released = true;
        self.mutex.release(&self.name)
    }
}

impl<E: Executor> Drop for LockGuard<'_, E> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.mutex.release(&self.name) {
            tracing::warn!("Failed to release lock '{}' on drop: {}", self.name, e);
        }
    }
}
