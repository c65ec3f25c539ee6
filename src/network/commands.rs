//! Typed command wrappers
//!
//! A closed set of helpers over `Connection::execute` for the commands the
//! mutex and its collaborators use.

use std::time::Duration;

use bytes::Bytes;

use crate::error::{LockwireError, Result};
use crate::protocol::{Command, Reply, ToArg};

use super::Connection;

impl Connection {
    /// PING; true when the server answers PONG
    pub fn ping(&mut self) -> Result<bool> {
        Ok(self.execute_command(&Command::new("PING"))?.is_ok())
    }

    /// GET; `None` when the key does not exist
    pub fn get<K: ToArg>(&mut self, key: K) -> Result<Option<Bytes>> {
        self.execute_command(&Command::new("GET").arg(key))?
            .into_bulk()
    }

    /// SET with an optional time-to-live
    pub fn set<K: ToArg, V: ToArg>(&mut self, key: K, value: V, ttl: Option<Duration>) -> Result<()> {
        let mut command = Command::new("SET").arg(key).arg(value);
        if let Some(ttl) = ttl {
            command = command.arg("PX").arg(ttl_millis(ttl));
        }
        expect_ok(self.execute_command(&command)?)
    }

    /// SET key value NX PX ms; true when the key was written
    pub fn set_nx_px<K: ToArg, V: ToArg>(&mut self, key: K, value: V, ttl: Duration) -> Result<bool> {
        let command = Command::new("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl));
        set_outcome(self.execute_command(&command)?)
    }

    /// DEL; number of keys removed
    pub fn del<I, K>(&mut self, keys: I) -> Result<i64>
    where
        I: IntoIterator<Item = K>,
        K: ToArg,
    {
        self.execute_command(&Command::with_args("DEL", keys))?
            .as_integer()
    }

    /// EXISTS for a single key
    pub fn exists<K: ToArg>(&mut self, key: K) -> Result<bool> {
        let count = self
            .execute_command(&Command::new("EXISTS").arg(key))?
            .as_integer()?;
        Ok(count > 0)
    }

    /// PEXPIRE; true when the timeout was set
    pub fn pexpire<K: ToArg>(&mut self, key: K, ttl: Duration) -> Result<bool> {
        let updated = self
            .execute_command(&Command::new("PEXPIRE").arg(key).arg(ttl_millis(ttl)))?
            .as_integer()?;
        Ok(updated == 1)
    }

    /// FLUSHDB
    pub fn flushdb(&mut self) -> Result<()> {
        expect_ok(self.execute_command(&Command::new("FLUSHDB"))?)
    }

    /// EVAL a server-side script
    pub fn eval<K, A>(&mut self, script: &str, keys: &[K], args: &[A]) -> Result<Reply>
    where
        K: ToArg,
        A: ToArg,
    {
        self.execute_command(&eval_command(script, keys, args))
    }
}

/// Build an EVAL command
pub(crate) fn eval_command<K: ToArg, A: ToArg>(script: &str, keys: &[K], args: &[A]) -> Command {
    let mut command = Command::new("EVAL").arg(script).arg(keys.len());
    command.extend(keys);
    command.extend(args);
    command
}

/// Interpret the reply of a conditional SET
/// A time-to-live in whole milliseconds, rounded up and never below 1
///
/// `PX 0` is rejected by the server, so sub-millisecond values still expire
/// as soon as the server can express.
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    let millis = ttl.as_nanos().div_ceil(1_000_000);
    u64::try_from(millis).unwrap_or(u64::MAX).max(1)
}

pub(crate) fn set_outcome(reply: Reply) -> Result<bool> {
    match reply {
        Reply::Status(_) => Ok(reply.is_ok()),
        Reply::Bulk(None) => Ok(false),
        other => Err(LockwireError::Protocol(format!(
            "unexpected {} reply to SET",
            other.kind()
        ))),
    }
}

fn expect_ok(reply: Reply) -> Result<()> {
    if reply.is_ok() {
        Ok(())
    } else {
        Err(LockwireError::Protocol(format!(
            "expected OK, got {} reply: {}",
            reply.kind(),
            reply
        )))
    }
}
