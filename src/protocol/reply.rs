//! Reply definitions
//!
//! Represents one parsed server reply.

use std::fmt;

use bytes::Bytes;

use crate::error::{LockwireError, Result};

/// Payload of a `+` reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// `OK` or `PONG`
    Ok,

    /// Any other single-line text, verbatim
    Text(String),
}

impl Status {
    /// Normalize a status line
    pub fn from_line(line: &str) -> Self {
        match line {
            "OK" | "PONG" => Status::Ok,
            other => Status::Text(other.to_string()),
        }
    }
}

/// A reply from the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+` simple status
    Status(Status),

    /// `-` server error
    ///
    /// Only appears nested inside an array; a top-level error is returned
    /// as `LockwireError::Remote` instead.
    Error(String),

    /// `:` integer, as decimal text
    Integer(String),

    /// `$` bulk string; `None` for the null bulk
    Bulk(Option<Bytes>),

    /// `*` array; `None` for the null array
    Array(Option<Vec<Reply>>),
}

impl Reply {
    /// Shorthand for a bulk reply
    pub fn bulk(payload: impl Into<Bytes>) -> Self {
        Reply::Bulk(Some(payload.into()))
    }

    /// Shorthand for an integer reply
    pub fn integer(value: i64) -> Self {
        Reply::Integer(value.to_string())
    }

    /// Whether this is an `OK`/`PONG` status
    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Status(Status::Ok))
    }

    /// Whether this is the null bulk or the null array
    pub fn is_nil(&self) -> bool {
        matches!(self, Reply::Bulk(None) | Reply::Array(None))
    }

    /// Borrow the payload of a bulk reply
    pub fn as_bulk(&self) -> Option<&[u8]> {
        match self {
            Reply::Bulk(Some(bytes)) => Some(bytes),
            _ => None,
        }
    }

    /// Take the payload of a bulk reply
    ///
    /// Null bulk maps to `Ok(None)`; any other reply kind is a protocol error.
    pub fn into_bulk(self) -> Result<Option<Bytes>> {
        match self {
            Reply::Bulk(payload) => Ok(payload),
            other => Err(LockwireError::Protocol(format!(
                "expected bulk reply, got {}",
                other.kind()
            ))),
        }
    }

    /// Parse an integer reply into an i64
    pub fn as_integer(&self) -> Result<i64> {
        match self {
            Reply::Integer(text) => text.parse().map_err(|_| {
                LockwireError::Protocol(format!("integer reply out of range: {}", text))
            }),
            other => Err(LockwireError::Protocol(format!(
                "expected integer reply, got {}",
                other.kind()
            ))),
        }
    }

    /// Name of the reply kind, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Reply::Status(_) => "status",
            Reply::Error(_) => "error",
            Reply::Integer(_) => "integer",
            Reply::Bulk(_) => "bulk",
            Reply::Array(_) => "array",
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        match self {
            Reply::Status(Status::Ok) => write!(f, "OK"),
            Reply::Status(Status::Text(text)) => write!(f, "{}", text),
            Reply::Error(message) => write!(f, "(error) {}", message),
            Reply::Integer(value) => write!(f, "(integer) {}", value),
            Reply::Bulk(None) | Reply::Array(None) => write!(f, "(nil)"),
            Reply::Bulk(Some(bytes)) => write!(f, "\"{}\"", bytes.escape_ascii()),
            Reply::Array(Some(items)) if items.is_empty() => write!(f, "(empty array)"),
            Reply::Array(Some(items)) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                        write!(f, "{:indent$}", "", indent = indent)?;
                    }
                    let label = format!("{}) ", i + 1);
                    write!(f, "{}", label)?;
                    item.fmt_indented(f, indent + label.len())?;
                }
                Ok(())
            }
        }
    }
}

/// redis-cli style rendering
impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}
