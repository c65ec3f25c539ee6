//! Protocol Module
//!
//! Defines the RESP wire protocol spoken with the store.
//!
//! ## Request Format
//! Every command is an array of bulk strings:
//! ```text
//! *3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$3\r\nval\r\n
//! ```
//!
//! ## Reply Types
//! - `+` Status  - `OK`/`PONG` normalize to [`Status::Ok`]
//! - `-` Error   - surfaced as `LockwireError::Remote`
//! - `:` Integer - kept as decimal text
//! - `$` Bulk    - binary payload, `$-1` is null
//! - `*` Array   - nested replies, `*-1` is null

mod command;
mod reply;
mod codec;

pub use command::{Command, ToArg};
pub use reply::{Reply, Status};
pub use codec::{
    encode_command, encode_reply, encode_tokens, read_reply, write_command, CRLF, MAX_BULK_LEN,
    MAX_REPLY_DEPTH,
};
