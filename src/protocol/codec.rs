//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! *<N>\r\n
//! $<len>\r\n<token bytes>\r\n      (repeated N times)
//! ```
//!
//! ### Reply Format
//! ```text
//! +<line>\r\n                      status
//! -<line>\r\n                      error
//! :<line>\r\n                      integer
//! $<len>\r\n<bytes>\r\n            bulk ($-1\r\n for null)
//! *<count>\r\n<count replies>      array (*-1\r\n for null)
//! ```

use std::io::{BufRead, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use super::{Command, Reply, Status};
use crate::error::{LockwireError, Result};

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Deepest array nesting accepted from the server
pub const MAX_REPLY_DEPTH: usize = 128;

/// Largest bulk payload accepted from the server (512 MB)
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Longest header line accepted (status/error text included)
const MAX_LINE_LEN: usize = 64 * 1024;

// =============================================================================
// Command Encoding
// =============================================================================

/// Encode a command as an array of bulk strings
pub fn encode_command(command: &Command) -> BytesMut {
    encode_tokens(command.tokens())
}

/// Encode raw tokens as an array of bulk strings
///
/// Lengths are raw byte counts, so any byte sequence is accepted.
pub fn encode_tokens<T: AsRef<[u8]>>(tokens: &[T]) -> BytesMut {
    let payload: usize = tokens.iter().map(|t| t.as_ref().len() + 16).sum();
    let mut buf = BytesMut::with_capacity(16 + payload);

    put_header(&mut buf, b'*', tokens.len() as i64);
    for token in tokens {
        let token = token.as_ref();
        put_header(&mut buf, b'$', token.len() as i64);
        buf.put_slice(token);
        buf.put_slice(CRLF);
    }

    buf
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Reply Encoding
// =============================================================================

/// Encode a reply in wire format
pub fn encode_reply(reply: &Reply) -> BytesMut {
    let mut buf = BytesMut::new();
    put_reply(&mut buf, reply);
    buf
}

fn put_reply(buf: &mut BytesMut, reply: &Reply) {
    match reply {
        Reply::Status(Status::Ok) => put_line(buf, b'+', b"OK"),
        Reply::Status(Status::Text(text)) => put_line(buf, b'+', text.as_bytes()),
        Reply::Error(message) => put_line(buf, b'-', message.as_bytes()),
        Reply::Integer(value) => put_line(buf, b':', value.as_bytes()),
        Reply::Bulk(None) => put_header(buf, b'$', -1),
        Reply::Bulk(Some(payload)) => {
            put_header(buf, b'$', payload.len() as i64);
            buf.put_slice(payload);
            buf.put_slice(CRLF);
        }
        Reply::Array(None) => put_header(buf, b'*', -1),
        Reply::Array(Some(items)) => {
            put_header(buf, b'*', items.len() as i64);
            for item in items {
                put_reply(buf, item);
            }
        }
    }
}

fn put_header(buf: &mut BytesMut, tag: u8, len: i64) {
    put_line(buf, tag, len.to_string().as_bytes());
}

fn put_line(buf: &mut BytesMut, tag: u8, body: &[u8]) {
    buf.put_u8(tag);
    buf.put_slice(body);
    buf.put_slice(CRLF);
}

// =============================================================================
// Reply Decoding
// =============================================================================

/// Read exactly one reply from a stream
///
/// Blocks until a complete reply (recursively, for arrays) is received.
/// A top-level `-` reply is returned as `LockwireError::Remote`; errors nested
/// inside arrays stay in the tree as `Reply::Error`.
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    match read_value(reader, 0)? {
        Reply::Error(message) => Err(LockwireError::Remote(message)),
        reply => Ok(reply),
    }
}

fn read_value<R: BufRead>(reader: &mut R, depth: usize) -> Result<Reply> {
    if depth > MAX_REPLY_DEPTH {
        return Err(LockwireError::Protocol(format!(
            "reply nesting exceeds {} levels",
            MAX_REPLY_DEPTH
        )));
    }

    let line = read_line(reader)?;
    let (tag, body) = match line.split_first() {
        Some((tag, body)) => (*tag, body),
        None => return Err(LockwireError::Protocol("empty reply line".to_string())),
    };

    match tag {
        b'+' => Ok(Reply::Status(Status::from_line(&line_text(body)?))),
        b'-' => Ok(Reply::Error(line_text(body)?)),
        b':' => Ok(Reply::Integer(line_text(body)?)),
        b'$' => {
            let Some(len) = parse_length(body)? else {
                return Ok(Reply::Bulk(None));
            };
            if len > MAX_BULK_LEN {
                return Err(LockwireError::Protocol(format!(
                    "bulk reply too large: {} bytes (max {})",
                    len, MAX_BULK_LEN
                )));
            }
            read_bulk_payload(reader, len).map(|payload| Reply::Bulk(Some(payload)))
        }
        b'*' => {
            let Some(count) = parse_length(body)? else {
                return Ok(Reply::Array(None));
            };
            // Don't trust the declared count for the allocation
            let mut items = Vec::with_capacity(count.min(1024));
            for _ in 0..count {
                items.push(read_value(reader, depth + 1)?);
            }
            Ok(Reply::Array(Some(items)))
        }
        other => Err(LockwireError::Protocol(format!(
            "unexpected reply type tag: 0x{:02x}",
            other
        ))),
    }
}

/// Read one `\r\n`-terminated line, returned without the terminator
fn read_line<R: BufRead>(reader: &mut R) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_LEN as u64)
        .read_until(b'\n', &mut line)?;

    if read == 0 {
        return Err(LockwireError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "connection closed by peer",
        )));
    }
    if !line.ends_with(CRLF) {
        return Err(LockwireError::Protocol(if line.len() >= MAX_LINE_LEN {
            format!("reply line exceeds {} bytes", MAX_LINE_LEN)
        } else {
            "reply line is not terminated by CRLF".to_string()
        }));
    }

    line.truncate(line.len() - CRLF.len());
    Ok(line)
}

/// Read a bulk payload of exactly `len` bytes plus its terminator
fn read_bulk_payload<R: BufRead>(reader: &mut R, len: usize) -> Result<Bytes> {
    let mut payload = vec![0u8; len + CRLF.len()];

    // read_exact loops over short reads
    reader.read_exact(&mut payload).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            LockwireError::Protocol(format!(
                "bulk reply truncated: expected {} bytes",
                len
            ))
        } else {
            LockwireError::Io(e)
        }
    })?;

    if &payload[len..] != CRLF {
        return Err(LockwireError::Protocol(
            "bulk reply is not terminated by CRLF".to_string(),
        ));
    }

    payload.truncate(len);
    Ok(Bytes::from(payload))
}

/// Parse a length header; `-1` is the null sentinel
fn parse_length(body: &[u8]) -> Result<Option<usize>> {
    if body == b"-1" {
        return Ok(None);
    }
    std::str::from_utf8(body)
        .ok()
        .and_then(|text| text.parse::<usize>().ok())
        .map(Some)
        .ok_or_else(|| {
            LockwireError::Protocol(format!(
                "invalid length header: {:?}",
                String::from_utf8_lossy(body)
            ))
        })
}

fn line_text(body: &[u8]) -> Result<String> {
    String::from_utf8(body.to_vec())
        .map_err(|_| LockwireError::Protocol("reply line is not valid UTF-8".to_string()))
}
