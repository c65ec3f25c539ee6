//! Codec Tests
//!
//! Tests for command encoding and reply decoding.

use std::io::{BufReader, Cursor, Read};

use bytes::Bytes;
use lockwire::protocol::{
    encode_command, encode_reply, encode_tokens, read_reply, write_command, Command, Reply,
    Status, MAX_REPLY_DEPTH,
};
use lockwire::LockwireError;

// =============================================================================
// Helper Functions
// =============================================================================

fn parse(bytes: &[u8]) -> lockwire::Result<Reply> {
    read_reply(&mut Cursor::new(bytes.to_vec()))
}

/// A reader that hands out at most a few bytes per read call
struct ChunkedReader {
    data: Vec<u8>,
    pos: usize,
    chunk_sizes: Vec<usize>,
    calls: usize,
}

impl ChunkedReader {
    fn new(data: Vec<u8>, chunk_sizes: Vec<usize>) -> Self {
        Self {
            data,
            pos: 0,
            chunk_sizes,
            calls: 0,
        }
    }
}

impl Read for ChunkedReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let limit = self.chunk_sizes[self.calls % self.chunk_sizes.len()];
        self.calls += 1;
        let n = limit.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

// =============================================================================
// Command Encoding Tests
// =============================================================================

#[test]
fn test_encode_set_nx_px_exact_bytes() {
    let cmd = Command::new("SET")
        .arg("key")
        .arg("val")
        .arg("NX")
        .arg("PX")
        .arg(100u64);
    let encoded = encode_command(&cmd);

    assert_eq!(
        &encoded[..],
        &b"*6\r\n$3\r\nSET\r\n$3\r\nkey\r\n$3\r\nval\r\n$2\r\nNX\r\n$2\r\nPX\r\n$3\r\n100\r\n"[..]
    );
}

#[test]
fn test_encode_tokens_matches_command() {
    let tokens = ["SET", "key", "val", "NX", "PX", "100"];
    let cmd = Command::with_args("SET", ["key", "val", "NX", "PX", "100"]);

    assert_eq!(encode_tokens(&tokens), encode_command(&cmd));
}

#[test]
fn test_encode_multi_word_verb_is_split() {
    let cmd = Command::new("CLIENT SETNAME").arg("worker-1");
    let encoded = encode_command(&cmd);

    assert_eq!(
        &encoded[..],
        &b"*3\r\n$6\r\nCLIENT\r\n$7\r\nSETNAME\r\n$8\r\nworker-1\r\n"[..]
    );
    assert_eq!(cmd.name(), "CLIENT SETNAME");
    assert_eq!(cmd.args(), &[b"worker-1".to_vec()]);
}

#[test]
fn test_encode_measures_bytes_not_chars() {
    // "héllo" is 5 chars but 6 bytes in UTF-8
    let cmd = Command::new("GET").arg("héllo");
    let encoded = encode_command(&cmd);

    assert_eq!(
        &encoded[..],
        &b"*2\r\n$3\r\nGET\r\n$6\r\nh\xc3\xa9llo\r\n"[..]
    );
}

#[test]
fn test_encode_empty_and_binary_tokens() {
    let binary: Vec<u8> = vec![0x00, b'\r', b'\n', 0xFF];
    let cmd = Command::new("SET").arg("").arg(binary.clone());
    let encoded = encode_command(&cmd);

    let mut expected = b"*3\r\n$3\r\nSET\r\n$0\r\n\r\n$4\r\n".to_vec();
    expected.extend_from_slice(&binary);
    expected.extend_from_slice(b"\r\n");
    assert_eq!(&encoded[..], &expected[..]);
}

#[test]
fn test_numeric_args_are_decimal_text() {
    let cmd = Command::new("EXPIRE").arg("k").arg(-5i64).arg(42usize);
    assert_eq!(
        cmd.tokens(),
        &[
            b"EXPIRE".to_vec(),
            b"k".to_vec(),
            b"-5".to_vec(),
            b"42".to_vec()
        ]
    );
}

#[test]
fn test_write_command_to_stream() {
    let mut buffer = Vec::new();
    write_command(&mut buffer, &Command::new("PING")).unwrap();

    assert_eq!(buffer, b"*1\r\n$4\r\nPING\r\n");
}

// =============================================================================
// Reply Decoding Tests
// =============================================================================

#[test]
fn test_parse_status_ok() {
    assert_eq!(parse(b"+OK\r\n").unwrap(), Reply::Status(Status::Ok));
}

#[test]
fn test_parse_status_pong_is_ok() {
    assert!(parse(b"+PONG\r\n").unwrap().is_ok());
}

#[test]
fn test_parse_status_other_text_verbatim() {
    assert_eq!(
        parse(b"+QUEUED\r\n").unwrap(),
        Reply::Status(Status::Text("QUEUED".to_string()))
    );
}

#[test]
fn test_parse_error_is_remote() {
    match parse(b"-ERR bad\r\n") {
        Err(LockwireError::Remote(message)) => assert_eq!(message, "ERR bad"),
        other => panic!("Expected remote error, got {:?}", other),
    }
}

#[test]
fn test_parse_integer_kept_as_text() {
    assert_eq!(parse(b":42\r\n").unwrap(), Reply::Integer("42".to_string()));

    // Wider than i64; must not be narrowed
    assert_eq!(
        parse(b":123456789012345678901234567890\r\n").unwrap(),
        Reply::Integer("123456789012345678901234567890".to_string())
    );
}

#[test]
fn test_parse_null_bulk() {
    assert_eq!(parse(b"$-1\r\n").unwrap(), Reply::Bulk(None));
}

#[test]
fn test_parse_empty_bulk_is_not_null() {
    assert_eq!(parse(b"$0\r\n\r\n").unwrap(), Reply::Bulk(Some(Bytes::new())));
}

#[test]
fn test_parse_bulk() {
    assert_eq!(parse(b"$5\r\nhello\r\n").unwrap(), Reply::bulk("hello"));
}

#[test]
fn test_parse_bulk_with_embedded_crlf() {
    assert_eq!(
        parse(b"$6\r\na\r\nb\r\n\r\n").unwrap(),
        Reply::bulk(&b"a\r\nb\r\n"[..])
    );
}

#[test]
fn test_parse_empty_array() {
    assert_eq!(parse(b"*0\r\n").unwrap(), Reply::Array(Some(vec![])));
}

#[test]
fn test_parse_null_array() {
    assert_eq!(parse(b"*-1\r\n").unwrap(), Reply::Array(None));
}

#[test]
fn test_parse_integer_array() {
    assert_eq!(
        parse(b"*2\r\n:1\r\n:2\r\n").unwrap(),
        Reply::Array(Some(vec![
            Reply::Integer("1".to_string()),
            Reply::Integer("2".to_string()),
        ]))
    );
}

#[test]
fn test_parse_nested_mixed_array() {
    let bytes = b"*3\r\n$3\r\nfoo\r\n*2\r\n$-1\r\n+OK\r\n-ERR inner\r\n";
    assert_eq!(
        parse(bytes).unwrap(),
        Reply::Array(Some(vec![
            Reply::bulk("foo"),
            Reply::Array(Some(vec![Reply::Bulk(None), Reply::Status(Status::Ok)])),
            Reply::Error("ERR inner".to_string()),
        ]))
    );
}

#[test]
fn test_parse_leaves_following_reply_intact() {
    let mut cursor = Cursor::new(b"-ERR first\r\n:7\r\n".to_vec());

    assert!(read_reply(&mut cursor).unwrap_err().is_remote());
    assert_eq!(read_reply(&mut cursor).unwrap(), Reply::integer(7));
}

// =============================================================================
// Partial Read Tests
// =============================================================================

#[test]
fn test_bulk_reassembled_from_short_reads() {
    let payload: Vec<u8> = (0..200u8).collect();
    let mut wire = format!("${}\r\n", payload.len()).into_bytes();
    wire.extend_from_slice(&payload);
    wire.extend_from_slice(b"\r\n");

    let mut reader = BufReader::new(ChunkedReader::new(wire, vec![1, 3, 2]));
    let reply = read_reply(&mut reader).unwrap();

    assert_eq!(reply.as_bulk(), Some(&payload[..]));
}

#[test]
fn test_array_reassembled_from_short_reads() {
    let wire = b"*3\r\n$5\r\nhello\r\n:10\r\n$-1\r\n".to_vec();

    // Tiny buffer so the BufReader can't paper over the short reads
    let mut reader = BufReader::with_capacity(2, ChunkedReader::new(wire, vec![1, 2, 3]));
    let reply = read_reply(&mut reader).unwrap();

    assert_eq!(
        reply,
        Reply::Array(Some(vec![
            Reply::bulk("hello"),
            Reply::integer(10),
            Reply::Bulk(None),
        ]))
    );
}

// =============================================================================
// Round Trip Tests
// =============================================================================

#[test]
fn test_command_frame_parses_as_bulk_array() {
    let tokens: Vec<Vec<u8>> = vec![
        b"SET".to_vec(),
        Vec::new(),
        vec![0x00, 0x01, 0x00],
        b"\r\n".to_vec(),
        "ünïcode".as_bytes().to_vec(),
    ];
    let reply = parse(&encode_tokens(&tokens)).unwrap();

    let expected = tokens
        .iter()
        .map(|t| Reply::bulk(t.clone()))
        .collect::<Vec<_>>();
    assert_eq!(reply, Reply::Array(Some(expected)));
}

#[test]
fn test_encode_reply_wire_format() {
    let reply = Reply::Array(Some(vec![
        Reply::Status(Status::Ok),
        Reply::integer(-3),
        Reply::Bulk(None),
        Reply::Array(None),
        Reply::bulk("x"),
    ]));

    assert_eq!(
        &encode_reply(&reply)[..],
        &b"*5\r\n+OK\r\n:-3\r\n$-1\r\n*-1\r\n$1\r\nx\r\n"[..]
    );
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_unknown_type_tag() {
    let err = parse(b"?what\r\n").unwrap_err();
    assert!(matches!(err, LockwireError::Protocol(_)));
    assert!(err.to_string().contains("unexpected reply type tag"));
}

#[test]
fn test_truncated_bulk_is_protocol_error() {
    let err = parse(b"$10\r\nshort\r\n").unwrap_err();
    assert!(matches!(err, LockwireError::Protocol(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_bulk_without_terminator() {
    let err = parse(b"$3\r\nabcXY").unwrap_err();
    assert!(matches!(err, LockwireError::Protocol(_)));
}

#[test]
fn test_invalid_length_header() {
    assert!(matches!(parse(b"$abc\r\n"), Err(LockwireError::Protocol(_))));
    assert!(matches!(parse(b"*-2\r\n"), Err(LockwireError::Protocol(_))));
}

#[test]
fn test_line_without_crlf() {
    assert!(matches!(parse(b"+OK\n"), Err(LockwireError::Protocol(_))));
    assert!(matches!(parse(b"+OK"), Err(LockwireError::Protocol(_))));
}

#[test]
fn test_empty_stream_is_io_error() {
    match parse(b"") {
        Err(LockwireError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("Expected EOF error, got {:?}", other),
    }
}

#[test]
fn test_nesting_depth_guard() {
    let mut wire = b"*1\r\n".repeat(MAX_REPLY_DEPTH + 2);
    wire.extend_from_slice(b":1\r\n");

    let err = parse(&wire).unwrap_err();
    assert!(err.to_string().contains("nesting"));
}

#[test]
fn test_nesting_within_limit() {
    let mut wire = b"*1\r\n".repeat(MAX_REPLY_DEPTH);
    wire.extend_from_slice(b":1\r\n");

    assert!(parse(&wire).is_ok());
}
