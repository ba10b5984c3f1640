//! Chunked transfer decoding
//!
//! The decoder is an explicit state machine driven by the connection's line
//! and exact reads. Malformed hex or a missing chunk terminator is a
//! terminal protocol error; a clean EOF at a size boundary ends the body
//! like a terminal chunk does.

use crate::error::{Error, Result};
use crate::net::Connection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    ReadingSize,
    ReadingChunk(usize),
    ReadingTerminator { last: bool },
    Done,
}

/// Read a chunked body off the connection
///
/// Chunk data is read in the connection's configured sub-read size. The
/// blank line after the terminal `0` chunk is consumed when the peer sends
/// one.
pub fn read_body(conn: &mut Connection, max_line: usize) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut state = DecoderState::ReadingSize;

    loop {
        state = match state {
            DecoderState::ReadingSize => match conn.read_line(max_line)? {
                None => DecoderState::Done,
                Some(line) => {
                    let size = parse_chunk_size(&line)?;
                    if size == 0 {
                        DecoderState::ReadingTerminator { last: true }
                    } else {
                        DecoderState::ReadingChunk(size)
                    }
                }
            },

            DecoderState::ReadingChunk(size) => {
                body.extend_from_slice(&conn.read_exact(size)?);
                DecoderState::ReadingTerminator { last: false }
            }

            DecoderState::ReadingTerminator { last } => match conn.read_line(max_line)? {
                Some(line) if line.is_empty() => {
                    if last {
                        DecoderState::Done
                    } else {
                        DecoderState::ReadingSize
                    }
                }
                // The peer may close right after the terminal chunk.
                None if last => DecoderState::Done,
                Some(line) => {
                    return Err(Error::Protocol(format!(
                        "expected CRLF after chunk, got {line:?}"
                    )))
                }
                None => {
                    return Err(Error::Protocol(
                        "connection closed before the chunk terminator".to_string(),
                    ))
                }
            },

            DecoderState::Done => return Ok(body),
        };
    }
}

fn parse_chunk_size(line: &str) -> Result<usize> {
    // Chunk extensions after a semicolon are ignored.
    let size = line.split(';').next().unwrap_or("").trim();
    usize::from_str_radix(size, 16)
        .map_err(|_| Error::Protocol(format!("invalid chunk size: {size:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::testing::ScriptedTransport;
    use std::time::Duration;

    fn conn(input: &[u8]) -> Connection {
        Connection::new(
            Box::new(ScriptedTransport::new(input)),
            Duration::from_secs(1),
            8,
        )
    }

    #[test]
    fn test_decode_two_chunks() {
        let mut conn = conn(b"4\r\nWiki\r\n5\r\npedia\r\n0\r\n\r\n");
        assert_eq!(read_body(&mut conn, 8192).unwrap(), b"Wikipedia");
    }

    #[test]
    fn test_decode_single_chunk() {
        let mut conn = conn(b"5\r\nHello\r\n0\r\n\r\n");
        assert_eq!(read_body(&mut conn, 8192).unwrap(), b"Hello");
    }

    #[test]
    fn test_chunk_extension_ignored() {
        let mut conn = conn(b"5;ext=value\r\nHello\r\n0\r\n\r\n");
        assert_eq!(read_body(&mut conn, 8192).unwrap(), b"Hello");
    }

    #[test]
    fn test_chunk_larger_than_sub_read() {
        // 26 bytes against an 8-byte sub-read size.
        let mut conn = conn(b"1a\r\nabcdefghijklmnopqrstuvwxyz\r\n0\r\n\r\n");
        assert_eq!(
            read_body(&mut conn, 8192).unwrap(),
            b"abcdefghijklmnopqrstuvwxyz"
        );
    }

    #[test]
    fn test_invalid_hex_size() {
        let mut conn = conn(b"xyz\r\ndata\r\n0\r\n\r\n");
        assert!(matches!(
            read_body(&mut conn, 8192),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_missing_terminator() {
        let mut conn = conn(b"4\r\nWikiXX\r\n0\r\n\r\n");
        assert!(matches!(
            read_body(&mut conn, 8192),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_eof_at_size_boundary_ends_body() {
        let mut conn = conn(b"4\r\nWiki\r\n");
        assert_eq!(read_body(&mut conn, 8192).unwrap(), b"Wiki");
    }

    #[test]
    fn test_eof_right_after_terminal_chunk() {
        let mut conn = conn(b"4\r\nWiki\r\n0\r\n");
        assert_eq!(read_body(&mut conn, 8192).unwrap(), b"Wiki");
    }

    #[test]
    fn test_truncated_chunk_data() {
        let mut conn = conn(b"a\r\nWiki");
        assert!(read_body(&mut conn, 8192).is_err());
    }
}
