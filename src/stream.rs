//! Body streams
//!
//! Message bodies are growable in-memory byte streams with a read/write
//! cursor. `BodyStream` is the shared handle held by messages: copies made by
//! the immutable `with_*` mutators all point at the same underlying stream,
//! matching the message model where replacing a header never duplicates the
//! body.

use std::sync::{Arc, Mutex, PoisonError};

use bytes::BytesMut;

/// Growable in-memory byte stream with a single read/write cursor
#[derive(Debug, Default)]
pub struct MemoryStream {
    buf: BytesMut,
    pos: usize,
}

impl MemoryStream {
    /// Create an empty stream
    pub fn new() -> Self {
        MemoryStream::default()
    }

    /// Create a stream holding the given bytes, cursor at the start
    pub fn from_slice(data: &[u8]) -> Self {
        MemoryStream {
            buf: BytesMut::from(data),
            pos: 0,
        }
    }

    /// Read up to `n` bytes from the cursor
    pub fn read(&mut self, n: usize) -> Vec<u8> {
        let end = (self.pos + n).min(self.buf.len());
        let out = self.buf[self.pos..end].to_vec();
        self.pos = end;
        out
    }

    /// Write bytes at the cursor, overwriting and growing as needed
    pub fn write(&mut self, data: &[u8]) {
        let overlap = (self.buf.len() - self.pos).min(data.len());
        self.buf[self.pos..self.pos + overlap].copy_from_slice(&data[..overlap]);
        self.buf.extend_from_slice(&data[overlap..]);
        self.pos += data.len();
    }

    /// Move the cursor back to the start
    pub fn rewind(&mut self) {
        self.pos = 0;
    }

    /// Check whether the cursor is at the end
    pub fn eof(&self) -> bool {
        self.pos >= self.buf.len()
    }

    /// Total number of bytes held, independent of the cursor
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// The full contents, independent of the cursor
    pub fn contents(&self) -> Vec<u8> {
        self.buf.to_vec()
    }
}

/// Shared handle to a [`MemoryStream`]
///
/// Cloning the handle shares the stream; cursor movement through one handle
/// is visible through every other.
#[derive(Debug, Clone, Default)]
pub struct BodyStream {
    inner: Arc<Mutex<MemoryStream>>,
}

impl BodyStream {
    /// Create an empty body
    pub fn empty() -> Self {
        BodyStream::default()
    }

    /// Create a body holding the given bytes
    pub fn from_slice(data: &[u8]) -> Self {
        BodyStream {
            inner: Arc::new(Mutex::new(MemoryStream::from_slice(data))),
        }
    }

    /// Create a body holding the given string
    pub fn from_string(data: &str) -> Self {
        BodyStream::from_slice(data.as_bytes())
    }

    /// Read up to `n` bytes from the cursor
    pub fn read(&self, n: usize) -> Vec<u8> {
        self.lock().read(n)
    }

    /// Write bytes at the cursor
    pub fn write(&self, data: &[u8]) {
        self.lock().write(data);
    }

    /// Move the cursor back to the start
    pub fn rewind(&self) {
        self.lock().rewind();
    }

    /// Check whether the cursor is at the end
    pub fn eof(&self) -> bool {
        self.lock().eof()
    }

    /// Total number of bytes held
    pub fn size(&self) -> usize {
        self.lock().size()
    }

    /// The full contents, independent of the cursor
    pub fn contents(&self) -> Vec<u8> {
        self.lock().contents()
    }

    /// Check whether this handle shares its stream with another
    pub fn shares_with(&self, other: &BodyStream) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryStream> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PartialEq for BodyStream {
    fn eq(&self, other: &Self) -> bool {
        self.shares_with(other) || self.contents() == other.contents()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_write_rewind() {
        let mut stream = MemoryStream::new();
        stream.write(b"Hello, World!");
        assert_eq!(stream.size(), 13);
        assert!(stream.eof());

        stream.rewind();
        assert!(!stream.eof());
        assert_eq!(stream.read(5), b"Hello");
        assert_eq!(stream.read(100), b", World!");
        assert!(stream.eof());
        assert_eq!(stream.read(1), b"");
    }

    #[test]
    fn test_write_overwrites_at_cursor() {
        let mut stream = MemoryStream::from_slice(b"abcdef");
        stream.read(2);
        stream.write(b"XYZW");
        assert_eq!(stream.contents(), b"abXYZW");
    }

    #[test]
    fn test_from_slice_starts_rewound() {
        let mut stream = MemoryStream::from_slice(b"data");
        assert_eq!(stream.read(4), b"data");
    }

    #[test]
    fn test_handle_shares_stream() {
        let body = BodyStream::empty();
        let copy = body.clone();

        body.write(b"shared");
        assert_eq!(copy.contents(), b"shared");
        assert!(copy.shares_with(&body));
    }

    #[test]
    fn test_chunked_reads() {
        let body = BodyStream::from_slice(b"0123456789");
        let mut out = Vec::new();
        loop {
            let chunk = body.read(3);
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(&chunk);
        }
        assert_eq!(out, b"0123456789");
    }
}
