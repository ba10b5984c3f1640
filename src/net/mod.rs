//! Blocking transport layer
//!
//! The transport abstraction keeps the HTTP pipeline transparent to the
//! underlying socket type: `Transport` defines the operations (poll, read,
//! write, close), `TcpTransport` implements them over a plain socket and
//! `TlsTransport` over an OpenSSL-wrapped one. `Connection` adds the
//! configured deadline and the buffered line/exact reads the response parser
//! needs.

pub mod tls;

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::os::fd::RawFd;
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{Error, Result};

/// Readiness to wait for before an I/O call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollEvents {
    Read,
    Write,
}

/// Byte-oriented connection operations
///
/// Implemented by plain TCP and TLS transports so the client never needs to
/// know which one it is talking through.
pub trait Transport {
    /// Wait until the transport is ready for the requested operation;
    /// returns false on timeout
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> io::Result<bool>;

    /// Read available bytes
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Write bytes
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Shut the connection down
    fn close(&mut self) -> io::Result<()>;
}

pub(crate) fn poll_fd(fd: RawFd, events: PollEvents, timeout: Option<Duration>) -> io::Result<bool> {
    use libc::{poll, pollfd, POLLIN, POLLOUT};

    let mut pfd = pollfd {
        fd,
        events: match events {
            PollEvents::Read => POLLIN,
            PollEvents::Write => POLLOUT,
        },
        revents: 0,
    };

    let timeout_ms = timeout.map(|d| d.as_millis() as i32).unwrap_or(-1);

    let result = unsafe { poll(&mut pfd as *mut pollfd, 1, timeout_ms) };

    if result < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(result > 0)
}

/// Plain TCP transport
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Open a blocking connection to `host:port` within `timeout`
    ///
    /// Every resolved address is tried in turn; the last OS error is carried
    /// in the returned `Connection` error.
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let addrs: Vec<SocketAddr> = (host, port)
            .to_socket_addrs()
            .map_err(|e| Error::Connection(format!("failed to resolve [{host}:{port}]: {e}")))?
            .collect();

        let mut last_err: Option<io::Error> = None;
        for addr in addrs {
            let socket = match Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP)) {
                Ok(socket) => socket,
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            };
            match socket.connect_timeout(&addr.into(), timeout) {
                Ok(()) => {
                    let _ = socket.set_nodelay(true);
                    return Ok(TcpTransport {
                        stream: socket.into(),
                    });
                }
                Err(e) => last_err = Some(e),
            }
        }

        let detail = last_err
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no addresses resolved".to_string());
        Err(Error::Connection(format!(
            "failed to connect to [{host}:{port}]: {detail}"
        )))
    }

    /// Take the underlying stream, e.g. for a TLS wrap
    pub fn into_stream(self) -> TcpStream {
        self.stream
    }
}

impl Transport for TcpTransport {
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> io::Result<bool> {
        use std::os::fd::AsRawFd;
        poll_fd(self.stream.as_raw_fd(), events, timeout)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        self.stream.shutdown(Shutdown::Both)
    }
}

/// A transport with a deadline and a read buffer
///
/// All reads and writes poll first with the configured timeout, so a stalled
/// peer fails the transfer instead of blocking forever. Socket reads happen
/// in `chunk_size` slices; bytes read past what the caller consumed stay
/// buffered for the next call.
pub struct Connection {
    transport: Box<dyn Transport>,
    timeout: Duration,
    chunk_size: usize,
    buf: Vec<u8>,
}

impl Connection {
    /// Wrap a transport with a deadline and read chunk size
    pub fn new(transport: Box<dyn Transport>, timeout: Duration, chunk_size: usize) -> Self {
        Connection {
            transport,
            timeout,
            chunk_size: chunk_size.max(1),
            buf: Vec::new(),
        }
    }

    /// Write the whole buffer
    pub fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let mut written = 0;
        while written < data.len() {
            if !self.transport.poll(PollEvents::Write, Some(self.timeout))? {
                return Err(Error::Connection(format!(
                    "write timed out after {:?}",
                    self.timeout
                )));
            }
            let n = self.transport.write(&data[written..])?;
            if n == 0 {
                return Err(Error::Connection("connection closed during write".to_string()));
            }
            written += n;
        }
        Ok(())
    }

    /// Read one line, stripping the CRLF
    ///
    /// Returns `Ok(None)` on a clean EOF with nothing buffered; a line
    /// longer than `max_len` is a protocol error.
    pub fn read_line(&mut self, max_len: usize) -> Result<Option<String>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return Ok(Some(String::from_utf8_lossy(&line).to_string()));
            }
            if self.buf.len() > max_len {
                return Err(Error::Protocol(format!("line exceeds {max_len} bytes")));
            }
            if self.fill()? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let line = String::from_utf8_lossy(&self.buf).to_string();
                self.buf.clear();
                return Ok(Some(line));
            }
        }
    }

    /// Read exactly `n` bytes; a premature EOF is a connection error
    pub fn read_exact(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        let take = n.min(self.buf.len());
        out.extend(self.buf.drain(..take));

        while out.len() < n {
            if self.fill()? == 0 {
                return Err(Error::Connection(format!(
                    "connection closed after {} of {} body bytes",
                    out.len(),
                    n
                )));
            }
            let take = (n - out.len()).min(self.buf.len());
            out.extend(self.buf.drain(..take));
        }

        Ok(out)
    }

    /// Shut the transport down
    pub fn close(&mut self) -> Result<()> {
        self.transport.close().map_err(Error::from)
    }

    fn fill(&mut self) -> Result<usize> {
        if !self.transport.poll(PollEvents::Read, Some(self.timeout))? {
            return Err(Error::Connection(format!(
                "read timed out after {:?}",
                self.timeout
            )));
        }
        let mut temp = vec![0u8; self.chunk_size];
        let n = self.transport.read(&mut temp)?;
        self.buf.extend_from_slice(&temp[..n]);
        Ok(n)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::{PollEvents, Transport};
    use std::io;
    use std::time::Duration;

    /// In-memory transport fed from a fixed byte script; writes are dropped
    pub(crate) struct ScriptedTransport {
        input: Vec<u8>,
        pos: usize,
    }

    impl ScriptedTransport {
        pub fn new(input: &[u8]) -> Self {
            ScriptedTransport {
                input: input.to_vec(),
                pos: 0,
            }
        }
    }

    impl Transport for ScriptedTransport {
        fn poll(&self, _events: PollEvents, _timeout: Option<Duration>) -> io::Result<bool> {
            Ok(true)
        }

        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = buf.len().min(self.input.len() - self.pos);
            buf[..n].copy_from_slice(&self.input[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            Ok(buf.len())
        }

        fn close(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    fn scripted(input: &[u8]) -> Connection {
        Connection::new(
            Box::new(ScriptedTransport::new(input)),
            Duration::from_secs(1),
            8,
        )
    }

    #[test]
    fn test_read_line_strips_crlf() {
        let mut conn = scripted(b"HTTP/1.1 200 OK\r\nSecond\r\n");
        assert_eq!(conn.read_line(8192).unwrap().unwrap(), "HTTP/1.1 200 OK");
        assert_eq!(conn.read_line(8192).unwrap().unwrap(), "Second");
        assert_eq!(conn.read_line(8192).unwrap(), None);
    }

    #[test]
    fn test_read_line_returns_tail_before_eof() {
        let mut conn = scripted(b"no newline");
        assert_eq!(conn.read_line(8192).unwrap().unwrap(), "no newline");
        assert_eq!(conn.read_line(8192).unwrap(), None);
    }

    #[test]
    fn test_read_line_enforces_max_len() {
        let mut conn = scripted(&[b'a'; 64]);
        assert!(matches!(conn.read_line(16), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_read_exact_spans_buffered_and_fresh_bytes() {
        let mut conn = scripted(b"line\r\nBODYBYTES");
        conn.read_line(8192).unwrap();
        assert_eq!(conn.read_exact(9).unwrap(), b"BODYBYTES");
    }

    #[test]
    fn test_read_exact_premature_eof() {
        let mut conn = scripted(b"abc");
        assert!(matches!(conn.read_exact(10), Err(Error::Connection(_))));
    }

    #[test]
    fn test_tcp_connect_and_roundtrip() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 5];
            stream.read_exact(&mut buf).unwrap();
            stream.write_all(&buf).unwrap();
        });

        let transport =
            TcpTransport::connect("127.0.0.1", addr.port(), Duration::from_secs(1)).unwrap();
        let mut conn = Connection::new(Box::new(transport), Duration::from_secs(1), 1024);

        conn.write_all(b"hello").unwrap();
        assert_eq!(conn.read_exact(5).unwrap(), b"hello");

        handle.join().unwrap();
    }

    #[test]
    fn test_read_times_out_on_silent_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (_stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(500));
        });

        let transport =
            TcpTransport::connect("127.0.0.1", addr.port(), Duration::from_secs(1)).unwrap();
        let mut conn = Connection::new(Box::new(transport), Duration::from_millis(50), 1024);

        assert!(matches!(conn.read_exact(1), Err(Error::Connection(_))));

        handle.join().unwrap();
    }

    #[test]
    fn test_connect_refused() {
        // Bind then drop to get a port that refuses connections.
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = TcpTransport::connect("127.0.0.1", addr.port(), Duration::from_millis(200));
        assert!(matches!(result, Err(Error::Connection(_))));
    }
}
