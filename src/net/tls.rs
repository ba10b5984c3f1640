//! TLS transport
//!
//! HTTPS requests wrap the TCP stream with OpenSSL. Certificate validation
//! and the handshake itself are delegated to the `openssl` crate's blocking
//! `SslConnector::connect`, which also sends the host as SNI.

use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::os::fd::AsRawFd;
use std::time::Duration;

use openssl::ssl::{SslConnector, SslMethod, SslStream};

use crate::error::{Error, Result};
use crate::net::{poll_fd, PollEvents, TcpTransport, Transport};

/// TLS-wrapped TCP transport
pub struct TlsTransport {
    stream: SslStream<TcpStream>,
}

impl TlsTransport {
    /// Connect to `host:port` and perform the TLS handshake
    pub fn connect(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        let tcp = TcpTransport::connect(host, port, timeout)?.into_stream();

        let connector = SslConnector::builder(SslMethod::tls_client())
            .map_err(|e| Error::Connection(format!("failed to set up TLS context: {e}")))?
            .build();

        let stream = connector
            .connect(host, tcp)
            .map_err(|e| Error::Connection(format!("TLS handshake with {host} failed: {e}")))?;

        Ok(TlsTransport { stream })
    }
}

impl Transport for TlsTransport {
    fn poll(&self, events: PollEvents, timeout: Option<Duration>) -> io::Result<bool> {
        // Bytes already decrypted inside the SSL buffer won't show up on the fd.
        if events == PollEvents::Read && self.stream.ssl().pending() > 0 {
            return Ok(true);
        }
        poll_fd(self.stream.get_ref().as_raw_fd(), events, timeout)
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream.read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn close(&mut self) -> io::Result<()> {
        let _ = self.stream.shutdown();
        self.stream.get_ref().shutdown(Shutdown::Both)
    }
}
