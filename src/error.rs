//! Crate-wide error taxonomy
//!
//! Every failure surfaced by this crate is one of the variants below. Value
//! object mutators validate before any observable state change, so a returned
//! error never leaves a half-mutated instance behind.

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by URI/message construction and the client pipeline
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed URI, out-of-range port or status code, invalid method,
    /// disallowed path characters, or CR/LF in a header name or value
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The client could not resolve a target host from the request or its
    /// configured base URI
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Socket-level failure: DNS, refused, timeout, TLS handshake, or the
    /// peer closing mid-transfer; carries the low-level error text
    #[error("connection error: {0}")]
    Connection(String),

    /// The response bytes violate HTTP framing: no `HTTP/` prefix, malformed
    /// chunk size, missing chunk terminator, oversized header line
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A `Transfer-Encoding` value other than `chunked`
    #[error("unsupported transfer encoding: {0}")]
    UnsupportedEncoding(String),

    /// Raw I/O failure surfaced from the transport
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
