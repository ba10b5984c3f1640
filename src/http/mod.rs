//! HTTP message model and client
//!
//! Immutable request/response value objects plus a blocking client that
//! performs one request/response round trip per connection.
//!
//! # Examples
//!
//! ```no_run
//! use wirehttp::http::{HttpClient, Method, Request};
//! use wirehttp::uri::Uri;
//!
//! let uri = Uri::parse("http://example.com/items?page=2").unwrap();
//! let request = Request::new(Method::Get, uri);
//!
//! let client = HttpClient::new();
//! let response = client.send(&request).unwrap();
//! assert_eq!(response.status_code(), 200);
//! ```

pub mod chunked;
pub mod client;
pub mod headers;
pub mod message;
pub mod method;
pub mod parser;
pub mod status;

pub use client::{ClientOptions, HttpClient};
pub use headers::Headers;
pub use message::{Message, Request, Response};
pub use method::Method;
pub use status::Status;

/// CRLF line ending
pub const CRLF: &str = "\r\n";

/// Protocol version for newly constructed messages
pub const DEFAULT_VERSION: &str = "1.1";

/// Default port for plaintext HTTP
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Default port for HTTP over TLS
pub const DEFAULT_HTTPS_PORT: u16 = 443;

/// Longest accepted status, header, or chunk-size line
pub const MAX_LINE: usize = 8192;
