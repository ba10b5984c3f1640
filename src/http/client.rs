//! Blocking HTTP client
//!
//! One request/response round trip per connection: the client resolves the
//! target against its base URI, serializes the request, writes it over a
//! plain or TLS socket and parses the raw response back into a `Response`.
//! `Connection: close` is always forced; there is no keep-alive, pooling,
//! redirect following or retrying.

use std::time::Duration;

use tracing::debug;

use crate::error::{Error, Result};
use crate::http::message::{Message, Request, Response};
use crate::http::method::Method;
use crate::http::{chunked, parser, Headers, CRLF, DEFAULT_HTTPS_PORT, DEFAULT_HTTP_PORT, MAX_LINE};
use crate::net::tls::TlsTransport;
use crate::net::{Connection, TcpTransport, Transport};
use crate::stream::BodyStream;
use crate::uri::Uri;

/// Client configuration
///
/// A snapshot taken at construction; the client holds no other state, so
/// separate instances never interfere.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Extra headers merged into every outgoing request, overwriting
    /// same-named request headers
    pub headers: Vec<(String, String)>,
    /// Connect deadline, also applied to every read and write
    pub time_out: Duration,
    /// Chunk size for streaming reads and writes
    pub buffer_size: usize,
    /// URI whose scheme, host, port and path prefix apply to requests
    /// lacking them
    pub base_uri: Option<Uri>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions {
            headers: Vec::new(),
            time_out: Duration::from_secs(3),
            buffer_size: 1024,
            base_uri: None,
        }
    }
}

/// Blocking HTTP client
pub struct HttpClient {
    options: ClientOptions,
}

impl HttpClient {
    /// Create a client with default options
    pub fn new() -> Self {
        HttpClient {
            options: ClientOptions::default(),
        }
    }

    /// Create a client with the given options
    pub fn with_options(options: ClientOptions) -> Self {
        HttpClient { options }
    }

    /// Get the configuration snapshot
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Perform one request/response round trip
    ///
    /// The request URI wins over the base URI field by field; the request
    /// path is prefixed with the base path. `https` selects TLS and port
    /// 443, anything else port 80, unless a port is given explicitly.
    pub fn send(&self, request: &Request) -> Result<Response> {
        let base = self.options.base_uri.clone().unwrap_or_default();
        let uri = request.uri();

        let scheme = if uri.scheme().is_empty() {
            base.scheme()
        } else {
            uri.scheme()
        };
        let host = if uri.host().is_empty() {
            base.host()
        } else {
            uri.host()
        };
        if host.is_empty() {
            return Err(Error::Configuration(
                "no host given in the request URI or base URI".to_string(),
            ));
        }
        let host = host.to_string();

        let tls = scheme == "https";
        let port = uri.port().or_else(|| base.port()).unwrap_or(if tls {
            DEFAULT_HTTPS_PORT
        } else {
            DEFAULT_HTTP_PORT
        });

        let path = format!("{}{}", base.path(), uri.path());
        let mut target = if path.is_empty() { "/".to_string() } else { path };
        if !uri.query().is_empty() {
            target.push('?');
            target.push_str(uri.query());
        }

        let mut request = request.clone();
        if !request.has_header("Host") {
            request = request.with_header("Host", &host)?;
        }
        for (name, value) in &self.options.headers {
            request = request.with_header(name, value)?;
        }
        let size = request.body().size();
        if size > 0 {
            request = request.with_header("Content-Length", &size.to_string())?;
        }
        let request = request.with_header("Connection", "close")?;

        debug!(%host, port, tls, "connecting");
        let transport: Box<dyn Transport> = if tls {
            Box::new(TlsTransport::connect(&host, port, self.options.time_out)?)
        } else {
            Box::new(TcpTransport::connect(&host, port, self.options.time_out)?)
        };
        let mut conn = Connection::new(transport, self.options.time_out, self.options.buffer_size);

        let result = self.exchange(&request, &target, &mut conn);
        let _ = conn.close();
        result
    }

    fn exchange(&self, request: &Request, target: &str, conn: &mut Connection) -> Result<Response> {
        let mut head = String::new();
        head.push_str(&format!(
            "{} {} HTTP/{}{CRLF}",
            request.method(),
            target,
            request.protocol_version()
        ));
        for (name, values) in request.headers().iter() {
            head.push_str(&format!("{}: {}{CRLF}", name, values.join(",")));
        }
        head.push_str(CRLF);

        debug!(method = %request.method(), request_target = target, "sending request");
        conn.write_all(head.as_bytes())?;

        let body = request.body();
        if body.size() > 0 {
            body.rewind();
            while !body.eof() {
                let chunk = body.read(self.options.buffer_size);
                conn.write_all(&chunk)?;
            }
        }

        let status_line = conn
            .read_line(MAX_LINE)?
            .ok_or_else(|| Error::Protocol("connection closed before a status line".to_string()))?;
        let (version, code, reason) = parser::parse_status_line(&status_line)?;

        let mut headers = Headers::new();
        loop {
            match conn.read_line(MAX_LINE)? {
                None => break,
                Some(line) if line.is_empty() => break,
                Some(line) => {
                    let (name, value) = parser::parse_header_line(&line)?;
                    headers.set(&name, &value)?;
                }
            }
        }

        let body = self.read_response_body(&headers, conn)?;

        debug!(code, "received response");
        Response::from_parts(&version, code, &reason, headers, body)
    }

    fn read_response_body(&self, headers: &Headers, conn: &mut Connection) -> Result<BodyStream> {
        if headers.contains("Content-Length") {
            let text = headers.line("Content-Length");
            let length: usize = text
                .trim()
                .parse()
                .map_err(|_| Error::Protocol(format!("invalid Content-Length: {text:?}")))?;
            let bytes = conn.read_exact(length)?;
            return Ok(BodyStream::from_slice(&bytes));
        }

        if headers.contains("Transfer-Encoding") {
            let encoding = headers.line("Transfer-Encoding");
            if !encoding.eq_ignore_ascii_case("chunked") {
                return Err(Error::UnsupportedEncoding(encoding));
            }
            let bytes = chunked::read_body(conn, MAX_LINE)?;
            return Ok(BodyStream::from_slice(&bytes));
        }

        Ok(BodyStream::empty())
    }

    /// Build and send a request in one call
    ///
    /// For GET, `data` pairs are merged into the URI query (overriding
    /// same-named keys, repeated keys kept as repeated pairs). For every
    /// other method, `data` is form-encoded into the request body and `send`
    /// announces its length.
    pub fn request(
        &self,
        method: Method,
        uri: &str,
        data: &[(&str, &str)],
        headers: &[(&str, &str)],
    ) -> Result<Response> {
        let mut uri = Uri::parse(uri)?;
        let mut body = BodyStream::empty();

        if !data.is_empty() {
            if method == Method::Get {
                let merged = merge_query(uri.query(), data);
                uri = uri.with_query(&merged);
            } else {
                body = BodyStream::from_string(&form_encode(data));
            }
        }

        let mut request = Request::new(method, uri).with_body(body);
        for (name, value) in headers {
            request = request.with_header(name, value)?;
        }

        self.send(&request)
    }

    /// Send a GET request, merging `data` into the query string
    pub fn get(&self, uri: &str, data: &[(&str, &str)]) -> Result<Response> {
        self.request(Method::Get, uri, data, &[])
    }

    /// Send a POST request with `data` form-encoded into the body
    pub fn post(&self, uri: &str, data: &[(&str, &str)]) -> Result<Response> {
        self.request(Method::Post, uri, data, &[])
    }

    /// Send a PUT request with `data` form-encoded into the body
    pub fn put(&self, uri: &str, data: &[(&str, &str)]) -> Result<Response> {
        self.request(Method::Put, uri, data, &[])
    }

    /// Send a DELETE request with `data` form-encoded into the body
    pub fn delete(&self, uri: &str, data: &[(&str, &str)]) -> Result<Response> {
        self.request(Method::Delete, uri, data, &[])
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        HttpClient::new()
    }
}

/// Merge data pairs into an existing (already percent-encoded) query string
///
/// A data pair overrides every existing occurrence of its key, keeping the
/// first occurrence's position; unknown keys are appended in order.
fn merge_query(existing: &str, data: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(String, Option<String>)> = Vec::new();
    if !existing.is_empty() {
        for pair in existing.split('&') {
            match pair.split_once('=') {
                Some((key, value)) => pairs.push((key.to_string(), Some(value.to_string()))),
                None => pairs.push((pair.to_string(), None)),
            }
        }
    }

    for (key, value) in data {
        let key = query_escape(key);
        let value = query_escape(value);
        let mut replaced = false;
        pairs.retain_mut(|(existing_key, existing_value)| {
            if *existing_key != key {
                return true;
            }
            if replaced {
                return false;
            }
            *existing_value = Some(value.clone());
            replaced = true;
            true
        });
        if !replaced {
            pairs.push((key, Some(value)));
        }
    }

    pairs
        .iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{key}={value}"),
            None => key.clone(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn form_encode(data: &[(&str, &str)]) -> String {
    data.iter()
        .map(|(key, value)| format!("{}={}", form_escape(key), form_escape(value)))
        .collect::<Vec<_>>()
        .join("&")
}

// application/x-www-form-urlencoded: spaces become '+'.
fn form_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for &byte in value.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => out.push(byte as char),
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

// RFC 3986 escaping for query components: spaces become %20.
fn query_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for &byte in value.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
