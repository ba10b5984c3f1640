//! HTTP message value objects
//!
//! `Request` and `Response` are immutable: every `with_*` method validates
//! its input and returns a new instance, leaving the original untouched. The
//! copies share the same body stream object unless the body itself is
//! replaced. The shared surface lives on the [`Message`] trait.

use crate::error::Result;
use crate::http::headers::Headers;
use crate::http::method::Method;
use crate::http::status::Status;
use crate::http::DEFAULT_VERSION;
use crate::stream::BodyStream;
use crate::uri::Uri;

/// Shared request/response surface: protocol version, headers, body
pub trait Message: Clone {
    /// Protocol version, e.g. `"1.1"`
    fn protocol_version(&self) -> &str;

    /// Return a copy with the given protocol version
    fn with_protocol_version(&self, version: &str) -> Self;

    /// The header collection
    fn headers(&self) -> &Headers;

    /// All values for a header (case-insensitive); empty when absent
    fn header(&self, name: &str) -> &[String];

    /// Comma-joined values for a header; empty string when absent
    fn header_line(&self, name: &str) -> String;

    /// Check whether a header exists (case-insensitive)
    fn has_header(&self, name: &str) -> bool;

    /// Return a copy with the header set, replacing any case-insensitive
    /// match; fails on CR/LF in the name or value
    fn with_header(&self, name: &str, value: &str) -> Result<Self>;

    /// Return a copy with the header set to a list of values
    fn with_header_values(&self, name: &str, values: Vec<String>) -> Result<Self>;

    /// Return a copy with a value added to the header's existing values
    fn with_added_header(&self, name: &str, value: &str) -> Result<Self>;

    /// Return a copy without the header (case-insensitive)
    fn without_header(&self, name: &str) -> Self;

    /// The body stream
    fn body(&self) -> &BodyStream;

    /// Return a copy with a different body stream
    fn with_body(&self, body: BodyStream) -> Self;
}

macro_rules! impl_message {
    ($ty:ident) => {
        impl Message for $ty {
            fn protocol_version(&self) -> &str {
                &self.version
            }

            fn with_protocol_version(&self, version: &str) -> Self {
                let mut message = self.clone();
                message.version = version.to_string();
                message
            }

            fn headers(&self) -> &Headers {
                &self.headers
            }

            fn header(&self, name: &str) -> &[String] {
                self.headers.values(name)
            }

            fn header_line(&self, name: &str) -> String {
                self.headers.line(name)
            }

            fn has_header(&self, name: &str) -> bool {
                self.headers.contains(name)
            }

            fn with_header(&self, name: &str, value: &str) -> Result<Self> {
                let mut message = self.clone();
                message.headers.set(name, value)?;
                Ok(message)
            }

            fn with_header_values(&self, name: &str, values: Vec<String>) -> Result<Self> {
                let mut message = self.clone();
                message.headers.set_values(name, values)?;
                Ok(message)
            }

            fn with_added_header(&self, name: &str, value: &str) -> Result<Self> {
                let mut message = self.clone();
                message.headers.append(name, value)?;
                Ok(message)
            }

            fn without_header(&self, name: &str) -> Self {
                let mut message = self.clone();
                message.headers.remove(name);
                message
            }

            fn body(&self) -> &BodyStream {
                &self.body
            }

            fn with_body(&self, body: BodyStream) -> Self {
                let mut message = self.clone();
                message.body = body;
                message
            }
        }
    };
}

/// Immutable HTTP request
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    uri: Uri,
    request_target: Option<String>,
    version: String,
    headers: Headers,
    body: BodyStream,
}

impl Request {
    /// Create a request for `method` and `uri`
    ///
    /// When the URI carries a host, the `Host` header is populated from it.
    pub fn new(method: Method, uri: Uri) -> Self {
        let mut headers = Headers::new();
        if !uri.host().is_empty() {
            headers.set_unchecked("Host", uri.host());
        }

        Request {
            method,
            uri,
            request_target: None,
            version: DEFAULT_VERSION.to_string(),
            headers,
            body: BodyStream::empty(),
        }
    }

    /// Get the method
    pub fn method(&self) -> Method {
        self.method
    }

    /// Return a copy with a different method
    pub fn with_method(&self, method: Method) -> Self {
        let mut request = self.clone();
        request.method = method;
        request
    }

    /// Get the URI
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Return a copy with a different URI
    ///
    /// Unless `preserve_host` is set, a host carried by the new URI rewrites
    /// the `Host` header (with `:port` appended when the URI has a
    /// non-default port).
    pub fn with_uri(&self, uri: Uri, preserve_host: bool) -> Self {
        let mut request = self.clone();
        request.uri = uri;

        if preserve_host || request.uri.host().is_empty() {
            return request;
        }

        let mut host = request.uri.host().to_string();
        if let Some(port) = request.uri.port() {
            host.push(':');
            host.push_str(&port.to_string());
        }
        request.headers.set_unchecked("Host", &host);
        request
    }

    /// The target sent on the request line
    ///
    /// An explicit override wins; otherwise path, query and fragment are
    /// derived from the URI, with `/` for an empty path.
    pub fn request_target(&self) -> String {
        if let Some(target) = &self.request_target {
            return target.clone();
        }

        let path = self.uri.path();
        if path.is_empty() {
            return "/".to_string();
        }

        let mut target = path.to_string();
        if !self.uri.query().is_empty() {
            target.push('?');
            target.push_str(self.uri.query());
        }
        if !self.uri.fragment().is_empty() {
            target.push('#');
            target.push_str(self.uri.fragment());
        }
        target
    }

    /// Return a copy with an explicit request target; an empty string
    /// restores derivation from the URI
    pub fn with_request_target(&self, target: &str) -> Self {
        let mut request = self.clone();
        request.request_target = if target.is_empty() {
            None
        } else {
            Some(target.to_string())
        };
        request
    }

    /// Check the method
    pub fn is_method(&self, method: Method) -> bool {
        self.method == method
    }

    pub fn is_get(&self) -> bool {
        self.is_method(Method::Get)
    }

    pub fn is_post(&self) -> bool {
        self.is_method(Method::Post)
    }

    pub fn is_put(&self) -> bool {
        self.is_method(Method::Put)
    }

    pub fn is_delete(&self) -> bool {
        self.is_method(Method::Delete)
    }
}

impl_message!(Request);

/// Immutable HTTP response
#[derive(Debug, Clone)]
pub struct Response {
    status: Status,
    reason: String,
    version: String,
    headers: Headers,
    body: BodyStream,
}

impl Response {
    /// Create an empty response with the given status code
    pub fn new(code: u16) -> Result<Self> {
        Response::from_parts(DEFAULT_VERSION, code, "", Headers::new(), BodyStream::empty())
    }

    /// Assemble a response from parsed parts
    ///
    /// An empty reason phrase falls back to the registered phrase for the
    /// code, or stays empty for unknown codes.
    pub fn from_parts(
        version: &str,
        code: u16,
        reason: &str,
        headers: Headers,
        body: BodyStream,
    ) -> Result<Self> {
        let status = Status::new(code)?;
        let reason = if reason.is_empty() {
            status.reason_phrase().to_string()
        } else {
            reason.to_string()
        };

        Ok(Response {
            status,
            reason,
            version: version.to_string(),
            headers,
            body,
        })
    }

    /// Get the status
    pub fn status(&self) -> Status {
        self.status
    }

    /// Get the numeric status code
    pub fn status_code(&self) -> u16 {
        self.status.code()
    }

    /// Get the reason phrase
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Return a copy with a different status; an empty reason falls back to
    /// the registered phrase
    pub fn with_status(&self, code: u16, reason: &str) -> Result<Self> {
        let status = Status::new(code)?;
        let mut response = self.clone();
        response.status = status;
        response.reason = if reason.is_empty() {
            status.reason_phrase().to_string()
        } else {
            reason.to_string()
        };
        Ok(response)
    }
}

impl_message!(Response);
