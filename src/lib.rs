//! wirehttp - immutable HTTP message values and a blocking wire client
//!
//! This crate provides immutable value objects for HTTP requests, responses,
//! URIs and body streams, together with a minimal blocking client that
//! serializes a request over a raw (optionally TLS-wrapped) socket and parses
//! the raw response back into a `Response`.

pub mod error;
pub mod http;
pub mod net;
pub mod stream;
pub mod uri;

pub use error::{Error, Result};
