//! Response head parsing
//!
//! Line-level parsing for the status line and header lines read off the
//! wire. Both are lenient where HTTP servers are known to be sloppy (missing
//! reason phrase, whitespace padding) and strict about framing.

use crate::error::{Error, Result};

/// Parse `HTTP/version SP code [SP reason]` into its parts
///
/// The reason phrase may be absent; the caller substitutes the registered
/// phrase for the code.
pub fn parse_status_line(line: &str) -> Result<(String, u16, String)> {
    let rest = line
        .strip_prefix("HTTP/")
        .ok_or_else(|| Error::Protocol(format!("response is not HTTP: {line:?}")))?;

    let mut parts = rest.splitn(3, ' ');

    let version = parts.next().unwrap_or("").to_string();
    if version.is_empty() {
        return Err(Error::Protocol(format!(
            "status line has no protocol version: {line:?}"
        )));
    }

    let code = parts
        .next()
        .ok_or_else(|| Error::Protocol(format!("status line has no status code: {line:?}")))?;
    let code: u16 = code
        .trim()
        .parse()
        .map_err(|_| Error::Protocol(format!("invalid status code: {code:?}")))?;

    let reason = parts.next().unwrap_or("").trim().to_string();

    Ok((version, code, reason))
}

/// Split a header line on the first colon, trimming name and value
pub fn parse_header_line(line: &str) -> Result<(String, String)> {
    match line.split_once(':') {
        Some((name, value)) => {
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::Protocol(format!(
                    "header line has an empty name: {line:?}"
                )));
            }
            Ok((name.to_string(), value.trim().to_string()))
        }
        None => Err(Error::Protocol(format!("header line has no colon: {line:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_line() {
        let (version, code, reason) = parse_status_line("HTTP/1.1 200 OK").unwrap();
        assert_eq!(version, "1.1");
        assert_eq!(code, 200);
        assert_eq!(reason, "OK");
    }

    #[test]
    fn test_parse_status_line_without_reason() {
        let (version, code, reason) = parse_status_line("HTTP/1.0 404").unwrap();
        assert_eq!(version, "1.0");
        assert_eq!(code, 404);
        assert_eq!(reason, "");
    }

    #[test]
    fn test_parse_status_line_multiword_reason() {
        let (_, code, reason) = parse_status_line("HTTP/1.1 500 Internal Server Error").unwrap();
        assert_eq!(code, 500);
        assert_eq!(reason, "Internal Server Error");
    }

    #[test]
    fn test_non_http_rejected() {
        assert!(matches!(
            parse_status_line("ICY 200 OK"),
            Err(Error::Protocol(_))
        ));
        assert!(matches!(
            parse_status_line("HTTP/1.1 abc OK"),
            Err(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_header_line() {
        let (name, value) = parse_header_line("Content-Type: text/html").unwrap();
        assert_eq!(name, "Content-Type");
        assert_eq!(value, "text/html");

        let (name, value) = parse_header_line("X-Time:  10:30:00  ").unwrap();
        assert_eq!(name, "X-Time");
        assert_eq!(value, "10:30:00");

        assert!(parse_header_line("No colon here").is_err());
        assert!(parse_header_line(": value").is_err());
    }
}
