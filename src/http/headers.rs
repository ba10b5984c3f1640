//! HTTP header multimap
//!
//! Headers keep their original casing and insertion order for output while
//! every lookup, replacement and removal is case-insensitive. Setting a
//! header replaces any existing case-insensitive match, so `Location` and
//! `location` can never coexist.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    values: Vec<String>,
}

/// Ordered, case-preserving header collection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<HeaderEntry>,
}

impl Headers {
    /// Create an empty collection
    pub fn new() -> Self {
        Headers::default()
    }

    /// Set a header to a single value, replacing any case-insensitive match
    ///
    /// Names and values containing CR or LF are rejected; other characters
    /// outside `[A-Za-z0-9-_]` are stripped from the name and NUL bytes are
    /// stripped from the value.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        self.set_values(name, vec![value.to_string()])
    }

    /// Set a header to a list of values, replacing any case-insensitive match
    pub fn set_values(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        let name = filter_name(name)?;
        let values = filter_values(values)?;
        self.remove(&name);
        self.entries.push(HeaderEntry { name, values });
        Ok(())
    }

    /// Add a value to a header, keeping any existing values
    pub fn append(&mut self, name: &str, value: &str) -> Result<()> {
        let name = filter_name(name)?;
        let mut values = self.values(&name).to_vec();
        values.extend(filter_values(vec![value.to_string()])?);
        self.remove(&name);
        self.entries.push(HeaderEntry { name, values });
        Ok(())
    }

    // Used when the value comes from an already-validated source, e.g. a
    // host taken out of a parsed Uri.
    pub(crate) fn set_unchecked(&mut self, name: &str, value: &str) {
        self.remove(name);
        self.entries.push(HeaderEntry {
            name: name.to_string(),
            values: vec![value.to_string()],
        });
    }

    /// All values for a header (case-insensitive); empty when absent
    pub fn values(&self, name: &str) -> &[String] {
        self.find(name)
            .map(|i| self.entries[i].values.as_slice())
            .unwrap_or(&[])
    }

    /// Comma-joined values for a header; empty string when absent
    pub fn line(&self, name: &str) -> String {
        self.values(name).join(",")
    }

    /// Check whether a header exists (case-insensitive)
    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Remove a header (case-insensitive); returns whether one was removed
    pub fn remove(&mut self, name: &str) -> bool {
        match self.find(name) {
            Some(i) => {
                self.entries.remove(i);
                true
            }
            None => false,
        }
    }

    /// Iterate over headers in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.values.as_slice()))
    }

    /// Number of distinct headers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether there are no headers
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(name))
    }
}

fn filter_name(name: &str) -> Result<String> {
    if name.contains('\r') || name.contains('\n') {
        return Err(Error::InvalidInput(
            "header names must not contain CR or LF characters".to_string(),
        ));
    }

    let filtered: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();

    if filtered.is_empty() {
        return Err(Error::InvalidInput(format!(
            "header name {name:?} has no valid characters"
        )));
    }

    Ok(filtered)
}

fn filter_values(values: Vec<String>) -> Result<Vec<String>> {
    values
        .into_iter()
        .map(|value| {
            if value.contains('\r') || value.contains('\n') {
                return Err(Error::InvalidInput(
                    "header values must not contain CR or LF characters".to_string(),
                ));
            }
            Ok(value.replace('\0', ""))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_lookup() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/html").unwrap();
        headers.set("Content-Length", "42").unwrap();

        assert_eq!(headers.line("Content-Type"), "text/html");
        assert_eq!(headers.line("content-length"), "42");
        assert_eq!(headers.line("Missing"), "");
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_case_insensitive_replacement() {
        let mut headers = Headers::new();
        headers.set("Location", "/a").unwrap();
        headers.set("LOCATION", "/b").unwrap();

        assert_eq!(headers.len(), 1);
        assert_eq!(headers.line("location"), "/b");
        // The replacement's casing wins.
        assert_eq!(headers.iter().next().unwrap().0, "LOCATION");
    }

    #[test]
    fn test_multiple_values() {
        let mut headers = Headers::new();
        headers
            .set_values("Accept", vec!["text/html".to_string(), "text/plain".to_string()])
            .unwrap();

        assert_eq!(headers.values("accept").len(), 2);
        assert_eq!(headers.line("Accept"), "text/html,text/plain");
    }

    #[test]
    fn test_append_keeps_existing_values() {
        let mut headers = Headers::new();
        headers.set("Set-Cookie", "a=1").unwrap();
        headers.append("set-cookie", "b=2").unwrap();

        assert_eq!(headers.values("Set-Cookie"), &["a=1", "b=2"]);
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_remove_is_case_insensitive() {
        let mut headers = Headers::new();
        headers.set("X-Foo", "a").unwrap();

        assert!(headers.remove("x-foo"));
        assert!(!headers.contains("X-Foo"));
        assert!(!headers.remove("x-foo"));
    }

    #[test]
    fn test_crlf_rejected() {
        let mut headers = Headers::new();
        assert!(matches!(
            headers.set("X-Foo\r\nBar", "v"),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            headers.set("X-Foo", "v\r\ninjected"),
            Err(Error::InvalidInput(_))
        ));
        assert!(headers.is_empty());
    }

    #[test]
    fn test_name_characters_filtered() {
        let mut headers = Headers::new();
        headers.set("X-Fo o!", "v").unwrap();
        assert!(headers.contains("X-Foo"));

        assert!(matches!(
            headers.set("!!!", "v"),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_nul_stripped_from_values() {
        let mut headers = Headers::new();
        headers.set("X-Foo", "a\0b").unwrap();
        assert_eq!(headers.line("X-Foo"), "ab");
    }

    #[test]
    fn test_iteration_order() {
        let mut headers = Headers::new();
        headers.set("A", "1").unwrap();
        headers.set("B", "2").unwrap();
        headers.set("C", "3").unwrap();

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}
