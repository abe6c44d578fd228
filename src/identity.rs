//! Sender identity normalization
//!
//! A [`SenderIdentity`] is the grouping key for a "From" header: the
//! lower-cased address when one can be found, otherwise the lower-cased header
//! itself. Normalization is total, so every message gets a key.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Content between a pair of angle brackets: `Name <addr>`
static ANGLE_ADDRESS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<([^<>]*)>").unwrap());

/// Characters that wrap an address token without being part of it
const TOKEN_WRAPPERS: &[char] = &['<', '>', '"', '\'', '(', ')', '[', ']'];

/// Identity used for headers that are blank after trimming
pub const UNKNOWN_SENDER: &str = "unknown sender";

/// Normalized sender key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderIdentity(String);

impl SenderIdentity {
    /// Derive the identity from a raw "From" header value
    pub fn from_header(header: &str) -> Self {
        let key = match find_address(header) {
            Some(address) => address.trim().to_lowercase(),
            None => header.trim().to_lowercase(),
        };

        if key.is_empty() {
            Self(UNKNOWN_SENDER.to_string())
        } else {
            Self(key)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SenderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SenderIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Locate the first address-like substring of a header, as written
///
/// Angle-bracketed content wins when it is address-like, so a display name
/// that itself contains an `@` does not shadow the real mailbox. Otherwise the
/// first whitespace, comma or semicolon separated token is used.
pub fn find_address(header: &str) -> Option<&str> {
    for caps in ANGLE_ADDRESS.captures_iter(header) {
        if let Some(inner) = caps.get(1) {
            let candidate = inner.as_str().trim();
            if is_address_like(candidate) {
                return Some(candidate);
            }
        }
    }

    header
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .map(|token| token.trim_matches(TOKEN_WRAPPERS))
        .find(|token| is_address_like(token))
}

/// Exactly one `@`, with non-empty, whitespace-free text on both sides
fn is_address_like(token: &str) -> bool {
    if token.chars().any(char::is_whitespace) {
        return false;
    }
    match token.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_address() {
        let identity = SenderIdentity::from_header("news@example.com");
        assert_eq!(identity.as_str(), "news@example.com");
    }

    #[test]
    fn test_named_address_is_lowercased() {
        let identity = SenderIdentity::from_header("The Weekly <Weekly@News.Example.COM>");
        assert_eq!(identity.as_str(), "weekly@news.example.com");
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let a = SenderIdentity::from_header("  B@X.com ");
        let b = SenderIdentity::from_header("b@x.com");
        assert_eq!(a, b);
    }

    #[test]
    fn test_quoted_name_with_at_sign_prefers_angle_address() {
        let identity =
            SenderIdentity::from_header("\"jane@example.com via List\" <list@lists.example.org>");
        assert_eq!(identity.as_str(), "list@lists.example.org");
    }

    #[test]
    fn test_missing_angle_brackets() {
        let identity = SenderIdentity::from_header("Jane Doe jane@example.com");
        assert_eq!(identity.as_str(), "jane@example.com");
    }

    #[test]
    fn test_multiple_addresses_takes_first() {
        let identity = SenderIdentity::from_header("a@x.com, b@y.com");
        assert_eq!(identity.as_str(), "a@x.com");
    }

    #[test]
    fn test_unclosed_angle_bracket() {
        let identity = SenderIdentity::from_header("Shop <deals@shop.example");
        assert_eq!(identity.as_str(), "deals@shop.example");
    }

    #[test]
    fn test_no_address_falls_back_to_header() {
        let identity = SenderIdentity::from_header("  Mailer Daemon ");
        assert_eq!(identity.as_str(), "mailer daemon");
    }

    #[test]
    fn test_double_at_is_not_an_address() {
        let identity = SenderIdentity::from_header("a@@b");
        assert_eq!(identity.as_str(), "a@@b");
        assert_eq!(find_address("x@y@z"), None);
    }

    #[test]
    fn test_dangling_at_is_not_an_address() {
        assert_eq!(find_address("@example.com"), None);
        assert_eq!(find_address("user@"), None);
    }

    #[test]
    fn test_blank_header_is_never_empty() {
        assert_eq!(SenderIdentity::from_header("").as_str(), UNKNOWN_SENDER);
        assert_eq!(SenderIdentity::from_header("   ").as_str(), UNKNOWN_SENDER);
    }

    #[test]
    fn test_find_address_keeps_case_as_written() {
        assert_eq!(find_address("Jane <Jane@Example.com>"), Some("Jane@Example.com"));
    }
}
