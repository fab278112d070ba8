pub mod error;
pub mod harness;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;

pub use error::{Error, Result};
pub use harness::{make_request, make_request_blocking, Config};
pub use headers::Headers;
pub use request::{Method, Request, Version};
pub use response::{Response, Status, StatusLine};

/// A header field name, folded to lowercase so that lookups never depend on
/// the casing used on the wire.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HeaderName(String);

impl HeaderName {
    pub fn from_str(src: &str) -> Self {
        Self(src.trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Title-cased form, e.g. `user-agent` becomes `User-Agent`.
    pub fn canonical(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut prev = '-';
        for c in self.0.chars() {
            if prev == '-' {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
            prev = c;
        }
        out
    }

    /// Whether `src` is a valid field name: one or more RFC 9110 token characters.
    pub fn is_valid<B: AsRef<[u8]>>(src: B) -> bool {
        let src = src.as_ref();
        !src.is_empty() && src.iter().copied().all(is_tchar)
    }
}

impl std::fmt::Display for HeaderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical())
    }
}

pub(crate) fn is_tchar(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' |
        b'^' | b'_' | b'`' | b'|' | b'~' | b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z'
    )
}
