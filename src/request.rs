use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tracing::trace;

use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::is_tchar;

/// A decoded request head.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    version: Version,
    host: Option<String>,
    headers: Headers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
    Extension(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    major: u8,
    minor: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum State {
    #[default]
    RequestLine,
    Headers,
    Done,
}

/// Line-at-a-time request head parser.
///
/// Feed it every line of the head, terminator included, until [Parser::feed]
/// reports completion, then take the request out with [Parser::finish].
#[derive(Debug, Default)]
pub struct Parser {
    state: State,
    request_line: Option<(Method, String, Version)>,
    headers: Headers,
}

impl Parser {
    pub fn new() -> Self {
        Default::default()
    }

    /// Consumes one line. Returns `true` once the blank line ending the head was seen.
    pub fn feed(&mut self, line: &[u8]) -> Result<bool> {
        let line = strip_line_ending(line);
        match self.state {
            State::RequestLine => {
                let line = std::str::from_utf8(line).map_err(|_| {
                    Error::MalformedRequestLine(String::from_utf8_lossy(line).into_owned())
                })?;
                self.request_line = Some(parse_request_line(line)?);
                self.state = State::Headers;
            }
            State::Headers if line.is_empty() => self.state = State::Done,
            State::Headers => {
                let (name, value) = line
                    .iter()
                    .position(|&b| b == b':')
                    .map(|idx| (&line[..idx], &line[idx + 1..]))
                    .filter(|(name, _)| crate::HeaderName::is_valid(*name))
                    .ok_or_else(|| {
                        Error::MalformedHeaderLine(String::from_utf8_lossy(line).into_owned())
                    })?;
                // names are tokens, so only values can carry obs-text
                let name = String::from_utf8_lossy(name);
                let value = String::from_utf8_lossy(trim_ows(value));
                trace!(field = %name, value = %value, "parsed header field.");
                self.headers.insert(name, value);
            }
            State::Done => {}
        }
        Ok(self.state == State::Done)
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Builds the request. Fails with [Error::Incomplete] unless the head was terminated.
    pub fn finish(self) -> Result<Request> {
        let (method, path, version) = match (self.state, self.request_line) {
            (State::Done, Some(line)) => line,
            _ => return Err(Error::Incomplete),
        };
        let mut headers = self.headers;
        let host = headers.remove("host").into_iter().next();
        Ok(Request {
            method,
            path,
            version,
            host,
            headers,
        })
    }
}

impl Request {
    /// Reads a request head from `src`, failing with [Error::HeadTooLarge]
    /// once more than `max_head_bytes` were read without reaching its end.
    pub async fn try_parse_from<R: AsyncRead + Unpin>(src: R, max_head_bytes: usize) -> Result<Self> {
        let mut r = BufReader::new(src);
        let mut parser = Parser::new();
        let mut consumed = 0;
        let mut line = Vec::new();
        loop {
            line.clear();
            let budget = max_head_bytes.saturating_sub(consumed) as u64;
            let n = (&mut r).take(budget).read_until(b'\n', &mut line).await?;
            consumed += n;
            if n == 0 || !line.ends_with(b"\n") {
                return Err(if consumed >= max_head_bytes {
                    Error::HeadTooLarge { limit: max_head_bytes }
                } else {
                    Error::Incomplete
                });
            }
            if parser.feed(&line)? {
                break;
            }
        }
        parser.finish()
    }

    /// Parses a complete request head held in memory. Bytes after the blank
    /// line are ignored.
    pub fn parse(src: &[u8]) -> Result<Self> {
        let mut parser = Parser::new();
        for line in src.split_inclusive(|&b| b == b'\n') {
            if !line.ends_with(b"\n") {
                break;
            }
            if parser.feed(line)? {
                break;
            }
        }
        parser.finish()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Value of the first `Host` field. The field is not kept in [Request::headers].
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.headers.first("user-agent")
    }
}

fn parse_request_line(line: &str) -> Result<(Method, String, Version)> {
    let malformed = || Error::MalformedRequestLine(line.to_owned());
    let mut tokens = line.split_whitespace();
    let (method, path, version) = match (tokens.next(), tokens.next(), tokens.next(), tokens.next()) {
        (Some(method), Some(path), Some(version), None) => (method, path, version),
        _ => return Err(malformed()),
    };
    let method = Method::from_token(method).ok_or_else(malformed)?;
    let version = Version::parse(version).ok_or_else(malformed)?;
    Ok((method, path.to_owned(), version))
}

/// Strips optional whitespace (SP and HTAB only) around a field value.
fn trim_ows(value: &[u8]) -> &[u8] {
    let is_ows = |b: &u8| *b == b' ' || *b == b'\t';
    let start = value.iter().position(|b| !is_ows(b)).unwrap_or(value.len());
    let end = value.iter().rposition(|b| !is_ows(b)).map_or(start, |idx| idx + 1);
    &value[start..end]
}

fn strip_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

impl Method {
    /// Methods are case-sensitive; unknown but well-formed tokens become [Method::Extension].
    pub fn from_token(token: &str) -> Option<Self> {
        let method = match token {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "CONNECT" => Self::Connect,
            "OPTIONS" => Self::Options,
            "TRACE" => Self::Trace,
            "PATCH" => Self::Patch,
            _ if !token.is_empty() && token.bytes().all(is_tchar) => Self::Extension(token.to_owned()),
            _ => return None,
        };
        Some(method)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Connect => "CONNECT",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
            Self::Patch => "PATCH",
            Self::Extension(token) => token,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Version {
    pub const HTTP_10: Version = Version { major: 1, minor: 0 };
    pub const HTTP_11: Version = Version { major: 1, minor: 1 };

    /// Parses `HTTP/<digit>.<digit>`.
    pub fn parse(src: &str) -> Option<Self> {
        match src.strip_prefix("HTTP/")?.as_bytes() {
            &[major, b'.', minor] if major.is_ascii_digit() && minor.is_ascii_digit() => Some(Self {
                major: major - b'0',
                minor: minor - b'0',
            }),
            _ => None,
        }
    }

    pub fn major(self) -> u8 {
        self.major
    }

    pub fn minor(self) -> u8 {
        self.minor
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP/{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    const BASIC: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost:8080\r\nUser-Agent: BlahBlah\r\n\r\n";

    #[test]
    fn test_parse_basic() {
        let req = Request::parse(BASIC).unwrap();
        assert_eq!(req.method(), &Method::Get);
        assert_eq!(req.path(), "/");
        assert_eq!(req.version(), Version::HTTP_11);
        assert_eq!(req.host(), Some("localhost:8080"));
        assert_eq!(req.headers().values("User-Agent"), ["BlahBlah"]);
        assert_eq!(req.user_agent(), Some("BlahBlah"));
        assert_eq!(req.headers().len(), 1);
    }

    #[test]
    fn test_repeated_fields_keep_wire_order() {
        let req = Request::parse(
            b"GET / HTTP/1.1\r\nuser-Agent: BlahBlah\r\nAccept: */*\r\nUSER-AGENT: FooFoo\r\n\r\n",
        )
        .unwrap();
        let headers = req.headers();
        assert_eq!(headers.values("User-Agent"), ["BlahBlah", "FooFoo"]);
        assert_eq!(headers.values("user-agent"), headers.values("USER-AGENT"));
        assert_eq!(req.user_agent(), Some("BlahBlah"));
    }

    #[test]
    fn test_value_whitespace_trimmed() {
        let req = Request::parse(b"GET / HTTP/1.1\r\nX-Pad: \t spaced out \t\r\nX-Empty:\r\n\r\n").unwrap();
        assert_eq!(req.headers().first("x-pad"), Some("spaced out"));
        assert_eq!(req.headers().first("x-empty"), Some(""));
        assert_eq!(req.user_agent(), None);
    }

    #[test]
    fn test_only_sp_and_htab_trimmed() {
        let req = Request::parse("GET / HTTP/1.1\r\nUser-Agent: \u{a0}BlahBlah\u{a0}\t\r\nX-Blank: \t \r\n\r\n".as_bytes())
            .unwrap();
        assert_eq!(req.user_agent(), Some("\u{a0}BlahBlah\u{a0}"));
        assert_eq!(req.headers().first("x-blank"), Some(""));
    }

    #[test]
    fn test_obs_text_in_value() {
        let req = Request::parse(b"GET / HTTP/1.1\r\nUser-Agent: caf\xe9\r\nX-Utf8: caf\xc3\xa9\r\n\r\n").unwrap();
        assert_eq!(req.user_agent(), Some("caf\u{fffd}"));
        assert_eq!(req.headers().first("x-utf8"), Some("caf\u{e9}"));

        let err = Request::parse(b"GET / HTTP/1.1\r\nUser-Ag\xe9nt: x\r\n\r\n").unwrap_err();
        assert!(matches!(err, Error::MalformedHeaderLine(_)), "{err:?}");
    }

    #[test]
    fn test_bare_lf_and_trailing_body() {
        let req = Request::parse(b"POST /submit HTTP/1.0\nContent-Length: 3\n\nabc").unwrap();
        assert_eq!(req.method(), &Method::Post);
        assert_eq!(req.version(), Version::HTTP_10);
        assert_eq!((req.version().major(), req.version().minor()), (1, 0));
        assert_eq!(req.headers().first("content-length"), Some("3"));
    }

    #[test]
    fn test_extension_method() {
        let req = Request::parse(b"PURGE /cache HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(req.method(), &Method::Extension("PURGE".to_owned()));
        assert_eq!(req.method().to_string(), "PURGE");
        assert_eq!(req.host(), None);
    }

    #[test]
    fn test_malformed_request_line() {
        for src in [
            &b"GET\r\n\r\n"[..],
            b"GET /\r\n\r\n",
            b"\r\n\r\n",
            b"GET / HTTP/1.1 extra\r\n\r\n",
            b"GET / HTTP/one\r\n\r\n",
            b"G(T / HTTP/1.1\r\n\r\n",
        ] {
            let err = Request::parse(src).unwrap_err();
            assert!(matches!(err, Error::MalformedRequestLine(_)), "{err:?}");
            assert!(err.is_parse());
        }
    }

    #[test]
    fn test_malformed_header_line() {
        for src in [
            &b"GET / HTTP/1.1\r\nNoColonHere\r\n\r\n"[..],
            b"GET / HTTP/1.1\r\n: empty-name\r\n\r\n",
            b"GET / HTTP/1.1\r\nUser-Agent : spaced\r\n\r\n",
            b"GET / HTTP/1.1\r\n folded: value\r\n\r\n",
        ] {
            let err = Request::parse(src).unwrap_err();
            assert!(matches!(err, Error::MalformedHeaderLine(_)), "{err:?}");
            assert!(err.source().is_none());
        }
    }

    #[test]
    fn test_incomplete() {
        assert!(matches!(Request::parse(b""), Err(Error::Incomplete)));
        assert!(matches!(Request::parse(b"GET / HTTP/1.1\r\nHost: a\r\n"), Err(Error::Incomplete)));
        assert!(matches!(Request::parse(b"GET / HTTP/1.1\r\nHost: a"), Err(Error::Incomplete)));
    }

    #[test]
    fn test_parser_states() -> Result<()> {
        let mut parser = Parser::new();
        assert!(!parser.feed(b"GET /index.html HTTP/1.1\r\n")?);
        assert!(!parser.feed(b"Accept: text/html\r\n")?);
        assert!(!parser.is_done());
        assert!(parser.feed(b"\r\n")?);
        let req = parser.finish()?;
        assert_eq!(req.path(), "/index.html");
        assert_eq!(req.headers().first("ACCEPT"), Some("text/html"));
        Ok(())
    }

    #[tokio::test]
    async fn test_try_parse_from_reader() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let req = Request::try_parse_from(&mut &BASIC[..], 8192).await?;
        assert_eq!(req.user_agent(), Some("BlahBlah"));
        assert_eq!(req.host(), Some("localhost:8080"));
        Ok(())
    }

    #[tokio::test]
    async fn test_try_parse_from_limits() {
        let err = Request::try_parse_from(&mut &BASIC[..], 20).await.unwrap_err();
        assert!(matches!(err, Error::HeadTooLarge { limit: 20 }), "{err:?}");

        let err = Request::try_parse_from(&mut &BASIC[..BASIC.len() - 2], 8192)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Incomplete), "{err:?}");

        let exact = Request::try_parse_from(&mut &BASIC[..], BASIC.len()).await;
        assert!(exact.is_ok());
    }
}
