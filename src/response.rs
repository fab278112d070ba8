use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::Result;
use crate::headers::Headers;
use crate::request::Version;

pub struct Response {
    status: Status,
    headers: Headers,
    body: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    OK,
    BadRequest,
    RequestHeaderFieldsTooLarge,
}

#[derive(Default)]
pub struct Builder {
    status: Status,
    headers: Headers,
}

/// Decoded first line of a response, e.g. `HTTP/1.1 200 OK`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    version: Version,
    code: u16,
    reason: String,
}

impl Response {
    pub fn builder() -> Builder {
        Default::default()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub async fn try_write_to<W: AsyncWrite + Unpin>(self, mut dest: W) -> Result<()> {
        dest.write_all(&self.into_bytes()).await?;
        dest.flush().await?;
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        let first_line = format!("HTTP/1.1 {}\r\n", self.status.as_str());
        let headers = self
            .headers
            .iter()
            .flat_map(|(name, values)| values.iter().map(move |v| format!("{}: {}\r\n", name, v)))
            .collect::<String>();

        let complete_header = first_line + &headers + "\r\n";

        let mut result = complete_header.into_bytes();
        result.extend_from_slice(&self.body);
        result
    }
}

impl Status {
    pub fn code(self) -> u16 {
        match self {
            Self::OK => 200,
            Self::BadRequest => 400,
            Self::RequestHeaderFieldsTooLarge => 431,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::OK => "200 OK",
            Self::BadRequest => "400 Bad Request",
            Self::RequestHeaderFieldsTooLarge => "431 Request Header Fields Too Large",
        }
    }
}

impl Builder {
    pub fn with_status(&mut self, status: Status) -> &mut Self {
        self.status = status;
        self
    }

    pub fn as_text(&mut self) -> &mut Self {
        self.with_header("content-type", "text/plain; charset=utf-8")
    }

    pub fn with_header<N: AsRef<str>, V: Into<String>>(&mut self, name: N, value: V) -> &mut Self {
        self.headers.insert(name, value);
        self
    }

    /// Finishes the response. Every response closes its connection.
    pub fn with_body<B: Into<Vec<u8>>>(&mut self, body: B) -> Response {
        let body = body.into();
        let mut headers = self.headers.clone();
        headers.insert("content-length", body.len().to_string());
        headers.insert("connection", "close");
        Response {
            status: self.status,
            headers,
            body,
        }
    }
}

impl StatusLine {
    /// Decodes the status line at the start of `src`. Returns `None` when the
    /// first line is missing or not of the form `HTTP/x.y CODE [REASON]`.
    pub fn parse(src: &[u8]) -> Option<Self> {
        let end = src.iter().position(|&b| b == b'\n')?;
        let line = std::str::from_utf8(&src[..end]).ok()?.trim_end_matches('\r');
        let mut parts = line.splitn(3, ' ');
        let version = Version::parse(parts.next()?)?;
        let code = parts.next()?;
        if code.len() != 3 {
            return None;
        }
        let code = code.parse().ok()?;
        let reason = parts.next().unwrap_or_default().to_owned();
        Some(Self {
            version,
            code,
            reason,
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }
}

impl std::fmt::Display for StatusLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.version, self.code, self.reason)
    }
}
