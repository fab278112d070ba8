use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed request line: {0:?}")]
    MalformedRequestLine(String),
    #[error("malformed header line: {0:?}")]
    MalformedHeaderLine(String),
    #[error("connection closed before the end of the request head")]
    Incomplete,
    #[error("request head exceeds {limit} bytes")]
    HeadTooLarge { limit: usize },
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),
}

impl Error {
    /// True for errors caused by the request bytes themselves rather than the socket.
    pub fn is_parse(&self) -> bool {
        !matches!(self, Self::Transport(_))
    }
}
