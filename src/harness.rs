//! Drives a single request through a real socket.
//!
//! [make_request] binds a throwaway listener, sends the raw bytes as a client
//! would, and lets a server task parse them and hand the decoded [Request] to
//! an observer before answering `200 OK`. The call only returns once the whole
//! exchange is over, so the observer has run exactly once by then, or not at
//! all when the bytes could not be parsed.

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::panic;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime;
use tokio::task;
use tracing::debug;

use crate::error::Result;
use crate::request::Request;
use crate::response::Response;
use crate::server::serve_connection;

#[derive(Debug, Clone)]
pub struct Config {
    bind_addr: SocketAddr,
    max_head_bytes: usize,
}

impl Config {
    pub const DEFAULT_MAX_HEAD_BYTES: usize = 8192;

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_max_head_bytes(mut self, limit: usize) -> Self {
        self.max_head_bytes = limit;
        self
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn max_head_bytes(&self) -> usize {
        self.max_head_bytes
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: (Ipv4Addr::LOCALHOST, 0).into(),
            max_head_bytes: Self::DEFAULT_MAX_HEAD_BYTES,
        }
    }
}

/// Sends `raw` to a fresh local server and returns the raw response bytes.
///
/// Fails with the parse error when `raw` is not a valid request head, in which
/// case `observer` is never called. A panic inside `observer` is resumed on the
/// caller.
pub async fn make_request<F>(raw: &[u8], observer: F) -> Result<Vec<u8>>
where
    F: FnOnce(&Request) + Send + 'static,
{
    make_request_with(&Config::default(), raw, observer).await
}

#[tracing::instrument(skip(raw, observer), fields(len = raw.len()))]
pub async fn make_request_with<F>(config: &Config, raw: &[u8], observer: F) -> Result<Vec<u8>>
where
    F: FnOnce(&Request) + Send + 'static,
{
    let listener = TcpListener::bind(config.bind_addr).await?;
    let client = TcpStream::connect(listener.local_addr()?).await?;

    let max_head_bytes = config.max_head_bytes;
    let server = task::spawn(async move {
        let (stream, peer) = listener.accept().await?;
        debug!(%peer, "accepted harness connection.");
        serve_connection(stream, max_head_bytes, move |req| {
            observer(req);
            Response::builder().with_body(Vec::new())
        })
        .await
    });

    let exchanged = exchange(client, raw).await;
    match server.await {
        Ok(served) => served?,
        Err(e) if e.is_panic() => panic::resume_unwind(e.into_panic()),
        Err(e) => return Err(io::Error::other(e).into()),
    }
    exchanged
}

/// Blocking form of [make_request] running on its own current-thread runtime.
///
/// # Panics
///
/// Panics when called from within an async runtime.
pub fn make_request_blocking<F>(raw: &[u8], observer: F) -> Result<Vec<u8>>
where
    F: FnOnce(&Request) + Send + 'static,
{
    let rt = runtime::Builder::new_current_thread().enable_all().build()?;
    rt.block_on(make_request(raw, observer))
}

async fn exchange(mut stream: TcpStream, raw: &[u8]) -> Result<Vec<u8>> {
    stream.write_all(raw).await?;
    stream.shutdown().await?;
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(response)
}
