use tokio::io::{self, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::request::Request;
use crate::response::{Response, Status};

/// Reads one request head from `stream`, lets `handler` produce the response
/// and writes it back before closing the connection.
///
/// A request that fails to parse is answered with `400` (or `431` for an
/// oversized head) and the parse error is returned; `handler` is not called.
#[tracing::instrument(skip_all, fields(http.ip = ?stream.peer_addr()))]
pub async fn serve_connection<F>(mut stream: TcpStream, max_head_bytes: usize, handler: F) -> Result<()>
where
    F: FnOnce(&Request) -> Response,
{
    let request = match Request::try_parse_from(&mut stream, max_head_bytes).await {
        Ok(req) => {
            info!(
                method = req.method().as_str(),
                path = req.path(),
                "successfully parsed request."
            );
            req
        }
        Err(error) if error.is_parse() => {
            debug!(%error, "failed to parse request.");
            let status = match error {
                Error::HeadTooLarge { .. } => Status::RequestHeaderFieldsTooLarge,
                _ => Status::BadRequest,
            };
            let response = Response::builder().with_status(status).with_body(Vec::new());
            if let Err(e) = close_with(stream, response).await {
                debug!(error = %e, "error writing error response.");
            }
            return Err(error);
        }
        Err(error) => return Err(error),
    };

    let response = handler(&request);
    let status = response.status().code();
    close_with(stream, response).await?;
    info!(status, "successfully sent response");
    Ok(())
}

/// Writes `response`, then drains whatever the peer still sends until it
/// closes its side, so unread input never turns the close into a reset.
async fn close_with(mut stream: TcpStream, response: Response) -> Result<()> {
    response.try_write_to(&mut stream).await?;
    stream.shutdown().await?;
    io::copy(&mut stream, &mut io::sink()).await?;
    Ok(())
}
