use tokio::net::TcpListener;
use tokio::task;
use tracing::{debug, info, warn};

use ingest::request::Request;
use ingest::response::Response;
use ingest::server::serve_connection;
use ingest::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();
    info!("starting server.");
    let (ip, port) = ("0.0.0.0", 8080);
    let server = TcpListener::bind((ip, port)).await?;
    info!(ip, port, "bound tcp server.");
    let max_head_bytes = Config::default().max_head_bytes();

    loop {
        let (stream, _) = match server.accept().await {
            Ok(stream) => {
                info!(
                    addr = stream.1.to_string(),
                    "successfully accepted new tcp stream."
                );
                stream
            }
            Err(error) => {
                debug!(?error, "failed to accept tcp stream.");
                continue;
            }
        };
        task::spawn(async move {
            if let Err(error) = serve_connection(stream, max_head_bytes, dump).await {
                warn!(%error, "failed to serve connection.");
            }
        });
    }
}

/// Echoes the decoded head back as plain text.
fn dump(req: &Request) -> Response {
    let mut body = format!("{} {} {}\n", req.method(), req.path(), req.version());
    if let Some(host) = req.host() {
        body += &format!("Host: {}\n", host);
    }
    for (name, values) in req.headers().iter() {
        for value in values {
            body += &format!("{}: {}\n", name, value);
        }
    }
    info!(user_agent = ?req.user_agent(), fields = req.headers().len(), "dumping request.");
    Response::builder().as_text().with_body(body)
}
