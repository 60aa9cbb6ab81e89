//! Minimal HTTP JSON-RPC server for adapter tests.
//!
//! Answers every POST with whatever the responder returns for the decoded
//! request body, closing the connection after each reply.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Responder = dyn Fn(&Value) -> (u16, Value) + Send + Sync;

pub(crate) struct RpcTestServer {
    url: String,
    requests: Arc<Mutex<Vec<Value>>>,
}

impl RpcTestServer {
    /// Bind to an ephemeral port and serve until the runtime stops.
    pub(crate) async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Value) -> (u16, Value) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let seen = requests.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let responder = responder.clone();
                let seen = seen.clone();
                tokio::spawn(async move {
                    let _ = serve(stream, responder, seen).await;
                });
            }
        });

        Self { url, requests }
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    /// Request bodies received so far, in arrival order.
    pub(crate) fn requests(&self) -> Vec<Value> {
        self.requests.lock().clone()
    }
}

async fn serve(
    mut stream: TcpStream,
    responder: Arc<Responder>,
    seen: Arc<Mutex<Vec<Value>>>,
) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let end = (header_end + content_length).min(buf.len());
    let request: Value = serde_json::from_slice(&buf[header_end..end]).unwrap_or(Value::Null);
    let (status, body) = responder(&request);
    seen.lock().push(request);

    let body = body.to_string();
    let reason = match status {
        200 => "OK",
        401 => "Unauthorized",
        404 => "Not Found",
        _ => "Internal Server Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}
