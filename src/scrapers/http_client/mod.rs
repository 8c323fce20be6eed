//! Static page acquisition over plain HTTP.

mod user_agent;

pub use user_agent::{resolve_user_agent, DEFAULT_USER_AGENT};

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{AcquireMode, FetchError, PageAcquirer};

/// Single-GET acquirer.
///
/// The body is returned whatever the status code; a blocked or error page
/// simply fails extraction later.
#[derive(Clone)]
pub struct HttpAcquirer {
    client: Client,
}

impl HttpAcquirer {
    /// Create a new acquirer.
    /// - `user_agent_config`: see [`resolve_user_agent`]
    pub fn new(timeout: Duration, user_agent_config: Option<&str>) -> Result<Self, reqwest::Error> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageAcquirer for HttpAcquirer {
    async fn acquire(&self, url: &str) -> Result<String, FetchError> {
        let http_err = |source| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let start = Instant::now();
        let response = self.client.get(url).send().await.map_err(http_err)?;
        let status = response.status();

        if !status.is_success() {
            warn!(url, status = status.as_u16(), "Non-success status, keeping body");
        }

        let body = response.text().await.map_err(http_err)?;
        debug!(
            url,
            status = status.as_u16(),
            bytes = body.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Fetched page"
        );

        Ok(body)
    }

    fn mode(&self) -> AcquireMode {
        AcquireMode::Static
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response and hand back the raw request.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });
        (format!("http://{}/hz/wishlist/ls/ABC", addr), handle)
    }

    #[tokio::test]
    async fn test_acquire_returns_body_for_error_status() {
        let (url, server) = serve_once("503 Service Unavailable", "<html>robot check</html>").await;
        let acquirer = HttpAcquirer::new(Duration::from_secs(5), None).unwrap();

        let body = acquirer.acquire(&url).await.unwrap();

        assert_eq!(body, "<html>robot check</html>");
        let request = server.await.unwrap().to_ascii_lowercase();
        assert!(request.starts_with("get /hz/wishlist/ls/abc"));
        assert!(request.contains(&format!("user-agent: {}", DEFAULT_USER_AGENT.to_ascii_lowercase())));
    }

    #[tokio::test]
    async fn test_acquire_unreachable_host_is_fetch_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let url = format!("http://{}/list", addr);
        let acquirer = HttpAcquirer::new(Duration::from_secs(2), None).unwrap();

        let err = acquirer.acquire(&url).await.unwrap_err();

        assert!(matches!(err, FetchError::Http { .. }));
        assert_eq!(err.url(), url);
        assert_eq!(acquirer.mode(), AcquireMode::Static);
    }
}
