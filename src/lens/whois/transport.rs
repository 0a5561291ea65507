//! WHOIS transport
//!
//! WHOIS-style services have no length framing: the client writes its query and the
//! server closes the stream once the answer is complete. The transport therefore
//! reads until end-of-stream and bounds the whole exchange with one deadline.

use super::error::WhoisError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

/// Upper bound on the bytes kept from one response
pub const MAX_RESPONSE_BYTES: usize = 1_000_000;

/// A request/response exchange with a WHOIS-style server
///
/// Implementations must not share mutable state between calls; every call is an
/// independent exchange.
#[async_trait]
pub trait WhoisTransport: Send + Sync {
    /// Send `payload` to `host:port` and return the full decoded response
    async fn query(
        &self,
        host: &str,
        port: u16,
        payload: &str,
        timeout: Duration,
    ) -> Result<String, WhoisError>;
}

/// Plain TCP transport, one short-lived connection per query
#[derive(Debug, Clone)]
pub struct TcpTransport {
    max_response_bytes: usize,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self {
            max_response_bytes: MAX_RESPONSE_BYTES,
        }
    }

    pub fn with_max_response_bytes(mut self, max: usize) -> Self {
        self.max_response_bytes = max;
        self
    }

    async fn exchange(&self, host: &str, port: u16, payload: &str) -> Result<String, WhoisError> {
        let server = format!("{}:{}", host, port);

        let mut stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| WhoisError::connection(&server, e))?;

        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", server, e);
        }

        stream
            .write_all(payload.as_bytes())
            .await
            .map_err(|e| WhoisError::connection(&server, e))?;
        stream
            .flush()
            .await
            .map_err(|e| WhoisError::connection(&server, e))?;

        let mut response: Vec<u8> = Vec::new();
        let mut buffer = [0u8; 8192];
        loop {
            let n = stream
                .read(&mut buffer)
                .await
                .map_err(|e| WhoisError::connection(&server, e))?;
            if n == 0 {
                break;
            }

            let room = self.max_response_bytes.saturating_sub(response.len());
            response.extend_from_slice(&buffer[..n.min(room)]);
            if n > room {
                warn!(
                    "Response from {} exceeded {} bytes, truncating",
                    server, self.max_response_bytes
                );
                break;
            }
        }

        debug!("Received {} bytes from {}", response.len(), server);
        Ok(String::from_utf8_lossy(&response).into_owned())
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WhoisTransport for TcpTransport {
    async fn query(
        &self,
        host: &str,
        port: u16,
        payload: &str,
        timeout: Duration,
    ) -> Result<String, WhoisError> {
        debug!("Querying WHOIS server {}:{}", host, port);

        // the stream is dropped, and the socket closed, on every path out of here
        match tokio::time::timeout(timeout, self.exchange(host, port, payload)).await {
            Ok(result) => result,
            Err(_) => Err(WhoisError::timeout(format!("{}:{}", host, port), timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncBufReadExt;
    use tokio::net::TcpListener;

    /// Serve one connection: read the request up to `end_marker`, reply, close.
    async fn serve_once(
        response: &'static str,
        end_marker: &'static str,
    ) -> (u16, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let mut reader = tokio::io::BufReader::new(socket);
            let mut request = String::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap() == 0 {
                    break;
                }
                request.push_str(&line);
                if line.trim_end() == end_marker {
                    break;
                }
            }
            let mut socket = reader.into_inner();
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (port, handle)
    }

    #[tokio::test]
    async fn test_query_reads_until_close() {
        let body = "AS | IP | BGP Prefix | CC | Registry | Allocated | AS Name\n\
                    15169 | 8.8.8.8 | 8.8.8.0/24 | US | arin | 2014-03-14 | GOOGLE, US\n";
        let (port, server) = serve_once(body, "end").await;

        let transport = TcpTransport::new();
        let response = transport
            .query("127.0.0.1", port, "begin\nverbose\n8.8.8.8\nend\n", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response, body);
        assert_eq!(server.await.unwrap(), "begin\nverbose\n8.8.8.8\nend\n");
    }

    #[tokio::test]
    async fn test_query_truncates_large_response() {
        let (port, _server) = serve_once("0123456789abcdef", "1.1.1.1").await;

        let transport = TcpTransport::new().with_max_response_bytes(10);
        let response = transport
            .query("127.0.0.1", port, "1.1.1.1\n", Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(response, "0123456789");
    }

    #[tokio::test]
    async fn test_query_times_out_when_server_stalls() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let accepted = tokio::time::Instant::now();
            // never answer; drain the request until the client hangs up
            let mut buffer = [0u8; 64];
            loop {
                let n = tokio::time::timeout(Duration::from_secs(10), socket.read(&mut buffer))
                    .await
                    .unwrap()
                    .unwrap();
                if n == 0 {
                    break;
                }
            }
            accepted.elapsed()
        });

        let transport = TcpTransport::new();
        let err = transport
            .query("127.0.0.1", port, "1.1.1.1\n", Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, WhoisError::Timeout { timeout_ms: 200, .. }));

        // the client side was closed when the deadline fired
        let closed_after = server.await.unwrap();
        assert!(closed_after < Duration::from_secs(5), "closed after {:?}", closed_after);
    }

    #[tokio::test]
    async fn test_query_connection_refused() {
        // grab a free port, then release it so nothing is listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transport = TcpTransport::new();
        let err = transport
            .query("127.0.0.1", port, "1.1.1.1\n", Duration::from_secs(2))
            .await
            .unwrap_err();

        assert!(matches!(err, WhoisError::Connection { .. }));
    }
}
