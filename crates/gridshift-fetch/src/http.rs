//! Minimal bounded-timeout HTTP GET client.
//!
//! hyper http1 over a plain TCP stream, upgraded through `rustls` (with
//! the Mozilla root store) when the URL scheme is https. The whole
//! request — connect, handshake, response body — runs under a single
//! timeout; a timeout is reported as an ordinary [`FetchError`], not a
//! distinct fatal path.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Request, StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::FetchError;

/// Reusable GET client with a fixed per-request timeout.
#[derive(Clone)]
pub struct HttpClient {
    tls: Arc<rustls::ClientConfig>,
    timeout: Duration,
}

impl HttpClient {
    /// Build a client using the Mozilla root certificate store for
    /// https endpoints.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let config = rustls::ClientConfig::builder_with_provider(
            rustls::crypto::ring::default_provider().into(),
        )
        .with_safe_default_protocol_versions()
        .map_err(|e| FetchError::Transport(format!("tls protocol version error: {e}")))?
        .with_root_certificates(root_store)
        .with_no_client_auth();

        Ok(Self {
            tls: Arc::new(config),
            timeout,
        })
    }

    /// Issue a GET with extra headers, returning the status and body.
    pub async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<(StatusCode, Bytes), FetchError> {
        let secs = self.timeout.as_secs();
        tokio::time::timeout(self.timeout, self.get_inner(url, headers))
            .await
            .map_err(|_| FetchError::Timeout(secs))?
    }

    async fn get_inner(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<(StatusCode, Bytes), FetchError> {
        let uri: Uri = url
            .parse()
            .map_err(|e| FetchError::BadUrl(format!("{url}: {e}")))?;
        let scheme = uri.scheme_str().unwrap_or("http");
        if scheme != "http" && scheme != "https" {
            return Err(FetchError::BadUrl(format!("unsupported scheme: {scheme}")));
        }

        let host = uri
            .host()
            .ok_or_else(|| FetchError::BadUrl(format!("{url}: missing host")))?
            .to_string();
        let port = uri
            .port_u16()
            .unwrap_or(if scheme == "https" { 443 } else { 80 });
        let addr = format!("{host}:{port}");
        let path = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        let mut builder = Request::builder()
            .method("GET")
            .uri(&path)
            .header("host", &host)
            .header("user-agent", "gridshift-fetch/0.1");
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let req = builder
            .body(Empty::<Bytes>::new())
            .map_err(|e| FetchError::BadUrl(e.to_string()))?;

        debug!(%addr, %path, scheme, "provider request");

        let stream = TcpStream::connect(&addr)
            .await
            .map_err(|e| FetchError::Transport(format!("connect {addr}: {e}")))?;

        if scheme == "https" {
            let server_name = rustls::pki_types::ServerName::try_from(host.clone())
                .map_err(|e| FetchError::BadUrl(format!("{host}: {e}")))?;
            let connector = tokio_rustls::TlsConnector::from(self.tls.clone());
            let tls_stream = connector
                .connect(server_name, stream)
                .await
                .map_err(|e| FetchError::Transport(format!("tls handshake: {e}")))?;
            request_over(tls_stream, req).await
        } else {
            request_over(stream, req).await
        }
    }
}

/// Send a request over an established stream and collect the body.
async fn request_over<S>(
    stream: S,
    req: Request<Empty<Bytes>>,
) -> Result<(StatusCode, Bytes), FetchError>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .map_err(|e| FetchError::Transport(format!("handshake: {e}")))?;

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let resp = sender
        .send_request(req)
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?;
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .map_err(|e| FetchError::Transport(e.to_string()))?
        .to_bytes();

    Ok((status, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    /// Serve one canned HTTP response, returning the bound address.
    async fn one_shot_server(body: &'static str, status_line: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = stream.read(&mut buf).await;
            let resp = format!(
                "{status_line}\r\ncontent-length: {}\r\ncontent-type: application/json\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(resp.as_bytes()).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn get_returns_status_and_body() {
        let base = one_shot_server("{\"ok\":true}", "HTTP/1.1 200 OK").await;
        let client = HttpClient::new(Duration::from_secs(2)).unwrap();

        let (status, body) = client.get(&format!("{base}/x"), &[]).await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(&body[..], b"{\"ok\":true}");
    }

    #[tokio::test]
    async fn get_surfaces_non_success_status() {
        let base = one_shot_server("nope", "HTTP/1.1 503 Service Unavailable").await;
        let client = HttpClient::new(Duration::from_secs(2)).unwrap();

        let (status, _) = client.get(&format!("{base}/x"), &[]).await.unwrap();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn connect_failure_is_transport_error() {
        let client = HttpClient::new(Duration::from_millis(500)).unwrap();
        let err = client.get("http://127.0.0.1:1/x", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_) | FetchError::Timeout(_)));
    }

    #[tokio::test]
    async fn unsupported_scheme_is_rejected() {
        let client = HttpClient::new(Duration::from_secs(1)).unwrap();
        let err = client.get("ftp://example.com/x", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::BadUrl(_)));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            // Never respond.
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(stream);
        });

        let client = HttpClient::new(Duration::from_millis(100)).unwrap();
        let err = client
            .get(&format!("http://{addr}/slow"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }
}
