//! Prometheus instant-query client.
//!
//! Asks the backend for the latest sample of a metric filtered by zone
//! label. Only the first returned series is used; an empty result set
//! is "no data", not an error.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use gridshift_fetch::http::HttpClient;
use gridshift_fetch::FetchError;

/// Failure querying the time-series backend for one zone. The caller
/// treats the zone as absent; other zones are unaffected.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("backend transport error: {0}")]
    Transport(String),

    #[error("backend returned status {0}")]
    Status(u16),

    #[error("malformed backend response: {0}")]
    Malformed(String),

    #[error("backend query timed out after {0}s")]
    Timeout(u64),
}

impl From<FetchError> for QueryError {
    fn from(e: FetchError) -> Self {
        match e {
            FetchError::Status(code) => QueryError::Status(code),
            FetchError::Malformed(msg) => QueryError::Malformed(msg),
            FetchError::Timeout(secs) => QueryError::Timeout(secs),
            FetchError::Transport(msg) | FetchError::BadUrl(msg) => QueryError::Transport(msg),
        }
    }
}

#[derive(Deserialize)]
struct PromResponse {
    status: String,
    #[serde(default)]
    data: PromData,
}

#[derive(Deserialize, Default)]
struct PromData {
    #[serde(default)]
    result: Vec<PromSeries>,
}

#[derive(Deserialize)]
struct PromSeries {
    /// Instant-query sample: `[timestamp, "value"]`.
    value: (f64, String),
}

/// Client for the backend's instant-query interface.
#[derive(Clone)]
pub struct PromClient {
    base_url: String,
    http: HttpClient,
}

impl PromClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, QueryError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: HttpClient::new(timeout).map_err(QueryError::from)?,
        })
    }

    /// Base URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Latest sample of `metric{zone="<zone>"}`.
    ///
    /// `Ok(None)` means the backend answered but has no series for the
    /// zone (or reported a non-success query status); `Err` means the
    /// query itself failed.
    pub async fn instant_query(
        &self,
        metric: &str,
        zone: &str,
    ) -> Result<Option<f64>, QueryError> {
        let expr = format!("{metric}{{zone=\"{zone}\"}}");
        let url = format!(
            "{}/api/v1/query?query={}",
            self.base_url,
            percent_encode(&expr)
        );

        let (status, body) = self.http.get(&url, &[]).await?;
        if !status.is_success() {
            return Err(QueryError::Status(status.as_u16()));
        }

        let payload: PromResponse = serde_json::from_slice(&body)
            .map_err(|e| QueryError::Malformed(format!("invalid json: {e}")))?;
        if payload.status != "success" {
            debug!(zone, status = %payload.status, "backend reported non-success query status");
            return Ok(None);
        }

        let Some(series) = payload.data.result.first() else {
            return Ok(None);
        };
        let value = series
            .value
            .1
            .parse::<f64>()
            .map_err(|e| QueryError::Malformed(format!("non-numeric sample: {e}")))?;

        Ok(Some(value))
    }
}

/// Percent-encode a query expression for use in a URL query parameter.
fn percent_encode(s: &str) -> String {
    let mut out = String::with_capacity(s.len() * 3);
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn prom_stub(body: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let n = stream.read(&mut buf).await.unwrap();
            let req = String::from_utf8_lossy(&buf[..n]).to_string();
            assert!(req.contains("/api/v1/query?query="), "unexpected path: {req}");
            let resp = format!(
                "HTTP/1.1 200 OK\r\ncontent-length: {}\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(resp.as_bytes()).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn percent_encoding_covers_promql_metacharacters() {
        assert_eq!(
            percent_encode("m{zone=\"AT\"}"),
            "m%7Bzone%3D%22AT%22%7D"
        );
        assert_eq!(percent_encode("carbon_intensity"), "carbon_intensity");
    }

    #[tokio::test]
    async fn first_series_sample_is_used() {
        let base = prom_stub(
            "{\"status\":\"success\",\"data\":{\"resultType\":\"vector\",\"result\":[\
             {\"metric\":{\"zone\":\"AT\"},\"value\":[1700000000.0,\"180.5\"]},\
             {\"metric\":{\"zone\":\"AT\"},\"value\":[1700000000.0,\"999\"]}]}}",
        )
        .await;
        let client = PromClient::new(&base, Duration::from_secs(2)).unwrap();

        let value = client.instant_query("ci", "AT").await.unwrap();
        assert_eq!(value, Some(180.5));
    }

    #[tokio::test]
    async fn empty_result_is_no_data() {
        let base = prom_stub("{\"status\":\"success\",\"data\":{\"result\":[]}}").await;
        let client = PromClient::new(&base, Duration::from_secs(2)).unwrap();

        let value = client.instant_query("ci", "XX").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn non_success_query_status_is_no_data() {
        let base = prom_stub("{\"status\":\"error\",\"error\":\"bad expr\"}").await;
        let client = PromClient::new(&base, Duration::from_secs(2)).unwrap();

        let value = client.instant_query("ci", "AT").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn garbage_body_is_malformed() {
        let base = prom_stub("<html>504</html>").await;
        let client = PromClient::new(&base, Duration::from_secs(2)).unwrap();

        let err = client.instant_query("ci", "AT").await.unwrap_err();
        assert!(matches!(err, QueryError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() {
        let client = PromClient::new("http://127.0.0.1:1", Duration::from_millis(300)).unwrap();
        let err = client.instant_query("ci", "AT").await.unwrap_err();
        assert!(matches!(err, QueryError::Transport(_) | QueryError::Timeout(_)));
    }
}
