//! Carbon-intensity provider client.
//!
//! Queries the provider's latest-intensity endpoint for a single zone.
//! The network access sits behind the [`IntensityProvider`] trait so the
//! fetcher can be exercised with a scripted provider in tests.

use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::error::FetchError;
use crate::http::HttpClient;

/// Boxed future returned by [`IntensityProvider::latest`].
pub type IntensityFuture = Pin<Box<dyn Future<Output = Result<f64, FetchError>> + Send + 'static>>;

/// Source of a zone's current carbon intensity.
pub trait IntensityProvider: Send + Sync {
    /// Latest intensity (gCO2eq/kWh) for a zone.
    fn latest(&self, zone: &str) -> IntensityFuture;
}

/// HTTP client for the carbon-intensity provider API.
///
/// `GET <base>/carbon-intensity/latest?zone=<Z>` with an `auth-token`
/// header; the response body is JSON with a numeric `carbonIntensity`
/// field. Non-2xx, timeout, or a malformed body is a [`FetchError`].
#[derive(Clone)]
pub struct ProviderClient {
    base_url: String,
    token: String,
    http: HttpClient,
}

impl ProviderClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, FetchError> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http: HttpClient::new(timeout)?,
        })
    }

    async fn fetch_latest(&self, zone: String) -> Result<f64, FetchError> {
        let url = format!("{}/carbon-intensity/latest?zone={zone}", self.base_url);
        let headers = [("auth-token".to_string(), self.token.clone())];

        let (status, body) = self.http.get(&url, &headers).await?;
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let payload: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| FetchError::Malformed(format!("invalid json: {e}")))?;
        let value = payload
            .get("carbonIntensity")
            .and_then(|v| v.as_f64())
            .ok_or_else(|| {
                FetchError::Malformed("missing numeric carbonIntensity field".to_string())
            })?;

        debug!(%zone, value, "provider intensity fetched");
        Ok(value)
    }
}

impl IntensityProvider for ProviderClient {
    fn latest(&self, zone: &str) -> IntensityFuture {
        let client = self.clone();
        let zone = zone.to_string();
        Box::pin(async move { client.fetch_latest(zone).await })
    }
}
