//! FloodNet REST API client.
//!
//! Handles URL construction and HTTP transport for the two read-only
//! endpoints the client uses:
//!   GET deployments/flood
//!   GET deployments/flood/{id}/depth?start_time=...&end_time=...
//!
//! Bodies are returned raw; turning them into typed records is the job of
//! `model::parse_deployments` and `model::parse_depth_payload`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{FloodNetError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.dev.floodlabs.nyc/api/rest/";

/// Timestamp format the depth endpoint expects (microseconds, literal `Z`).
const QUERY_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

// ---------------------------------------------------------------------------
// Transport contract
// ---------------------------------------------------------------------------

/// Raw access to the FloodNet API.
///
/// Implemented by [`HttpApi`] for the real service and by in-memory fakes in
/// tests. Implementations must be shareable across the depth worker pool.
pub trait FloodNetApi: Send + Sync {
    /// Body of `GET deployments/flood`.
    fn deployments_json(&self) -> Result<String>;

    /// Body of `GET deployments/flood/{id}/depth` for `[start, end]`.
    fn depth_json(&self, deployment_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<String>;
}

// ---------------------------------------------------------------------------
// URL construction
// ---------------------------------------------------------------------------

fn with_trailing_slash(base_url: &str) -> String {
    if base_url.ends_with('/') {
        base_url.to_string()
    } else {
        format!("{}/", base_url)
    }
}

/// Formats a query timestamp, e.g. `2021-09-01T00:00:00.000000Z`.
pub fn format_query_time(t: DateTime<Utc>) -> String {
    t.format(QUERY_TIME_FORMAT).to_string()
}

/// Builds the URL listing every flood deployment.
pub fn build_deployments_url(base_url: &str) -> String {
    format!("{}deployments/flood", with_trailing_slash(base_url))
}

/// Builds the depth URL for one deployment over `[start, end]`.
///
/// The identifier is percent-encoded as a path segment.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use floodnet_client::ingest::floodnet::build_depth_url;
///
/// let url = build_depth_url(
///     "https://api.dev.floodlabs.nyc/api/rest/",
///     "daily_gentle_mayfly",
///     Utc.with_ymd_and_hms(2021, 9, 1, 0, 0, 0).unwrap(),
///     Utc.with_ymd_and_hms(2021, 9, 2, 0, 0, 0).unwrap(),
/// );
/// assert!(url.ends_with("start_time=2021-09-01T00:00:00.000000Z&end_time=2021-09-02T00:00:00.000000Z"));
/// ```
pub fn build_depth_url(
    base_url: &str,
    deployment_id: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> String {
    format!(
        "{}deployments/flood/{}/depth?start_time={}&end_time={}",
        with_trailing_slash(base_url),
        urlencoding::encode(deployment_id),
        format_query_time(start),
        format_query_time(end)
    )
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// Blocking HTTP transport for the FloodNet API.
pub struct HttpApi {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FloodNetError::Http {
                url: base_url.to_string(),
                source: e,
            })?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get_text(&self, url: &str) -> Result<String> {
        debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| FloodNetError::Http {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FloodNetError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().map_err(|e| FloodNetError::Http {
            url: url.to_string(),
            source: e,
        })
    }
}

impl FloodNetApi for HttpApi {
    fn deployments_json(&self) -> Result<String> {
        self.get_text(&build_deployments_url(&self.base_url))
    }

    fn depth_json(&self, deployment_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<String> {
        self.get_text(&build_depth_url(&self.base_url, deployment_id, start, end))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    // --- URL construction ---------------------------------------------------

    #[test]
    fn test_build_deployments_url_targets_flood_collection() {
        let url = build_deployments_url(DEFAULT_API_BASE);
        assert_eq!(url, "https://api.dev.floodlabs.nyc/api/rest/deployments/flood");
    }

    #[test]
    fn test_build_urls_tolerate_missing_trailing_slash() {
        let url = build_deployments_url("http://localhost:8080/api/rest");
        assert_eq!(url, "http://localhost:8080/api/rest/deployments/flood");
    }

    #[test]
    fn test_build_depth_url_includes_id_and_window() {
        let start = Utc.with_ymd_and_hms(2021, 9, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 9, 2, 23, 59, 0).unwrap();
        let url = build_depth_url(DEFAULT_API_BASE, "daily_gentle_mayfly", start, end);

        assert!(
            url.contains("/deployments/flood/daily_gentle_mayfly/depth?"),
            "must target the per-deployment depth endpoint, got: {}",
            url
        );
        assert!(url.contains("start_time=2021-09-01T00:00:00.000000Z"), "got: {}", url);
        assert!(url.contains("end_time=2021-09-02T23:59:00.000000Z"), "got: {}", url);
    }

    #[test]
    fn test_build_depth_url_encodes_path_segment() {
        let start = Utc.with_ymd_and_hms(2021, 9, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2021, 9, 1, 1, 0, 0).unwrap();
        let url = build_depth_url(DEFAULT_API_BASE, "odd id/with slash", start, end);

        assert!(url.contains("/flood/odd%20id%2Fwith%20slash/depth"), "got: {}", url);
    }

    #[test]
    fn test_format_query_time_keeps_microseconds() {
        let t = Utc.with_ymd_and_hms(2021, 9, 1, 12, 30, 5).unwrap()
            + chrono::Duration::microseconds(250);
        assert_eq!(format_query_time(t), "2021-09-01T12:30:05.000250Z");
    }

    #[test]
    fn test_http_api_normalises_base_url() {
        let api = HttpApi::new("http://localhost:9/api/rest", Duration::from_secs(1))
            .expect("client should build");
        assert_eq!(api.base_url(), "http://localhost:9/api/rest/");
    }
}
