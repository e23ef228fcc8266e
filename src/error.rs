//! Error type shared by every layer of the client.
//!
//! Variants fall into four groups that callers handle differently:
//! - precondition errors (`InvalidTimeRange`, `WindowTooLarge`,
//!   `InvalidRegion`, `UnsupportedCrs`) are raised before any network access;
//! - `GeometryRepair` means a region could not be turned into a valid, simple
//!   polygon;
//! - transport and parse errors (`Http`, `Status`, `Parse`) are fatal for the
//!   bulk deployment fetch but only recorded for a single deployment's depth
//!   fetch;
//! - `Config` and `Io` come from loading configuration or region files.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FloodNetError {
    #[error("start_time must be before end_time (start {start}, end {end})")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error(
        "time range of {} exceeds the maximum of {}",
        format_span(.requested),
        format_span(.max)
    )]
    WindowTooLarge { requested: Duration, max: Duration },

    #[error("invalid region: {0}")]
    InvalidRegion(String),

    #[error("unsupported coordinate reference system: {0}")]
    UnsupportedCrs(String),

    #[error("could not create a valid, simple geometry: {0}")]
    GeometryRepair(String),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FloodNetError {
    pub(crate) fn window_too_large(requested: Duration, max: Duration) -> Self {
        FloodNetError::WindowTooLarge { requested, max }
    }

    /// True for errors raised by argument checks before any network access.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            FloodNetError::InvalidTimeRange { .. }
                | FloodNetError::WindowTooLarge { .. }
                | FloodNetError::InvalidRegion(_)
                | FloodNetError::UnsupportedCrs(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, FloodNetError>;

/// Renders a span as hours, then minutes and seconds only when present,
/// e.g. `168h`, `168h30m`, `168h0m0.5s`.
fn format_span(span: &Duration) -> String {
    let hours = span.num_hours();
    let rest = *span - Duration::hours(hours);
    let minutes = rest.num_minutes();
    let rest = rest - Duration::minutes(minutes);
    let micros = rest.num_microseconds().unwrap_or(0);

    match (minutes, micros) {
        (0, 0) => format!("{}h", hours),
        (m, 0) => format!("{}h{}m", hours, m),
        (m, us) => format!("{}h{}m{}s", hours, m, us as f64 / 1_000_000.0),
    }
}
