//! Per-deployment depth retrieval over a bounded time window.
//!
//! Each deployment id gets one request. Everything that can go wrong for a
//! single id (transport failure, an unparseable body, an unknown id, bad
//! records) is contained in that id's [`DeploymentDepth`] outcome; the call
//! as a whole only fails on its preconditions, which are checked before any
//! network access.
//!
//! Requests run on a `threadpool` when more than one worker is configured.
//! Results are collected over a channel tagged with the input index and put
//! back in input order, so the output does not depend on scheduling.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use threadpool::ThreadPool;
use tracing::{debug, info, warn};

use crate::cache::DeploymentCache;
use crate::error::{FloodNetError, Result};
use crate::ingest::floodnet::FloodNetApi;
use crate::model::{parse_depth_payload, DepthReading};

pub const DEFAULT_WORKERS: usize = 8;

// ---------------------------------------------------------------------------
// Time window
// ---------------------------------------------------------------------------

/// A checked `[start, end]` query window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// # Errors
    /// `InvalidTimeRange` unless `start < end`; `WindowTooLarge` if the span
    /// exceeds `max_window`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, max_window: Duration) -> Result<Self> {
        if start >= end {
            return Err(FloodNetError::InvalidTimeRange { start, end });
        }
        let span = end - start;
        if span > max_window {
            return Err(FloodNetError::window_too_large(span, max_window));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    /// Inclusive at both ends.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What one deployment contributed to a depth query.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentDepth {
    pub deployment_id: String,
    pub readings: Vec<DepthReading>,
    /// Records in the payload that failed validation.
    pub dropped_records: usize,
    /// Valid records stamped outside the requested window.
    pub outside_window: usize,
    /// Set when the request or the payload as a whole failed.
    pub error: Option<String>,
}

impl DeploymentDepth {
    fn empty(deployment_id: &str) -> Self {
        Self {
            deployment_id: deployment_id.to_string(),
            readings: Vec::new(),
            dropped_records: 0,
            outside_window: 0,
            error: None,
        }
    }

    fn failed(deployment_id: &str, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(deployment_id)
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-deployment outcomes of one query, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthReport {
    pub window: TimeWindow,
    pub outcomes: Vec<DeploymentDepth>,
}

impl DepthReport {
    pub fn failed_ids(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failure())
            .map(|o| o.deployment_id.as_str())
            .collect()
    }

    pub fn total_readings(&self) -> usize {
        self.outcomes.iter().map(|o| o.readings.len()).sum()
    }

    /// All readings, concatenated in input-id order.
    pub fn into_readings(self) -> Vec<DepthReading> {
        self.outcomes.into_iter().flat_map(|o| o.readings).collect()
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

pub struct DepthFetcher {
    api: Arc<dyn FloodNetApi>,
    cache: Arc<DeploymentCache>,
    max_window: Duration,
    workers: usize,
}

impl DepthFetcher {
    pub fn new(api: Arc<dyn FloodNetApi>, cache: Arc<DeploymentCache>, max_window: Duration) -> Self {
        Self {
            api,
            cache,
            max_window,
            workers: DEFAULT_WORKERS,
        }
    }

    /// Number of concurrent requests; `1` runs them one after another.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn max_window(&self) -> Duration {
        self.max_window
    }

    /// Readings for `deployment_ids` (or every current deployment when
    /// `None`) over `[start, end]`.
    ///
    /// # Errors
    /// Only precondition failures, and a failed deployment lookup when ids
    /// are resolved from the cache. Per-deployment failures yield no readings
    /// for that deployment.
    pub fn fetch(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        deployment_ids: Option<&[String]>,
    ) -> Result<Vec<DepthReading>> {
        Ok(self.fetch_report(start, end, deployment_ids)?.into_readings())
    }

    /// Like [`fetch`](Self::fetch), keeping each deployment's outcome.
    pub fn fetch_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        deployment_ids: Option<&[String]>,
    ) -> Result<DepthReport> {
        let window = TimeWindow::new(start, end, self.max_window)?;

        let ids: Vec<String> = match deployment_ids {
            Some(ids) => ids.to_vec(),
            None => self.cache.get(false)?.deployment_ids(),
        };

        if ids.is_empty() {
            debug!("no deployment ids to fetch");
            return Ok(DepthReport {
                window,
                outcomes: Vec::new(),
            });
        }

        info!(
            "fetching depth data for {} deployments from {} to {}",
            ids.len(),
            window.start(),
            window.end()
        );

        let outcomes = if self.workers <= 1 || ids.len() == 1 {
            ids.iter()
                .map(|id| fetch_isolated(self.api.as_ref(), id, &window))
                .collect()
        } else {
            self.fetch_parallel(&ids, window)
        };

        let report = DepthReport { window, outcomes };
        let failed = report.failed_ids();
        if !failed.is_empty() {
            warn!("depth fetch failed for {} of {} deployments", failed.len(), ids.len());
        }
        info!("retrieved {} depth readings", report.total_readings());

        Ok(report)
    }

    fn fetch_parallel(&self, ids: &[String], window: TimeWindow) -> Vec<DeploymentDepth> {
        let pool = ThreadPool::new(self.workers.min(ids.len()));
        let (tx, rx) = mpsc::channel();

        for (index, id) in ids.iter().enumerate() {
            let tx = tx.clone();
            let api = Arc::clone(&self.api);
            let id = id.clone();

            pool.execute(move || {
                let _ = tx.send((index, fetch_isolated(api.as_ref(), &id, &window)));
            });
        }
        drop(tx);

        let mut slots: Vec<Option<DeploymentDepth>> = vec![None; ids.len()];
        for (index, outcome) in rx {
            slots[index] = Some(outcome);
        }

        slots
            .into_iter()
            .zip(ids)
            .map(|(slot, id)| {
                slot.unwrap_or_else(|| DeploymentDepth::failed(id, "depth worker returned no result"))
            })
            .collect()
    }
}

/// Runs [`fetch_one`], turning a panic into a failure for this id only.
fn fetch_isolated(api: &dyn FloodNetApi, deployment_id: &str, window: &TimeWindow) -> DeploymentDepth {
    panic::catch_unwind(AssertUnwindSafe(|| fetch_one(api, deployment_id, window))).unwrap_or_else(|_| {
        warn!(deployment_id, "depth request panicked");
        DeploymentDepth::failed(deployment_id, "depth request panicked")
    })
}

fn fetch_one(api: &dyn FloodNetApi, deployment_id: &str, window: &TimeWindow) -> DeploymentDepth {
    let payload = api
        .depth_json(deployment_id, window.start(), window.end())
        .and_then(|body| parse_depth_payload(&body));

    let payload = match payload {
        Ok(payload) => payload,
        Err(e) => {
            warn!(deployment_id, "error fetching depth data: {}", e);
            return DeploymentDepth::failed(deployment_id, e.to_string());
        }
    };

    let mut outcome = DeploymentDepth::empty(deployment_id);
    outcome.dropped_records = payload.dropped;
    for reading in payload.readings {
        if window.contains(reading.time) {
            outcome.readings.push(reading);
        } else {
            outcome.outside_window += 1;
        }
    }

    if outcome.dropped_records > 0 || outcome.outside_window > 0 {
        debug!(
            deployment_id,
            dropped = outcome.dropped_records,
            outside_window = outcome.outside_window,
            "discarded depth records"
        );
    }
    outcome
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
