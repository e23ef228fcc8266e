//! Single-slot, time-bounded cache of the full deployment list.
//!
//! ## Lifecycle
//!
//! 1. Constructed empty with the client.
//! 2. Populated by the first `get`, or by `get(true)` at any time.
//! 3. Served without network access while the snapshot is younger than the
//!    TTL.
//! 4. Cleared by `invalidate()`; the next `get` refetches.
//!
//! The slot holds an `Arc<DeploymentSnapshot>`. A refresh builds a complete
//! new snapshot and swaps the `Arc` under a short write lock, so readers see
//! either the old list or the new one, never a mix. Refreshes are serialised
//! by a separate mutex; a caller that waited on it re-checks freshness so a
//! burst of concurrent misses costs one fetch.
//!
//! A failed refresh leaves the previous snapshot in place. A refresh that
//! was in flight when `invalidate()` ran still returns its result to its
//! caller but does not store it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::error::Result;
use crate::ingest::floodnet::FloodNetApi;
use crate::model::{parse_deployments, Deployment};

/// Source of "now"; swapped out in tests.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A complete deployment list and the time it was fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentSnapshot {
    fetched_at: DateTime<Utc>,
    deployments: Vec<Deployment>,
}

impl DeploymentSnapshot {
    pub fn new(fetched_at: DateTime<Utc>, deployments: Vec<Deployment>) -> Self {
        Self {
            fetched_at,
            deployments,
        }
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn deployments(&self) -> &[Deployment] {
        &self.deployments
    }

    pub fn deployment_ids(&self) -> Vec<String> {
        self.deployments.iter().map(|d| d.deployment_id.clone()).collect()
    }

    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now - self.fetched_at
    }

    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

pub struct DeploymentCache {
    api: Arc<dyn FloodNetApi>,
    ttl: Duration,
    clock: Clock,
    slot: RwLock<Option<Arc<DeploymentSnapshot>>>,
    refresh_lock: Mutex<()>,
    /// Bumped by `invalidate`, under the slot write lock.
    generation: AtomicU64,
}

impl DeploymentCache {
    pub fn new(api: Arc<dyn FloodNetApi>, ttl: Duration) -> Self {
        Self::with_clock(api, ttl, Arc::new(Utc::now))
    }

    pub fn with_clock(api: Arc<dyn FloodNetApi>, ttl: Duration, clock: Clock) -> Self {
        Self {
            api,
            ttl,
            clock,
            slot: RwLock::new(None),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Current snapshot, if any, without fetching (fresh or not).
    pub fn peek(&self) -> Option<Arc<DeploymentSnapshot>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the cached snapshot while it is fresh, otherwise fetches a
    /// new one. `force_refresh` always fetches.
    ///
    /// # Errors
    /// Transport or parse failures of the deployment collection. The
    /// existing snapshot is kept when this happens.
    pub fn get(&self, force_refresh: bool) -> Result<Arc<DeploymentSnapshot>> {
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot() {
                return Ok(snapshot);
            }
        }

        let _refreshing = self
            .refresh_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Another caller may have refreshed while we waited.
        if !force_refresh {
            if let Some(snapshot) = self.fresh_snapshot() {
                return Ok(snapshot);
            }
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let snapshot = Arc::new(self.fetch()?);

        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) == generation {
            *slot = Some(Arc::clone(&snapshot));
        } else {
            info!("cache invalidated during refresh; not storing fetched snapshot");
        }
        Ok(snapshot)
    }

    /// Drops the cached snapshot without fetching.
    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        self.generation.fetch_add(1, Ordering::SeqCst);
        if slot.take().is_some() {
            info!("deployment cache invalidated");
        }
    }

    fn fresh_snapshot(&self) -> Option<Arc<DeploymentSnapshot>> {
        let now = (self.clock)();
        self.peek().filter(|s| s.is_fresh(now, self.ttl))
    }

    fn fetch(&self) -> Result<DeploymentSnapshot> {
        info!("fetching deployment data from API");

        let deployments = self
            .api
            .deployments_json()
            .and_then(|body| parse_deployments(&body))
            .inspect_err(|e| warn!("error fetching deployments: {}", e))?;

        info!("processed {} deployment records", deployments.len());
        Ok(DeploymentSnapshot::new((self.clock)(), deployments))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
