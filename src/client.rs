//! Base FloodNet client: deployment listing and depth retrieval.
//!
//! `FloodNetClient` owns one transport, one deployment cache and one depth
//! fetcher. Spatial queries are layered on top through the
//! [`DeploymentSource`] contract rather than by extending this type, so the
//! query layer can run against an in-memory source in tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::cache::{DeploymentCache, DeploymentSnapshot};
use crate::config::FloodNetConfig;
use crate::depth::{DepthFetcher, DepthReport};
use crate::error::Result;
use crate::ingest::floodnet::{FloodNetApi, HttpApi};
use crate::model::{Deployment, DepthReading};

/// Deployment and depth retrieval as seen by the query layer.
pub trait DeploymentSource: Send + Sync {
    /// Current deployment snapshot (cached or freshly fetched).
    fn deployments(&self) -> Result<Arc<DeploymentSnapshot>>;

    /// Per-deployment depth outcomes over `[start, end]`.
    fn depth_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        deployment_ids: Option<&[String]>,
    ) -> Result<DepthReport>;

    /// Longest accepted query window.
    fn max_window(&self) -> Duration;
}

pub struct FloodNetClient {
    cache: Arc<DeploymentCache>,
    depth: DepthFetcher,
}

impl FloodNetClient {
    /// Builds a client talking to `config.api.base_url` over HTTP.
    pub fn new(config: &FloodNetConfig) -> Result<Self> {
        config.validate()?;
        let api = HttpApi::new(&config.api.base_url, config.request_timeout())?;
        Ok(Self::with_api(Arc::new(api), config))
    }

    /// Builds a client over any transport, e.g. an in-memory fake.
    pub fn with_api(api: Arc<dyn FloodNetApi>, config: &FloodNetConfig) -> Self {
        let cache = Arc::new(DeploymentCache::new(Arc::clone(&api), config.cache_ttl()));
        let depth = DepthFetcher::new(api, Arc::clone(&cache), config.max_window())
            .with_workers(config.query.workers);
        Self { cache, depth }
    }

    /// Deployment list, served from cache while fresh.
    pub fn get_deployments(&self) -> Result<Vec<Deployment>> {
        Ok(self.cache.get(false)?.deployments().to_vec())
    }

    /// Refetches the deployment list regardless of cache age.
    pub fn refresh_deployments(&self) -> Result<Vec<Deployment>> {
        Ok(self.cache.get(true)?.deployments().to_vec())
    }

    pub fn get_deployment_ids(&self) -> Result<Vec<String>> {
        Ok(self.cache.get(false)?.deployment_ids())
    }

    /// Depth readings for `deployment_ids`, or for every deployment when
    /// `None`. See [`DepthFetcher::fetch`].
    pub fn get_depth_data(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        deployment_ids: Option<&[String]>,
    ) -> Result<Vec<DepthReading>> {
        self.depth.fetch(start, end, deployment_ids)
    }

    pub fn get_depth_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        deployment_ids: Option<&[String]>,
    ) -> Result<DepthReport> {
        self.depth.fetch_report(start, end, deployment_ids)
    }

    /// Clears the deployment cache; the next lookup refetches.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    pub fn cache(&self) -> &DeploymentCache {
        &self.cache
    }
}

impl DeploymentSource for FloodNetClient {
    fn deployments(&self) -> Result<Arc<DeploymentSnapshot>> {
        self.cache.get(false)
    }

    fn depth_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        deployment_ids: Option<&[String]>,
    ) -> Result<DepthReport> {
        self.depth.fetch_report(start, end, deployment_ids)
    }

    fn max_window(&self) -> Duration {
        self.depth.max_window()
    }
}
