//! Region-scoped queries: which deployments lie in an area, and what they
//! measured over a time window.
//!
//! A query runs in a fixed order: time window check, region validation,
//! deployment lookup, spatial filter, depth fetch, join. Everything before
//! the depth fetch aborts the call on failure; the fetch itself never fails
//! because of a single deployment.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::client::DeploymentSource;
use crate::depth::TimeWindow;
use crate::error::Result;
use crate::geometry::{validate, Region};
use crate::model::{Deployment, DepthReading};
use crate::spatial::deployments_within;

/// How readings are joined back onto region-matched deployments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinPolicy {
    /// Every matched deployment appears; one row without time or depth when
    /// it has no readings.
    #[default]
    Left,
    /// Only deployments that produced readings appear.
    Inner,
}

/// One row of a region query: a deployment's identity and position plus
/// one of its readings, if any.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionReading {
    pub deployment_id: String,
    pub longitude: f64,
    pub latitude: f64,
    pub time: Option<DateTime<Utc>>,
    pub depth_mm: Option<f64>,
}

impl RegionReading {
    fn with_reading(deployment: &Deployment, reading: &DepthReading) -> Self {
        Self {
            deployment_id: deployment.deployment_id.clone(),
            longitude: deployment.longitude(),
            latitude: deployment.latitude(),
            time: Some(reading.time),
            depth_mm: Some(reading.depth_proc_mm),
        }
    }

    fn without_reading(deployment: &Deployment) -> Self {
        Self {
            deployment_id: deployment.deployment_id.clone(),
            longitude: deployment.longitude(),
            latitude: deployment.latitude(),
            time: None,
            depth_mm: None,
        }
    }
}

/// Spatial queries over any [`DeploymentSource`].
pub struct SpatialQuery<S> {
    source: S,
    join: JoinPolicy,
}

impl<S: DeploymentSource> SpatialQuery<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            join: JoinPolicy::default(),
        }
    }

    pub fn with_join(mut self, join: JoinPolicy) -> Self {
        self.join = join;
        self
    }

    pub fn join_policy(&self) -> JoinPolicy {
        self.join
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Deployments strictly inside `region`, in source order.
    pub fn deployments_in_region(&self, region: &Region) -> Result<Vec<Deployment>> {
        let boundary = validate(region)?;
        let snapshot = self.source.deployments()?;
        Ok(deployments_within(snapshot.deployments(), &boundary))
    }

    /// Readings over `[start, end]` for every deployment inside `region`,
    /// joined onto deployment positions with the configured [`JoinPolicy`].
    ///
    /// Rows are grouped by deployment in source order, readings in the
    /// order the API returned them.
    pub fn readings_in_region(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        region: &Region,
    ) -> Result<Vec<RegionReading>> {
        TimeWindow::new(start, end, self.source.max_window())?;

        let matched = self.deployments_in_region(region)?;
        info!("{} deployments inside region", matched.len());
        if matched.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = matched.iter().map(|d| d.deployment_id.clone()).collect();
        let readings = self.source.depth_report(start, end, Some(&ids))?.into_readings();

        Ok(join_readings(&matched, readings, self.join))
    }
}

fn join_readings(deployments: &[Deployment], readings: Vec<DepthReading>, join: JoinPolicy) -> Vec<RegionReading> {
    let mut by_id: HashMap<String, Vec<DepthReading>> = HashMap::new();
    for reading in readings {
        by_id.entry(reading.deployment_id.clone()).or_default().push(reading);
    }

    let mut rows = Vec::new();
    for deployment in deployments {
        match by_id.get(&deployment.deployment_id) {
            Some(readings) if !readings.is_empty() => {
                rows.extend(readings.iter().map(|r| RegionReading::with_reading(deployment, r)));
            }
            _ => {
                if join == JoinPolicy::Left {
                    rows.push(RegionReading::without_reading(deployment));
                }
            }
        }
    }
    rows
}
