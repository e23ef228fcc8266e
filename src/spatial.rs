//! Spatial filtering of deployments against a validated [`Boundary`].
//!
//! A linear scan is enough at FloodNet's scale (tens to low hundreds of
//! deployments); the boundary's bounding rectangle rejects most outsiders
//! before the polygon test runs.

use crate::geometry::Boundary;
use crate::model::Deployment;

/// Deployments strictly inside `boundary`, in input order.
pub fn deployments_within(deployments: &[Deployment], boundary: &Boundary) -> Vec<Deployment> {
    deployments
        .iter()
        .filter(|d| boundary.contains_lon_lat(d.longitude(), d.latitude()))
        .cloned()
        .collect()
}

/// Identifiers of the deployments strictly inside `boundary`, in input order.
pub fn deployment_ids_within(deployments: &[Deployment], boundary: &Boundary) -> Vec<String> {
    deployments
        .iter()
        .filter(|d| boundary.contains_lon_lat(d.longitude(), d.latitude()))
        .map(|d| d.deployment_id.clone())
        .collect()
}
