//! Shared data types and the record-validation layer.
//!
//! The FloodNet API returns deployments as
//! `{"deployments": [ {...}, ... ]}` and depth data as
//! `{"depth_data": [ {...}, ... ]}`. See `ingest/fixtures.rs` for annotated
//! examples of both payloads.
//!
//! Deployment parsing is all-or-nothing: a collection that does not match
//! the expected shape is a hard failure. Depth parsing is per record: a
//! record that fails validation is dropped and its siblings are kept.

use chrono::{DateTime, NaiveDateTime, Utc};
use geo::Coord;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::error::{FloodNetError, Result};
use crate::projection::Crs;

// ---------------------------------------------------------------------------
// Deployments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrsProperties {
    pub name: String,
}

/// Named CRS member as it appears on a deployment location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrsRef {
    #[serde(rename = "type")]
    pub crs_type: String,
    pub properties: CrsProperties,
}

/// GeoJSON-like point carried on every deployment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub location_type: String,
    pub crs: CrsRef,
    /// `[x, y]` in the location's CRS; exactly two elements.
    pub coordinates: [f64; 2],
}

/// A deployment record exactly as the API sends it, before coordinates are
/// derived from its location.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDeployment {
    pub deployment_id: String,
    pub name: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub date_deployed: DateTime<Utc>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub date_down: Option<DateTime<Utc>>,
    pub deploy_type: String,
    pub location: Location,
    #[serde(default)]
    pub image: Option<String>,
    pub sensor_mount: String,
    pub mounted_over: String,
    pub sensor_status: String,
}

#[derive(Debug, Deserialize)]
struct DeploymentResponse {
    deployments: Vec<RawDeployment>,
}

/// A sensor installation with its WGS84 position.
///
/// Only constructible from a [`RawDeployment`], so the longitude/latitude
/// pair always reflects the record's location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Deployment {
    pub deployment_id: String,
    pub name: String,
    pub date_deployed: DateTime<Utc>,
    pub date_down: Option<DateTime<Utc>>,
    pub deploy_type: String,
    pub location: Location,
    pub image: Option<String>,
    pub sensor_mount: String,
    pub mounted_over: String,
    pub sensor_status: String,
    longitude: f64,
    latitude: f64,
}

impl Deployment {
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// `(longitude, latitude)` in WGS84.
    pub fn lon_lat(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }

    /// True while the sensor has not been taken down.
    pub fn is_active(&self) -> bool {
        self.date_down.is_none()
    }
}

impl From<RawDeployment> for Deployment {
    fn from(raw: RawDeployment) -> Self {
        let [x, y] = raw.location.coordinates;
        let position = match raw.location.crs.properties.name.parse::<Crs>() {
            Ok(crs) => crs.to_wgs84(Coord { x, y }),
            Err(_) => {
                warn!(
                    deployment_id = %raw.deployment_id,
                    crs = %raw.location.crs.properties.name,
                    "unrecognised location CRS, assuming longitude/latitude"
                );
                Coord { x, y }
            }
        };

        Deployment {
            deployment_id: raw.deployment_id,
            name: raw.name,
            date_deployed: raw.date_deployed,
            date_down: raw.date_down,
            deploy_type: raw.deploy_type,
            location: raw.location,
            image: raw.image,
            sensor_mount: raw.sensor_mount,
            mounted_over: raw.mounted_over,
            sensor_status: raw.sensor_status,
            longitude: position.x,
            latitude: position.y,
        }
    }
}

/// Parses a `deployments/flood` response body into deployments with derived
/// coordinates.
///
/// # Errors
/// `FloodNetError::Parse` if the body is not JSON or any record does not
/// match the deployment shape.
pub fn parse_deployments(json: &str) -> Result<Vec<Deployment>> {
    let response: DeploymentResponse = serde_json::from_str(json)
        .map_err(|e| FloodNetError::Parse(format!("invalid deployments payload: {}", e)))?;

    Ok(response.deployments.into_iter().map(Deployment::from).collect())
}

// ---------------------------------------------------------------------------
// Depth readings
// ---------------------------------------------------------------------------

/// One timestamped water-depth measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepthReading {
    pub deployment_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub time: DateTime<Utc>,
    pub depth_proc_mm: f64,
}

/// Readings recovered from one depth payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DepthPayload {
    pub readings: Vec<DepthReading>,
    /// Records present in the payload that failed validation.
    pub dropped: usize,
}

/// Parses a `deployments/flood/{id}/depth` response body.
///
/// A missing `depth_data` member is treated as no readings.
///
/// # Errors
/// `FloodNetError::Parse` only when the body as a whole is not a JSON object
/// or `depth_data` is not an array; individual bad records are counted in
/// `DepthPayload::dropped` instead.
pub fn parse_depth_payload(json: &str) -> Result<DepthPayload> {
    let body: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| FloodNetError::Parse(format!("invalid depth payload: {}", e)))?;

    let object = body
        .as_object()
        .ok_or_else(|| FloodNetError::Parse("depth payload is not a JSON object".to_string()))?;

    let records = match object.get("depth_data") {
        None | Some(serde_json::Value::Null) => return Ok(DepthPayload::default()),
        Some(serde_json::Value::Array(records)) => records,
        Some(_) => {
            return Err(FloodNetError::Parse("depth_data is not an array".to_string()));
        }
    };

    let mut payload = DepthPayload::default();
    for record in records {
        match DepthReading::deserialize(record) {
            Ok(reading) if reading.depth_proc_mm.is_finite() => payload.readings.push(reading),
            Ok(reading) => {
                debug!(deployment_id = %reading.deployment_id, "skipping non-finite depth reading");
                payload.dropped += 1;
            }
            Err(e) => {
                debug!("skipping invalid reading: {}", e);
                payload.dropped += 1;
            }
        }
    }

    Ok(payload)
}

// ---------------------------------------------------------------------------
// Timestamps
// ---------------------------------------------------------------------------

/// Parses an ISO 8601 timestamp. Values with an offset are converted to
/// UTC; naive values are taken to be UTC already.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_timestamp(&s)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s)))
}

fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s))),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
