//! Test fixtures: representative JSON payloads from the FloodNet REST API.
//!
//! These are structurally complete but trimmed to a handful of records. They
//! reflect the envelopes returned by:
//!   https://api.dev.floodlabs.nyc/api/rest/deployments/flood
//!   https://api.dev.floodlabs.nyc/api/rest/deployments/flood/{id}/depth
//!
//! Deployment response shape:
//!   response.deployments[]
//!     .deployment_id        - stable identifier (three-word slug)
//!     .date_deployed        - naive ISO 8601, UTC
//!     .date_down            - null while the sensor is up
//!     .location.crs.properties.name - "EPSG:4326" in practice
//!     .location.coordinates - [longitude, latitude]
//!
//! Depth response shape:
//!   response.depth_data[]
//!     .deployment_id, .time, .depth_proc_mm
//!
//! Positions used by the spatial tests (all WGS84):
//!   daily_gentle_mayfly  Gowanus, Brooklyn        (-73.9903, 40.6752)
//!   weekly_proud_egret   Red Hook, Brooklyn       (-74.0120, 40.6780)
//!   busy_quiet_heron     Howard Beach, Queens     (-73.8370, 40.6570)
//!   lately_brave_otter   Harlem, Manhattan        (-73.9440, 40.8040), retired

/// Four deployments, one of them decommissioned.
#[cfg(test)]
pub(crate) fn fixture_deployments_json() -> &'static str {
    r#"{
      "deployments": [
        {
          "deployment_id": "daily_gentle_mayfly",
          "name": "Gowanus Canal - 3rd St",
          "date_deployed": "2021-06-15T14:30:00",
          "date_down": null,
          "deploy_type": "flood",
          "location": {
            "type": "Point",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::4326" } },
            "coordinates": [-73.9903, 40.6752]
          },
          "image": null,
          "sensor_mount": "pole",
          "mounted_over": "street",
          "sensor_status": "good"
        },
        {
          "deployment_id": "weekly_proud_egret",
          "name": "Red Hook - Van Brunt St",
          "date_deployed": "2021-08-02T10:00:00",
          "date_down": null,
          "deploy_type": "flood",
          "location": {
            "type": "Point",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::4326" } },
            "coordinates": [-74.0120, 40.6780]
          },
          "image": "https://example.invalid/egret.jpg",
          "sensor_mount": "pole",
          "mounted_over": "sidewalk",
          "sensor_status": "good"
        },
        {
          "deployment_id": "busy_quiet_heron",
          "name": "Howard Beach - 157th Ave",
          "date_deployed": "2022-02-11T09:15:00",
          "date_down": null,
          "deploy_type": "flood",
          "location": {
            "type": "Point",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::4326" } },
            "coordinates": [-73.8370, 40.6570]
          },
          "sensor_mount": "wall",
          "mounted_over": "street",
          "sensor_status": "maintenance"
        },
        {
          "deployment_id": "lately_brave_otter",
          "name": "Harlem River Dr",
          "date_deployed": "2020-11-20T12:00:00",
          "date_down": "2023-03-01T00:00:00",
          "deploy_type": "flood",
          "location": {
            "type": "Point",
            "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:EPSG::4326" } },
            "coordinates": [-73.9440, 40.8040]
          },
          "image": null,
          "sensor_mount": "pole",
          "mounted_over": "street",
          "sensor_status": "retired"
        }
      ]
    }"#
}

/// Three readings from the Gowanus sensor during the Ida peak.
#[cfg(test)]
pub(crate) fn fixture_depth_gowanus_json() -> &'static str {
    r#"{
      "depth_data": [
        { "deployment_id": "daily_gentle_mayfly", "time": "2021-09-01T23:00:00", "depth_proc_mm": 0.0 },
        { "deployment_id": "daily_gentle_mayfly", "time": "2021-09-01T23:05:00", "depth_proc_mm": 152.4 },
        { "deployment_id": "daily_gentle_mayfly", "time": "2021-09-01T23:10:00", "depth_proc_mm": 304.8 }
      ]
    }"#
}

/// Five records of which only two validate: one lacks a depth, one has an
/// unparseable time and one sends its depth as a non-numeric string.
#[cfg(test)]
pub(crate) fn fixture_depth_with_invalid_records_json() -> &'static str {
    r#"{
      "depth_data": [
        { "deployment_id": "weekly_proud_egret", "time": "2021-09-01T23:00:00", "depth_proc_mm": 12.0 },
        { "deployment_id": "weekly_proud_egret", "time": "2021-09-01T23:05:00" },
        { "deployment_id": "weekly_proud_egret", "time": "not-a-time", "depth_proc_mm": 20.0 },
        { "deployment_id": "weekly_proud_egret", "time": "2021-09-01T23:15:00", "depth_proc_mm": "deep" },
        { "deployment_id": "weekly_proud_egret", "time": "2021-09-01T23:20:00", "depth_proc_mm": 40.5 }
      ]
    }"#
}

/// What the API returns for an identifier it does not know.
#[cfg(test)]
pub(crate) fn fixture_depth_empty_json() -> &'static str {
    r#"{ "depth_data": [] }"#
}
