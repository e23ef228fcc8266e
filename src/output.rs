//! GeoJSON rendering of deployments and region query results.
//!
//! Every feature is a WGS84 point with the record's fields as properties.

use std::io::Write;

use geojson::{feature::Id, Feature, FeatureCollection, Geometry, Value};
use serde::Serialize;

use crate::error::Result;
use crate::model::Deployment;
use crate::query::RegionReading;

fn point_feature<T: Serialize>(id: Option<&str>, lon: f64, lat: f64, record: &T, skip: &[&str]) -> Feature {
    let properties = match serde_json::to_value(record) {
        Ok(serde_json::Value::Object(mut map)) => {
            for key in skip {
                map.remove(*key);
            }
            Some(map)
        }
        _ => None,
    };

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![lon, lat]))),
        id: id.map(|id| Id::String(id.to_string())),
        properties,
        foreign_members: None,
    }
}

/// One feature per deployment, identified by `deployment_id`.
pub fn deployments_to_geojson(deployments: &[Deployment]) -> FeatureCollection {
    let features = deployments
        .iter()
        .map(|d| {
            point_feature(
                Some(&d.deployment_id),
                d.longitude(),
                d.latitude(),
                d,
                &["location", "longitude", "latitude"],
            )
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// One feature per row; rows without a reading carry null `time` and
/// `depth_mm`.
pub fn readings_to_geojson(rows: &[RegionReading]) -> FeatureCollection {
    let features = rows
        .iter()
        .map(|r| point_feature(None, r.longitude, r.latitude, r, &["longitude", "latitude"]))
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Writes `collection` as indented JSON followed by a newline.
pub fn write_feature_collection<W: Write>(mut writer: W, collection: &FeatureCollection) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, collection).map_err(std::io::Error::from)?;
    writeln!(writer)?;
    Ok(())
}
