//! GeoJSON FeatureCollection decoding.

use geojson::{FeatureCollection, GeoJson};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::pip::{into_multipolygon, Crs, FeatureSet, RawFeature};

/// Decode a FeatureCollection, keeping polygonal features only.
///
/// RFC 7946 GeoJSON is always WGS84; the legacy `crs` member is honoured
/// for older services. ArcGIS error payloads are reported as
/// [`Error::Service`].
pub fn parse_feature_collection(bytes: &[u8]) -> Result<FeatureSet> {
    let value: Value = serde_json::from_slice(bytes)?;

    if let Some(error) = value.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| error.to_string());
        return Err(Error::Service { message });
    }

    let collection = match GeoJson::from_json_value(value)? {
        GeoJson::FeatureCollection(fc) => fc,
        GeoJson::Feature(f) => FeatureCollection {
            bbox: None,
            features: vec![f],
            foreign_members: None,
        },
        GeoJson::Geometry(_) => {
            return Err(Error::Service {
                message: "expected a FeatureCollection, got a bare geometry".to_string(),
            })
        }
    };

    let crs = declared_crs(&collection)?;
    if exceeded_transfer_limit(&collection) {
        warn!(
            "Mapping service truncated the result at {} features",
            collection.features.len()
        );
    }

    let total = collection.features.len();
    let mut set = FeatureSet::new(crs);
    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        let geometry: geo_types::Geometry<f64> = match geometry.try_into() {
            Ok(g) => g,
            Err(e) => {
                debug!("Skipping feature with unconvertible geometry: {}", e);
                continue;
            }
        };
        if let Some(geometry) = into_multipolygon(geometry) {
            set.features.push(RawFeature {
                geometry,
                properties: feature.properties.unwrap_or_default(),
            });
        }
    }

    debug!("Decoded {} of {} GeoJSON features", set.len(), total);
    Ok(set)
}

fn declared_crs(collection: &FeatureCollection) -> Result<Crs> {
    let name = collection
        .foreign_members
        .as_ref()
        .and_then(|m| m.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str);
    match name {
        Some(name) => Crs::from_name(name),
        None => Ok(Crs::Wgs84),
    }
}

fn exceeded_transfer_limit(collection: &FeatureCollection) -> bool {
    let Some(members) = collection.foreign_members.as_ref() else {
        return false;
    };
    let flag = members.get("exceededTransferLimit").or_else(|| {
        members
            .get("properties")
            .and_then(|p| p.get("exceededTransferLimit"))
    });
    flag.and_then(Value::as_bool).unwrap_or(false)
}
