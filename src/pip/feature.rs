//! Decoded polygon features, independent of the file format they came from.

use geo_types::{Geometry, MultiPolygon};
use serde_json::{Map, Value};

use super::Crs;
use crate::error::{Error, Result};

/// A polygonal feature with its attribute columns
#[derive(Debug, Clone)]
pub struct RawFeature {
    pub geometry: MultiPolygon<f64>,
    pub properties: Map<String, Value>,
}

impl RawFeature {
    /// Read a property as text; numbers are rendered without quotes
    pub fn property_str(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A decoded dataset in its native reference system
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub crs: Crs,
    pub features: Vec<RawFeature>,
}

impl FeatureSet {
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            features: Vec::new(),
        }
    }

    /// Append another dataset's features; both must share a CRS
    pub fn extend(&mut self, other: FeatureSet) -> Result<()> {
        if other.crs != self.crs {
            return Err(Error::CrsMismatch(self.crs, other.crs));
        }
        self.features.extend(other.features);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// Keep the polygonal part of a geometry.
///
/// Points, lines and empty collections yield `None`.
pub fn into_multipolygon(geometry: Geometry<f64>) -> Option<MultiPolygon<f64>> {
    let polygons = match geometry {
        Geometry::Polygon(p) => vec![p],
        Geometry::MultiPolygon(mp) => mp.0,
        Geometry::Rect(r) => vec![r.to_polygon()],
        Geometry::Triangle(t) => vec![t.to_polygon()],
        Geometry::GeometryCollection(gc) => gc
            .0
            .into_iter()
            .filter_map(into_multipolygon)
            .flat_map(|mp| mp.0)
            .collect(),
        _ => return None,
    };
    if polygons.is_empty() {
        None
    } else {
        Some(MultiPolygon::new(polygons))
    }
}
