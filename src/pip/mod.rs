//! Point-in-Polygon (PIP) layers.
//!
//! Reference polygons (census tracts, incentive zones) are held in R-tree
//! backed layers that remember their coordinate reference system, so query
//! points can be projected to match before the containment test.

mod crs;
mod feature;
mod index;

pub use crs::{Crs, SUPPORTED_CRS};
pub use feature::{into_multipolygon, FeatureSet, RawFeature};
pub use index::SpatialLayer;
