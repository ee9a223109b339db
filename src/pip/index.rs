//! Spatial index for fast point-in-polygon lookups.

use geo::{BoundingRect, Contains, MultiPolygon, Point};
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

use super::Crs;

/// Wrapper for R-tree indexing of one polygon feature
pub struct IndexedFeature<T> {
    /// Load order, used to break ties between overlapping polygons
    ordinal: usize,
    geometry: MultiPolygon<f64>,
    attrs: T,
    envelope: AABB<[f64; 2]>,
}

impl<T> RTreeObject for IndexedFeature<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl<T> IndexedFeature<T> {
    fn new(ordinal: usize, geometry: MultiPolygon<f64>, attrs: T) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        Some(Self {
            ordinal,
            envelope: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
            geometry,
            attrs,
        })
    }
}

/// Polygon layer in a single reference system, backed by an R-tree.
///
/// Containment is strict: a point on a polygon edge is not inside it.
pub struct SpatialLayer<T> {
    crs: Crs,
    tree: RTree<IndexedFeature<T>>,
}

impl<T> SpatialLayer<T> {
    /// Build the index; features with empty geometry are skipped
    pub fn build<I>(crs: Crs, features: I) -> Self
    where
        I: IntoIterator<Item = (MultiPolygon<f64>, T)>,
    {
        let indexed: Vec<IndexedFeature<T>> = features
            .into_iter()
            .enumerate()
            .filter_map(|(ordinal, (geometry, attrs))| {
                IndexedFeature::new(ordinal, geometry, attrs)
            })
            .collect();

        let tree = RTree::bulk_load(indexed);
        debug!("Spatial layer built with {} entries ({})", tree.size(), crs);

        Self { crs, tree }
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Attributes of the earliest-loaded polygon containing `point`.
    ///
    /// `point` must already be in this layer's CRS.
    pub fn first_containing(&self, point: Point<f64>) -> Option<&T> {
        self.candidates(point)
            .filter(|f| f.geometry.contains(&point))
            .min_by_key(|f| f.ordinal)
            .map(|f| &f.attrs)
    }

    /// Whether any polygon contains `point` (already in this layer's CRS)
    pub fn contains(&self, point: Point<f64>) -> bool {
        self.candidates(point).any(|f| f.geometry.contains(&point))
    }

    /// Project a WGS84 point into this layer's CRS and test containment
    pub fn contains_wgs84(&self, point: Point<f64>) -> bool {
        self.contains(self.crs.project(point))
    }

    fn candidates(&self, point: Point<f64>) -> impl Iterator<Item = &IndexedFeature<T>> {
        let query_envelope = AABB::from_point([point.x(), point.y()]);
        self.tree.locate_in_envelope_intersecting(&query_envelope)
    }

    /// Get total number of indexed polygons
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square(x0: f64, y0: f64, size: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + size, y: y0),
            (x: x0 + size, y: y0 + size),
            (x: x0, y: y0 + size),
        ]])
    }

    #[test]
    fn test_empty_layer() {
        let layer: SpatialLayer<()> = SpatialLayer::build(Crs::Wgs84, vec![]);
        assert!(layer.is_empty());
        assert!(!layer.contains(Point::new(0.5, 0.5)));
        assert!(layer.first_containing(Point::new(0.5, 0.5)).is_none());
    }

    #[test]
    fn test_lookup_picks_containing_polygon() {
        let layer = SpatialLayer::build(
            Crs::Nad83,
            vec![(square(0.0, 0.0, 1.0), "a"), (square(2.0, 0.0, 1.0), "b")],
        );
        assert_eq!(layer.len(), 2);
        assert_eq!(layer.first_containing(Point::new(2.5, 0.5)), Some(&"b"));
        assert_eq!(layer.first_containing(Point::new(1.5, 0.5)), None);
    }

    #[test]
    fn test_boundary_is_outside() {
        let layer = SpatialLayer::build(Crs::Wgs84, vec![(square(0.0, 0.0, 1.0), ())]);
        assert!(!layer.contains(Point::new(1.0, 0.5)));
        assert!(layer.contains(Point::new(0.999, 0.5)));
    }

    #[test]
    fn test_overlap_prefers_first_loaded() {
        let layer = SpatialLayer::build(
            Crs::Wgs84,
            vec![
                (square(0.0, 0.0, 2.0), 1),
                (square(0.5, 0.5, 1.0), 2),
                (square(0.0, 0.0, 3.0), 3),
            ],
        );
        for _ in 0..3 {
            assert_eq!(layer.first_containing(Point::new(1.0, 1.0)), Some(&1));
        }
    }

    #[test]
    fn test_empty_geometry_skipped() {
        let layer = SpatialLayer::build(
            Crs::Wgs84,
            vec![(MultiPolygon::new(vec![]), 0), (square(0.0, 0.0, 1.0), 1)],
        );
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.first_containing(Point::new(0.5, 0.5)), Some(&1));
    }

    #[test]
    fn test_contains_wgs84_projects() {
        // Square around Denver in Web Mercator meters
        let layer = SpatialLayer::build(
            Crs::WebMercator,
            vec![(square(-11_700_000.0, 4_820_000.0, 20_000.0), ())],
        );
        assert!(layer.contains_wgs84(Point::new(-104.99, 39.74)));
        assert!(!layer.contains(Point::new(-104.99, 39.74)));
    }
}
