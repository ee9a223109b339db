//! Census tract polygons for the selected states.

use std::sync::Arc;

use geo::Point;
use tracing::{info, warn};

use crate::config::DatasetConfig;
use crate::error::{Error, Result};
use crate::fetch::{DatasetRepository, MemoCache, RetryPolicy};
use crate::models::geoid::normalize_geoid;
use crate::models::State;
use crate::pip::{FeatureSet, SpatialLayer};

/// Attribute columns read from tract files
const TRACT_COLUMNS: &[&str] = &["GEOID"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tract {
    pub geoid: String,
}

/// Tracts of one state
pub type TractLayer = SpatialLayer<Tract>;

/// Build a tract layer, dropping features without a usable GEOID.
///
/// Feature order is kept, so where tracts overlap the one loaded first wins.
pub fn tract_layer(set: FeatureSet) -> TractLayer {
    let mut skipped = 0usize;
    let tracts: Vec<_> = set
        .features
        .into_iter()
        .filter_map(|feature| {
            let geoid = feature
                .property_str("GEOID")
                .and_then(|g| normalize_geoid(&g));
            if geoid.is_none() {
                skipped += 1;
            }
            geoid.map(|geoid| (feature.geometry, Tract { geoid }))
        })
        .collect();

    if skipped > 0 {
        warn!("Skipped {} tract features without a GEOID", skipped);
    }
    SpatialLayer::build(set.crs, tracts)
}

/// Per-state tract layers of one request, searched in FIPS order
#[derive(Clone, Default)]
pub struct TractSet {
    layers: Vec<Arc<TractLayer>>,
}

impl TractSet {
    pub fn new(layers: Vec<Arc<TractLayer>>) -> Self {
        Self { layers }
    }

    /// Tract containing a WGS84 point; earlier layers win
    pub fn locate(&self, point: Point<f64>) -> Option<&Tract> {
        self.layers
            .iter()
            .find_map(|layer| layer.first_containing(layer.crs().project(point)))
    }

    pub fn len(&self) -> usize {
        self.layers.iter().map(|layer| layer.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|layer| layer.is_empty())
    }
}

impl From<TractLayer> for TractSet {
    fn from(layer: TractLayer) -> Self {
        Self::new(vec![Arc::new(layer)])
    }
}

/// Downloads per-state tract files, memoized by state
pub struct TractLoader {
    repository: Arc<DatasetRepository>,
    retry: RetryPolicy,
    dataset: DatasetConfig,
    cache: MemoCache<&'static str, TractLayer>,
}

impl TractLoader {
    pub fn new(repository: Arc<DatasetRepository>, retry: RetryPolicy, dataset: DatasetConfig) -> Self {
        Self {
            repository,
            retry,
            dataset,
            cache: MemoCache::new(),
        }
    }

    /// Tracts covering every given state.
    ///
    /// Any state whose file cannot be loaded fails the whole call.
    pub async fn load(&self, states: &[&'static State]) -> Result<TractSet> {
        let mut fips_codes: Vec<&'static str> = states.iter().map(|s| s.fips).collect();
        fips_codes.sort_unstable();
        fips_codes.dedup();
        if fips_codes.is_empty() {
            return Err(Error::NoStatesSelected);
        }

        let mut layers = Vec::with_capacity(fips_codes.len());
        for fips in fips_codes {
            let layer = self
                .cache
                .get_or_try_load(fips, || self.load_state(fips))
                .await
                .map_err(|e| Error::TractLoad {
                    fips: fips.to_string(),
                    source: Box::new(e),
                })?;
            layers.push(layer);
        }

        Ok(TractSet::new(layers))
    }

    async fn load_state(&self, fips: &str) -> Result<TractLayer> {
        let filename = self.dataset.tract_file_for(fips);
        let set = self
            .retry
            .run(&filename, || {
                self.repository.fetch_features(&filename, TRACT_COLUMNS)
            })
            .await?;
        let layer = tract_layer(set);
        info!("Indexed {} tracts for state {} from {}", layer.len(), fips, filename);
        Ok(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::HttpFetcher;
    use crate::pip::Crs;
    use geo::polygon;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn tract_body(geoid: &str, x0: f64, y0: f64) -> String {
        format!(
            r#"{{"type":"FeatureCollection","features":[{{"type":"Feature",
            "properties":{{"GEOID":"{geoid}","NAMELSAD":"Census Tract 1"}},
            "geometry":{{"type":"Polygon","coordinates":[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]}}}}]}}"#,
            geoid = geoid,
            x0 = x0,
            y0 = y0,
            x1 = x0 + 1.0,
            y1 = y0 + 1.0
        )
    }

    fn loader(server: &MockServer) -> TractLoader {
        let http = HttpFetcher::new("tractlookup-test", Duration::from_secs(5)).unwrap();
        let dataset = DatasetConfig {
            base_url: server.uri(),
            tract_file: "tl_2024_{fips}_tract.geojson".to_string(),
            ..DatasetConfig::default()
        };
        let repository = Arc::new(DatasetRepository::new(http, &dataset).unwrap());
        TractLoader::new(repository, RetryPolicy::new(2, Duration::from_millis(1)), dataset)
    }

    async fn mount_tracts(server: &MockServer, fips: &str, body: String, times: u64) {
        Mock::given(method("GET"))
            .and(path(format!(
                "/datasets/MMNASH10/my-parquet-dataset/resolve/main/tl_2024_{}_tract.geojson",
                fips
            )))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(times)
            .mount(server)
            .await;
    }

    #[test]
    fn test_tract_layer_skips_missing_geoid() {
        let mut set =
            crate::fetch::parse_feature_collection(tract_body("8031000100", 0.0, 0.0).as_bytes())
                .unwrap();
        let mut unnamed = set.features[0].clone();
        unnamed.properties.remove("GEOID");
        set.features.push(unnamed);

        let layer = tract_layer(set);
        assert_eq!(layer.len(), 1);
        let tract = layer.first_containing(Point::new(0.5, 0.5)).unwrap();
        assert_eq!(tract.geoid, "08031000100");
    }

    #[test]
    fn test_tract_set_projects_per_layer_and_keeps_order() {
        let square = |x0: f64, y0: f64, size: f64| {
            geo::MultiPolygon(vec![geo::polygon![
                (x: x0, y: y0),
                (x: x0 + size, y: y0),
                (x: x0 + size, y: y0 + size),
                (x: x0, y: y0 + size),
                (x: x0, y: y0),
            ]])
        };
        let tract = |geoid: &str| Tract {
            geoid: geoid.to_string(),
        };
        let denver = Crs::WebMercator.project(Point::new(-104.99, 39.74));
        let mercator: TractLayer = SpatialLayer::build(
            Crs::WebMercator,
            vec![(
                square(denver.x() - 1000.0, denver.y() - 1000.0, 2000.0),
                tract("08031000100"),
            )],
        );
        let overlapping: TractLayer =
            SpatialLayer::build(Crs::Wgs84, vec![(square(-106.0, 39.0, 2.0), tract("08031000200"))]);

        let set = TractSet::new(vec![Arc::new(mercator), Arc::new(overlapping)]);
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.locate(Point::new(-104.99, 39.74)).unwrap().geoid,
            "08031000100"
        );
        assert_eq!(
            set.locate(Point::new(-105.5, 39.5)).unwrap().geoid,
            "08031000200"
        );
        assert!(set.locate(Point::new(0.0, 0.0)).is_none());
        assert!(TractSet::default().is_empty());
    }

    #[tokio::test]
    async fn test_states_are_fetched_once_across_selections() {
        let server = MockServer::start().await;
        mount_tracts(&server, "08", tract_body("08031000100", 0.0, 0.0), 1).await;
        mount_tracts(&server, "12", tract_body("12086000100", 5.0, 5.0), 1).await;

        let loader = loader(&server);
        let florida = State::parse("FL").unwrap();
        let colorado = State::parse("CO").unwrap();

        let both = loader.load(&[florida, colorado]).await.unwrap();
        assert_eq!(both.len(), 2);
        assert_eq!(
            both.locate(Point::new(5.5, 5.5)).unwrap().geoid,
            "12086000100"
        );

        // a different selection reuses the per-state layers
        let colorado_only = loader.load(&[colorado, colorado]).await.unwrap();
        assert_eq!(colorado_only.len(), 1);
        assert!(colorado_only.locate(Point::new(5.5, 5.5)).is_none());

        let again = loader.load(&[colorado, florida]).await.unwrap();
        assert_eq!(again.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_state_file_is_fatal() {
        let server = MockServer::start().await;
        mount_tracts(&server, "08", tract_body("08031000100", 0.0, 0.0), 1).await;

        let loader = loader(&server);
        let states = State::parse_list(&["CO", "TX"]).unwrap();
        match loader.load(&states).await {
            Err(Error::TractLoad { fips, .. }) => assert_eq!(fips, "48"),
            other => panic!("expected tract load failure, got {:?}", other.map(|s| s.len())),
        }
    }

    #[tokio::test]
    async fn test_no_states() {
        let server = MockServer::start().await;
        assert!(matches!(
            loader(&server).load(&[]).await,
            Err(Error::NoStatesSelected)
        ));
    }
}
