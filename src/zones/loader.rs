//! Fetching zone polygon layers, with retry and per-process memoization.

use std::future::Future;
use std::sync::Arc;

use tracing::info;

use super::registry::{ZoneCheck, ZoneProgram, ZoneSource};
use crate::error::{Error, Result};
use crate::fetch::{DatasetRepository, HttpFetcher, MemoCache, RetryPolicy};
use crate::pip::{FeatureSet, SpatialLayer};

/// Zone polygons carry no attributes; only membership matters
pub type ZoneLayer = SpatialLayer<()>;

/// Build a zone layer from decoded features
pub fn zone_layer(set: FeatureSet) -> ZoneLayer {
    SpatialLayer::build(set.crs, set.features.into_iter().map(|f| (f.geometry, ())))
}

/// Something that can provide the polygon layer of a spatial program
pub trait ZoneLayerSource {
    fn load_zone(
        &self,
        program: &'static ZoneProgram,
    ) -> impl Future<Output = Result<Arc<ZoneLayer>>> + Send;
}

/// Loads zone layers from mapping services and the dataset repository
pub struct RemoteZoneLoader {
    http: HttpFetcher,
    repository: Arc<DatasetRepository>,
    retry: RetryPolicy,
    cache: MemoCache<&'static str, ZoneLayer>,
}

impl RemoteZoneLoader {
    pub fn new(http: HttpFetcher, repository: Arc<DatasetRepository>, retry: RetryPolicy) -> Self {
        Self {
            http,
            repository,
            retry,
            cache: MemoCache::new(),
        }
    }

    /// Fetch and decode a source once, without retry or caching
    pub async fn fetch_source(&self, source: &ZoneSource) -> Result<FeatureSet> {
        match source {
            ZoneSource::MapService { endpoint } => self.http.query_map_service(endpoint).await,
            ZoneSource::MapServiceLayers { endpoints } => {
                let mut combined: Option<FeatureSet> = None;
                for endpoint in endpoints.iter() {
                    let layer = self.http.query_map_service(endpoint).await?;
                    match combined.as_mut() {
                        Some(set) => set.extend(layer)?,
                        None => combined = Some(layer),
                    }
                }
                combined.ok_or_else(|| Error::Config {
                    message: "zone source lists no layers".to_string(),
                })
            }
            ZoneSource::Repository { filename } => {
                self.repository.fetch_features(filename, &[]).await
            }
        }
    }

    /// Fetch a source with retry and build its layer
    pub async fn load_source(&self, label: &str, source: &ZoneSource) -> Result<ZoneLayer> {
        let set = self
            .retry
            .run(label, || self.fetch_source(source))
            .await?;
        info!("Loaded {} polygons for {} ({})", set.len(), label, set.crs);
        Ok(zone_layer(set))
    }
}

impl ZoneLayerSource for RemoteZoneLoader {
    async fn load_zone(&self, program: &'static ZoneProgram) -> Result<Arc<ZoneLayer>> {
        let ZoneCheck::Spatial { source } = program.check else {
            return Err(Error::Config {
                message: format!("{} is not a spatial program", program.label),
            });
        };
        self.cache
            .get_or_try_load(program.id, || self.load_source(program.label, &source))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetConfig;
    use crate::pip::Crs;
    use geo::Point;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn square_body(x0: f64, y0: f64) -> String {
        format!(
            r#"{{"type":"FeatureCollection","features":[{{"type":"Feature","properties":{{}},
            "geometry":{{"type":"Polygon","coordinates":[[[{x0},{y0}],[{x1},{y0}],[{x1},{y1}],[{x0},{y1}],[{x0},{y0}]]]}}}}]}}"#,
            x0 = x0,
            y0 = y0,
            x1 = x0 + 1.0,
            y1 = y0 + 1.0
        )
    }

    fn loader(server: &MockServer) -> RemoteZoneLoader {
        let http = HttpFetcher::new("tractlookup-test", Duration::from_secs(5)).unwrap();
        let config = DatasetConfig {
            base_url: server.uri(),
            ..DatasetConfig::default()
        };
        let repository = Arc::new(DatasetRepository::new(http.clone(), &config).unwrap());
        RemoteZoneLoader::new(http, repository, RetryPolicy::new(3, Duration::from_millis(1)))
    }

    fn leak(s: String) -> &'static str {
        Box::leak(s.into_boxed_str())
    }

    #[tokio::test]
    async fn test_layers_are_concatenated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/EEZ/MapServer/1/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(square_body(0.0, 0.0)))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/EEZ/MapServer/2/query"))
            .respond_with(ResponseTemplate::new(200).set_body_string(square_body(5.0, 5.0)))
            .mount(&server)
            .await;

        let endpoints: &'static [&'static str] = Box::leak(Box::new([
            leak(format!("{}/EEZ/MapServer/1/query", server.uri())),
            leak(format!("{}/EEZ/MapServer/2/query", server.uri())),
        ]));
        let layer = loader(&server)
            .load_source("MO test", &ZoneSource::MapServiceLayers { endpoints })
            .await
            .unwrap();

        assert_eq!(layer.len(), 2);
        assert_eq!(layer.crs(), Crs::Wgs84);
        assert!(layer.contains(Point::new(0.5, 0.5)));
        assert!(layer.contains(Point::new(5.5, 5.5)));
        assert!(!layer.contains(Point::new(3.0, 3.0)));
    }

    #[tokio::test]
    async fn test_retries_then_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let endpoint = leak(format!("{}/query", server.uri()));
        let result = loader(&server)
            .load_source("broken", &ZoneSource::MapService { endpoint })
            .await;
        assert!(matches!(result, Err(Error::Http(_))));
    }

    #[tokio::test]
    async fn test_program_layer_is_memoized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/datasets/MMNASH10/my-parquet-dataset/resolve/main/zones.geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_string(square_body(0.0, 0.0)))
            .expect(1)
            .mount(&server)
            .await;

        let program: &'static ZoneProgram = Box::leak(Box::new(ZoneProgram {
            id: "test-ez",
            state_fips: "08",
            label: "Test Zone",
            check: ZoneCheck::Spatial {
                source: ZoneSource::Repository {
                    filename: "zones.geojson",
                },
            },
        }));

        let loader = loader(&server);
        let first = loader.load_zone(program).await.unwrap();
        let second = loader.load_zone(program).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_county_program_has_no_layer() {
        let server = MockServer::start().await;
        let al = crate::zones::ZONE_PROGRAMS
            .iter()
            .find(|p| p.id == "al-ez")
            .unwrap();
        assert!(matches!(
            loader(&server).load_zone(al).await,
            Err(Error::Config { .. })
        ));
    }
}
