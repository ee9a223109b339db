//! Process-lifetime lookup session shared by the CLI and the HTTP server.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::config::Config;
use crate::eligibility::EligibilityTable;
use crate::error::{Error, Result};
use crate::fetch::{DatasetRepository, HttpFetcher, RetryPolicy};
use crate::models::{Coordinate, State};
use crate::pip::FeatureSet;
use crate::pipeline::{process_coordinates, LookupReport, LookupWarning, ReferenceData};
use crate::tracts::TractLoader;
use crate::zones::{zone_layer, RemoteZoneLoader, ZoneLayer};

const USDA_LABEL: &str = "USDA ineligible areas";

#[derive(Clone, Copy)]
enum UsdaSource<'a> {
    MapService(&'a str),
    Repository(&'a str),
}

/// Owns the loaders and every memoized reference dataset
pub struct LookupService {
    config: Config,
    http: HttpFetcher,
    repository: Arc<DatasetRepository>,
    retry: RetryPolicy,
    tracts: TractLoader,
    zones: RemoteZoneLoader,
    eligibility: OnceCell<Arc<EligibilityTable>>,
    usda: OnceCell<Arc<ZoneLayer>>,
}

impl LookupService {
    pub fn new(config: Config) -> Result<Self> {
        let http = HttpFetcher::new(&config.http.user_agent, config.http.timeout())?;
        let repository = Arc::new(DatasetRepository::new(http.clone(), &config.dataset)?);
        let retry = config.http.retry_policy();

        Ok(Self {
            tracts: TractLoader::new(Arc::clone(&repository), retry, config.dataset.clone()),
            zones: RemoteZoneLoader::new(http.clone(), Arc::clone(&repository), retry),
            eligibility: OnceCell::new(),
            usda: OnceCell::new(),
            config,
            http,
            repository,
            retry,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Eligibility flags, read from disk on first use
    pub async fn eligibility(&self) -> Result<Arc<EligibilityTable>> {
        self.eligibility
            .get_or_try_init(|| async {
                let path = self.config.eligibility.path.clone();
                let table = tokio::task::spawn_blocking(move || EligibilityTable::load_from_path(&path))
                    .await
                    .map_err(|e| Error::Config {
                        message: format!("eligibility loader panicked: {}", e),
                    })??;
                Ok::<_, Error>(Arc::new(table))
            })
            .await
            .cloned()
    }

    /// USDA ineligible-area layer; `Ok(None)` when no source is configured
    pub async fn usda(&self) -> Result<Option<Arc<ZoneLayer>>> {
        let source = match (&self.config.usda.endpoint, &self.config.usda.file) {
            (Some(endpoint), _) => UsdaSource::MapService(endpoint),
            (None, Some(file)) => UsdaSource::Repository(file),
            (None, None) => return Ok(None),
        };

        let layer = self
            .usda
            .get_or_try_init(|| async {
                let set = self
                    .retry
                    .run(USDA_LABEL, || self.fetch_usda(source))
                    .await?;
                info!("Loaded {} USDA ineligible polygons", set.len());
                Ok::<_, Error>(Arc::new(zone_layer(set)))
            })
            .await?;
        Ok(Some(Arc::clone(layer)))
    }

    async fn fetch_usda(&self, source: UsdaSource<'_>) -> Result<FeatureSet> {
        match source {
            UsdaSource::MapService(endpoint) => self.http.query_map_service(endpoint).await,
            UsdaSource::Repository(file) => self.repository.fetch_features(file, &[]).await,
        }
    }

    /// Run a full lookup.
    ///
    /// Fails only when no state is selected or the tract layer or
    /// eligibility table cannot be loaded; everything else becomes a warning.
    pub async fn lookup(
        &self,
        states: &[&'static State],
        coordinates: &[Coordinate],
    ) -> Result<LookupReport> {
        if states.is_empty() {
            return Err(Error::NoStatesSelected);
        }
        info!(
            "Looking up {} coordinates in {}",
            coordinates.len(),
            states.iter().map(|s| s.abbr).collect::<Vec<_>>().join(", ")
        );

        let tracts = self.tracts.load(states).await?;
        let eligibility = self.eligibility().await?;

        let mut warnings = Vec::new();
        let usda = match self.usda().await {
            Ok(Some(layer)) => Some(layer),
            Ok(None) => {
                let warning = LookupWarning::UsdaUnavailable {
                    message: "no USDA source configured".to_string(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                None
            }
            Err(e) => {
                let warning = LookupWarning::UsdaUnavailable {
                    message: e.to_string(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                None
            }
        };

        let reference = ReferenceData {
            tracts: &tracts,
            eligibility: &eligibility,
            usda: usda.as_deref(),
        };
        let mut report = process_coordinates(coordinates, &reference, states, &self.zones).await;
        warnings.append(&mut report.warnings);
        report.warnings = warnings;
        Ok(report)
    }
}
