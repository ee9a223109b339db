//! HTTP access to mapping-service query endpoints.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::feature_collection::parse_feature_collection;
use crate::error::Result;
use crate::pip::FeatureSet;

/// Shared HTTP client for every remote dataset
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }

    /// GET a URL; non-success statuses are errors
    pub async fn get_bytes(&self, url: Url) -> Result<Bytes> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.bytes().await?)
    }

    /// Fetch every feature of an ArcGIS REST layer as GeoJSON.
    ///
    /// `endpoint` is the layer's `/query` URL.
    pub async fn query_map_service(&self, endpoint: &str) -> Result<FeatureSet> {
        let mut url = Url::parse(endpoint)?;
        url.query_pairs_mut()
            .append_pair("where", "1=1")
            .append_pair("outFields", "*")
            .append_pair("f", "geojson");

        let body = self.get_bytes(url).await?;
        parse_feature_collection(&body)
    }
}
