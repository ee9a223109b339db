//! Pre-built dataset files served from a Hugging Face style repository.

use std::io::Write;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};
use url::Url;

use super::{decode_dataset, HttpFetcher};
use crate::config::DatasetConfig;
use crate::error::{Error, Result};
use crate::pip::FeatureSet;

/// Dataset repository with an optional on-disk download cache
pub struct DatasetRepository {
    http: HttpFetcher,
    base_url: Url,
    repo_id: String,
    revision: String,
    cache_dir: Option<PathBuf>,
}

impl DatasetRepository {
    pub fn new(http: HttpFetcher, config: &DatasetConfig) -> Result<Self> {
        let mut base_url = Url::parse(&config.base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            http,
            base_url,
            repo_id: config.repo_id.clone(),
            revision: config.revision.clone(),
            cache_dir: config.cache_dir.clone(),
        })
    }

    /// `{base}/datasets/{repo}/resolve/{revision}/{filename}`
    pub fn file_url(&self, filename: &str) -> Result<Url> {
        Ok(self.base_url.join(&format!(
            "datasets/{}/resolve/{}/{}",
            self.repo_id, self.revision, filename
        ))?)
    }

    fn cache_path(&self, filename: &str) -> Option<PathBuf> {
        self.cache_dir
            .as_ref()
            .map(|dir| dir.join(&self.repo_id).join(filename))
    }

    /// Fetch a file's bytes, from the disk cache when present
    pub async fn fetch(&self, filename: &str) -> Result<Bytes> {
        let cache_path = self.cache_path(filename);

        if let Some(path) = &cache_path {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                debug!("Reading {} from cache", path.display());
                return Ok(Bytes::from(tokio::fs::read(path).await?));
            }
        }

        let url = self.file_url(filename)?;
        info!("Downloading {}", url);
        let data = self.http.get_bytes(url).await?;

        if let Some(path) = cache_path {
            let payload = data.clone();
            let target = path.clone();
            match tokio::task::spawn_blocking(move || write_atomically(&target, &payload)).await {
                Ok(Ok(())) => debug!("Cached {} ({} bytes)", path.display(), data.len()),
                Ok(Err(e)) => warn!("Could not cache {}: {}", path.display(), e),
                Err(e) => warn!("Cache writer for {} panicked: {}", path.display(), e),
            }
        }

        Ok(data)
    }

    /// Fetch and decode a dataset file (format chosen by extension)
    pub async fn fetch_features(&self, filename: &str, columns: &[&str]) -> Result<FeatureSet> {
        let data = self.fetch(filename).await?;
        decode_dataset(filename, data, columns)
    }
}

/// Write through a temp file in the target directory, then rename
fn write_atomically(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path.parent().ok_or_else(|| Error::Config {
        message: format!("cache path {} has no parent directory", path.display()),
    })?;
    std::fs::create_dir_all(dir)?;
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn repository(base_url: &str, cache_dir: Option<PathBuf>) -> DatasetRepository {
        let http = HttpFetcher::new("tractlookup-test", Duration::from_secs(5)).unwrap();
        let config = DatasetConfig {
            base_url: base_url.to_string(),
            repo_id: "owner/tracts".to_string(),
            revision: "main".to_string(),
            cache_dir,
            ..DatasetConfig::default()
        };
        DatasetRepository::new(http, &config).unwrap()
    }

    #[test]
    fn test_file_url_layout() {
        let repo = repository("https://huggingface.co", None);
        assert_eq!(
            repo.file_url("tl_2024_08_tract.parquet").unwrap().as_str(),
            "https://huggingface.co/datasets/owner/tracts/resolve/main/tl_2024_08_tract.parquet"
        );

        let mirrored = repository("http://localhost:8080/mirror", None);
        assert_eq!(
            mirrored.file_url("a.geojson").unwrap().as_str(),
            "http://localhost:8080/mirror/datasets/owner/tracts/resolve/main/a.geojson"
        );
    }

    #[tokio::test]
    async fn test_second_fetch_served_from_disk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/datasets/owner/tracts/resolve/main/zones.geojson"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let cache = tempfile::tempdir().unwrap();
        let repo = repository(&server.uri(), Some(cache.path().to_path_buf()));

        let first = repo.fetch("zones.geojson").await.unwrap();
        let second = repo.fetch("zones.geojson").await.unwrap();
        assert_eq!(first, second);
        assert!(cache.path().join("owner/tracts/zones.geojson").exists());
    }

    #[tokio::test]
    async fn test_missing_file_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let repo = repository(&server.uri(), None);
        assert!(matches!(
            repo.fetch("tl_2024_99_tract.parquet").await,
            Err(Error::Http(_))
        ));
    }
}
