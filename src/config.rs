//! TOML configuration. Every section has defaults, so the file is optional.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::fetch::RetryPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub http: HttpConfig,
    pub eligibility: EligibilityConfig,
    pub usda: UsdaConfig,
    pub server: ServerConfig,
}

/// Where pre-built tract and zone files are downloaded from.
///
/// Files must be in EPSG:4326 (or OGC:CRS84), EPSG:4269 or EPSG:3857; any
/// other reference system is rejected when the file is read.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DatasetConfig {
    pub base_url: String,
    pub repo_id: String,
    pub revision: String,
    /// File name pattern for per-state tract files; `{fips}` is substituted
    pub tract_file: String,
    /// Keep downloaded files here between runs
    pub cache_dir: Option<PathBuf>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            base_url: "https://huggingface.co".to_string(),
            repo_id: "MMNASH10/my-parquet-dataset".to_string(),
            revision: "main".to_string(),
            tract_file: "tl_2024_{fips}_tract.parquet".to_string(),
            cache_dir: None,
        }
    }
}

impl DatasetConfig {
    pub fn tract_file_for(&self, fips: &str) -> String {
        self.tract_file.replace("{fips}", fips)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            user_agent: concat!("tractlookup/", env!("CARGO_PKG_VERSION")).to_string(),
            retry_attempts: 3,
            retry_delay_secs: 2,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry_attempts, Duration::from_secs(self.retry_delay_secs))
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EligibilityConfig {
    /// Tract-level eligibility flags CSV
    pub path: PathBuf,
}

impl Default for EligibilityConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("eligibility_flags.csv"),
        }
    }
}

/// Source of the USDA ineligible-area polygons.
///
/// When neither is set the USDA column is left empty. The layer must be in
/// one of the reference systems accepted for dataset files.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct UsdaConfig {
    /// Mapping-service layer `/query` URL
    pub endpoint: Option<String>,
    /// File in the dataset repository
    pub file: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:3000".to_string(),
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config {
            message: e.to_string(),
        })
    }

    /// Load the file when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(Self::default()),
        }
    }
}
