//! Layered configuration: defaults, then a TOML file, then `MOSAIC_*`
//! environment variables.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cluster::KMedoidsConfig;
use crate::error::{MosaicError, Result};
use crate::types::{Metric, RefinementStrategy, SeedingStrategy};

const DEFAULT_CONFIG_FILE: &str = "mosaic.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub index: IndexConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_top_k: usize,
    /// Upper bound on descriptors accepted in one request.
    pub max_descriptors: usize,
    pub max_body_bytes: usize,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_top_k: 1000,
            max_descriptors: 100_000,
            max_body_bytes: 64 * 1024 * 1024,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Local,
    Memory,
    S3,
}

impl FromStr for StorageBackend {
    type Err = MosaicError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "memory" => Ok(StorageBackend::Memory),
            "s3" => Ok(StorageBackend::S3),
            other => Err(MosaicError::Configuration(format!(
                "unknown storage backend '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Root directory for the local backend.
    pub root: PathBuf,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            root: PathBuf::from("data/artifacts"),
            bucket: None,
            region: None,
            endpoint: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// SQLite file holding documents, postings and histograms.
    pub path: PathBuf,
    /// Name of the vocabulary the index is built with.
    pub vocabulary: String,
    /// Prefilter shortlist size before re-ranking. `None` re-ranks every
    /// candidate.
    pub max_candidates: Option<usize>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/index.db"),
            vocabulary: "default".to_string(),
            max_candidates: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub clusters: usize,
    pub max_iter: usize,
    pub metric: Metric,
    pub seeding: SeedingStrategy,
    pub seed_attempts: usize,
    pub refinement: RefinementStrategy,
    /// Descriptors sampled from the pooled corpus before clustering.
    pub sample_size: usize,
    pub seed: Option<u64>,
    pub threads: usize,
    /// Drop descriptors whose components are all zero before sampling.
    pub drop_zero_descriptors: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            clusters: 1000,
            max_iter: 300,
            metric: Metric::Euclidean,
            seeding: SeedingStrategy::KMeansPlusPlus,
            seed_attempts: 5,
            refinement: RefinementStrategy::PerCluster,
            sample_size: 30_000,
            seed: None,
            threads: 0,
            drop_zero_descriptors: true,
        }
    }
}

impl TrainingConfig {
    pub fn kmedoids(&self) -> KMedoidsConfig {
        KMedoidsConfig {
            k: self.clusters,
            max_iter: self.max_iter,
            seeding: self.seeding,
            seed_attempts: self.seed_attempts,
            refinement: self.refinement,
            seed: self.seed,
            threads: self.threads,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `"text"` or `"json"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// The file is `path` if given, else `$MOSAIC_CONFIG`, else
    /// `mosaic.toml` when it exists. Environment overrides apply last.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let file = path
            .map(PathBuf::from)
            .or_else(|| std::env::var("MOSAIC_CONFIG").ok().map(PathBuf::from))
            .or_else(|| {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                default.exists().then_some(default)
            });

        let mut config = match file {
            Some(ref p) => Self::from_file(p)?,
            None => Config::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| MosaicError::Configuration(e.to_string()))
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env("MOSAIC_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env("MOSAIC_PORT") {
            self.server.port = parse("MOSAIC_PORT", &v)?;
        }
        if let Some(v) = env("MOSAIC_STORAGE_BACKEND") {
            self.storage.backend = v.parse()?;
        }
        if let Some(v) = env("MOSAIC_STORAGE_ROOT") {
            self.storage.root = PathBuf::from(v);
        }
        if let Some(v) = env("MOSAIC_S3_BUCKET") {
            self.storage.bucket = Some(v);
        }
        if let Some(v) = env("MOSAIC_S3_REGION") {
            self.storage.region = Some(v);
        }
        if let Some(v) = env("MOSAIC_S3_ENDPOINT") {
            self.storage.endpoint = Some(v);
        }
        if let Some(v) = env("MOSAIC_INDEX_PATH") {
            self.index.path = PathBuf::from(v);
        }
        if let Some(v) = env("MOSAIC_VOCABULARY") {
            self.index.vocabulary = v;
        }
        if let Some(v) = env("MOSAIC_CLUSTERS") {
            self.training.clusters = parse("MOSAIC_CLUSTERS", &v)?;
        }
        if let Some(v) = env("MOSAIC_METRIC") {
            self.training.metric = v.parse()?;
        }
        if let Some(v) = env("MOSAIC_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = env("MOSAIC_LOG_FORMAT") {
            self.logging.format = v;
        }
        Ok(())
    }
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| MosaicError::Configuration(format!("invalid value for {key}: '{value}'")))
}
