//! Import pipelines: the election catalog walk and the per-candidate CV import.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declara_adapters::{
    ElectionSource, FixtureSource, JneHttpSource, SourceConfig, SourceDataError, SourceError,
};
use declara_core::TotalsOverflow;
use declara_storage::{PgStore, StorageConfig, Store, StoreError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

mod catalog;
mod cv;
pub mod mapping;

pub use catalog::CatalogImport;
pub use cv::CvImport;
pub use declara_storage::CvImportFilter;

pub const CRATE_NAME: &str = "declara-sync";

/// Election processes the catalog import is allowed to touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportPolicy {
    pub election_processes: Vec<i64>,
}

impl Default for ImportPolicy {
    fn default() -> Self {
        Self {
            election_processes: vec![110],
        }
    }
}

impl ImportPolicy {
    pub fn allows(&self, process_source_id: i64) -> bool {
        self.election_processes.contains(&process_source_id)
    }

    pub async fn load(path: &Path) -> Result<Self, ImportError> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ImportError::PolicyIo {
                path: path.to_path_buf(),
                source,
            })?;
        serde_yaml::from_str(&text).map_err(|source| ImportError::PolicyParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads the policy file, falling back to the default allow-list when it
    /// does not exist.
    pub async fn load_or_default(path: &Path) -> Result<Self, ImportError> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            let policy = Self::default();
            warn!(
                path = %path.display(),
                processes = ?policy.election_processes,
                "import policy file not found; using the default allow-list"
            );
            Ok(policy)
        }
    }
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("malformed source data: {0}")]
    Data(#[from] SourceDataError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Totals(#[from] TotalsOverflow),
    #[error("could not read import policy {path}: {source}")]
    PolicyIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse import policy {path}: {source}")]
    PolicyParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

pub type ImportResult<T> = Result<T, ImportError>;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub storage: StorageConfig,
    pub source: SourceConfig,
    pub fixture: Option<PathBuf>,
    pub policy_path: PathBuf,
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self {
            storage: StorageConfig::from_env(),
            source: SourceConfig::from_env(),
            fixture: std::env::var("DECLARA_SOURCE_FIXTURE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            policy_path: std::env::var("DECLARA_IMPORT_POLICY")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./import.yaml")),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogImportSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub processes: usize,
    pub election_types: usize,
    pub files: usize,
    pub candidates_seen: usize,
    pub candidates_created: usize,
    pub persons_created: usize,
    pub references_created: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CvImportSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub selected: usize,
    pub imported: usize,
    pub skipped: usize,
    pub child_rows_created: usize,
}

/// Connects to PostgreSQL and brings the schema up to date.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn Store>> {
    let store = PgStore::connect(config)
        .await
        .context("connecting to the database")?;
    store.migrate().await.context("running migrations")?;
    Ok(Arc::new(store))
}

/// The snapshot source when a fixture path is configured, the live API otherwise.
pub fn open_source(config: &SyncConfig) -> Result<Box<dyn ElectionSource>> {
    match &config.fixture {
        Some(path) => {
            let source = FixtureSource::from_path(path)
                .with_context(|| format!("loading source snapshot {}", path.display()))?;
            info!(path = %path.display(), "using snapshot source");
            Ok(Box::new(source))
        }
        None => {
            let source = JneHttpSource::new(config.source.clone())
                .context("building the election source client")?;
            info!(base_url = %config.source.base_url, "using live source");
            Ok(Box::new(source))
        }
    }
}

pub async fn run_catalog_import_from_env() -> Result<CatalogImportSummary> {
    let config = SyncConfig::from_env();
    let store = open_store(&config.storage).await?;
    let source = open_source(&config)?;
    let policy = ImportPolicy::load_or_default(&config.policy_path).await?;
    let summary = CatalogImport::new(store.as_ref(), source.as_ref(), policy)
        .run()
        .await
        .context("catalog import failed")?;
    Ok(summary)
}

pub async fn run_cv_import_from_env(filter: CvImportFilter) -> Result<CvImportSummary> {
    let config = SyncConfig::from_env();
    let store = open_store(&config.storage).await?;
    let source = open_source(&config)?;
    let summary = CvImport::new(store.as_ref(), source.as_ref())
        .run(&filter)
        .await
        .context("cv import failed")?;
    Ok(summary)
}
