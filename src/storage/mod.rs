//! Composition export storage.
//!
//! Exports live under `<data_dir>/exports/<season>/` as either
//! `compositions.parquet` or `compositions.jsonl`. Parquet wins when both
//! are present.

pub mod jsonl;
pub mod parquet;

use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::models::CompositionRow;

pub use self::jsonl::{JsonlReader, JsonlWriter};
pub use self::parquet::ParquetWriter;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(String),

    #[error("Schema mismatch: {0}")]
    Schema(String),

    #[error("No composition export for season {season} in {dir}")]
    ExportMissing { season: String, dir: PathBuf },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),
}

/// On-disk format of a composition export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Parquet,
    Jsonl,
}

impl ExportFormat {
    /// Formats in lookup priority.
    pub const PRIORITY: [ExportFormat; 2] = [ExportFormat::Parquet, ExportFormat::Jsonl];

    pub fn filename(&self) -> &'static str {
        match self {
            ExportFormat::Parquet => "compositions.parquet",
            ExportFormat::Jsonl => "compositions.jsonl",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Parquet => write!(f, "parquet"),
            ExportFormat::Jsonl => write!(f, "jsonl"),
        }
    }
}

/// Configuration for storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn exports_dir(&self) -> PathBuf {
        self.data_dir.join("exports")
    }

    pub fn season_dir(&self, season_id: &str) -> PathBuf {
        self.exports_dir().join(season_id)
    }

    pub fn export_path(&self, season_id: &str, format: ExportFormat) -> PathBuf {
        self.season_dir(season_id).join(format.filename())
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}

/// A located export file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLocation {
    pub format: ExportFormat,
    pub path: PathBuf,
}

/// Rows read from an export.
#[derive(Debug, Clone)]
pub struct ExportRows {
    pub location: ExportLocation,
    pub rows: Vec<CompositionRow>,
    /// JSONL lines that could not be parsed
    pub skipped: usize,
}

/// Find the export for a season, preferring Parquet.
pub fn locate_export(config: &StorageConfig, season_id: &str) -> Result<ExportLocation, StorageError> {
    ExportFormat::PRIORITY
        .into_iter()
        .map(|format| ExportLocation {
            format,
            path: config.export_path(season_id, format),
        })
        .find(|location| location.path.is_file())
        .ok_or_else(|| StorageError::ExportMissing {
            season: season_id.to_string(),
            dir: config.season_dir(season_id),
        })
}

/// Read every row of a season's export.
pub fn read_export(config: &StorageConfig, season_id: &str) -> Result<ExportRows, StorageError> {
    let location = locate_export(config, season_id)?;

    let (rows, skipped) = match location.format {
        ExportFormat::Parquet => (parquet::read_compositions(&location.path)?, 0),
        ExportFormat::Jsonl => {
            let read = JsonlReader::<CompositionRow>::new(location.path.clone()).read_counted()?;
            (read.items, read.skipped)
        }
    };

    info!(
        "Read {} composition rows for {} from {:?}",
        rows.len(),
        season_id,
        location.path
    );

    Ok(ExportRows {
        location,
        rows,
        skipped,
    })
}

/// Content fingerprint of a file: first 16 hex chars of its SHA-256.
pub fn fingerprint(path: &Path) -> Result<String, StorageError> {
    if !path.exists() {
        return Err(StorageError::PathNotFound(path.to_path_buf()));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let hash = hex::encode(hasher.finalize());
    debug!("Fingerprint of {:?}: {}", path, &hash[..16]);
    Ok(hash[..16].to_string())
}

/// Season ids that have an export directory.
pub fn list_seasons(config: &StorageConfig) -> Result<Vec<String>, StorageError> {
    let dir = config.exports_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut seasons = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                seasons.push(name.to_string());
            }
        }
    }

    seasons.sort();
    Ok(seasons)
}
