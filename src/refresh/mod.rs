//! Composition store refresh.
//!
//! Searches read from a [`StoreHandle`] snapshot. A refresh builds a whole
//! new store from the season export and swaps it in; searches that already
//! hold a snapshot finish against the old store.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::engine::{CompositionStore, EngineError, LoadReport};
use crate::models::{RoleCatalog, Season};
use crate::storage::{self, StorageConfig, StorageError};

/// Errors that can occur while loading or refreshing a store.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Load task failed: {0}")]
    Task(String),
}

/// Shared, swappable reference to the live store.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    inner: Arc<RwLock<Arc<CompositionStore>>>,
}

impl StoreHandle {
    pub fn new(store: CompositionStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(store))),
        }
    }

    /// The current store. Stays valid after a later swap.
    pub async fn snapshot(&self) -> Arc<CompositionStore> {
        self.inner.read().await.clone()
    }

    /// Swap in a new store, returning the old one.
    pub async fn replace(&self, store: CompositionStore) -> Arc<CompositionStore> {
        let mut guard = self.inner.write().await;
        std::mem::replace(&mut *guard, Arc::new(store))
    }
}

/// Build a store from a season's export, tagged with the export fingerprint.
pub fn load_store(
    storage: &StorageConfig,
    season: &Season,
    catalog: &RoleCatalog,
) -> Result<CompositionStore, RefreshError> {
    let location = storage::locate_export(storage, &season.id)?;
    let fingerprint = storage::fingerprint(&location.path)?;
    let export = storage::read_export(storage, &season.id)?;

    if export.skipped > 0 {
        warn!(
            "Skipped {} unreadable rows in {:?}",
            export.skipped, export.location.path
        );
    }

    let store = CompositionStore::from_rows(season.window(), export.rows, catalog)?;
    Ok(store.with_fingerprint(fingerprint))
}

/// Outcome of one refresh check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The export changed and a new store is live
    Reloaded {
        fingerprint: String,
        report: LoadReport,
    },
    /// The export fingerprint matches the live store
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RefreshStatus {
    #[default]
    Idle,
    Reloaded,
    Unchanged,
    Failed,
}

/// State of the refresher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RefreshState {
    /// When the export was last checked
    pub last_checked: Option<DateTime<Utc>>,

    /// When a new store was last swapped in
    pub last_reloaded: Option<DateTime<Utc>>,

    pub last_status: RefreshStatus,

    /// Number of swaps since start
    pub reloads: u32,

    /// Error of the last failed check
    pub last_error: Option<String>,
}

/// Periodically reloads a season's store when its export changes.
pub struct StoreRefresher {
    storage: StorageConfig,
    season: Season,
    catalog: &'static RoleCatalog,
    handle: StoreHandle,
    interval: Duration,
    state: Arc<RwLock<RefreshState>>,
    stopped: Arc<RwLock<bool>>,
}

impl StoreRefresher {
    pub fn new(
        storage: StorageConfig,
        season: Season,
        catalog: &'static RoleCatalog,
        handle: StoreHandle,
        interval: Duration,
    ) -> Self {
        Self {
            storage,
            season,
            catalog,
            handle,
            interval,
            state: Arc::new(RwLock::new(RefreshState::default())),
            stopped: Arc::new(RwLock::new(false)),
        }
    }

    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    pub async fn state(&self) -> RefreshState {
        self.state.read().await.clone()
    }

    /// Ask `run_periodic` to exit at its next tick.
    pub async fn stop(&self) {
        *self.stopped.write().await = true;
    }

    /// Check the export once and swap in a new store if it changed.
    ///
    /// On failure the live store is left untouched.
    pub async fn refresh_once(&self) -> Result<RefreshOutcome, RefreshError> {
        let result = self.check_and_reload().await;

        let mut state = self.state.write().await;
        state.last_checked = Some(Utc::now());
        match &result {
            Ok(RefreshOutcome::Reloaded { .. }) => {
                state.last_status = RefreshStatus::Reloaded;
                state.last_reloaded = state.last_checked;
                state.reloads += 1;
                state.last_error = None;
            }
            Ok(RefreshOutcome::Unchanged) => {
                state.last_status = RefreshStatus::Unchanged;
                state.last_error = None;
            }
            Err(e) => {
                state.last_status = RefreshStatus::Failed;
                state.last_error = Some(e.to_string());
            }
        }
        result
    }

    async fn check_and_reload(&self) -> Result<RefreshOutcome, RefreshError> {
        let location = storage::locate_export(&self.storage, &self.season.id)?;
        let fingerprint = storage::fingerprint(&location.path)?;

        let current = self.handle.snapshot().await;
        if current.fingerprint() == Some(fingerprint.as_str()) {
            return Ok(RefreshOutcome::Unchanged);
        }

        let storage = self.storage.clone();
        let season = self.season.clone();
        let catalog = self.catalog;
        let store = tokio::task::spawn_blocking(move || load_store(&storage, &season, catalog))
            .await
            .map_err(|e| RefreshError::Task(e.to_string()))??;

        let fingerprint = store.fingerprint().unwrap_or_default().to_string();
        let report = *store.report();
        self.handle.replace(store).await;

        info!(
            "Swapped in store for {} (fingerprint {}, {} compositions)",
            self.season.id, fingerprint, report.accepted
        );
        Ok(RefreshOutcome::Reloaded {
            fingerprint,
            report,
        })
    }

    /// Refresh on a fixed interval until stopped.
    pub async fn run_periodic(self: Arc<Self>) {
        let mut ticker = interval(self.interval);

        info!(
            "Starting store refresh for {} every {:?}",
            self.season.id, self.interval
        );

        loop {
            ticker.tick().await;

            if *self.stopped.read().await {
                info!("Store refresh stopped");
                break;
            }

            match self.refresh_once().await {
                Ok(RefreshOutcome::Reloaded { fingerprint, .. }) => {
                    info!("Periodic refresh loaded export {}", fingerprint);
                }
                Ok(RefreshOutcome::Unchanged) => {}
                Err(e) => {
                    error!("Periodic refresh failed, keeping current store: {}", e);
                }
            }
        }
    }
}
