//! Main application state
//!
//! Builds the in-memory loader and store, seeds them from the configured
//! snapshot, and exposes the rating service on top of them.

use crate::config::AppConfig;
use crate::metrics::MetricsCollector;
use crate::rating::{InMemoryRatingStore, SeedRatingCalculator};
use crate::service::rating::RatingService;
use crate::snapshot::Snapshot;
use crate::standings::InMemoryStandingsLoader;
use crate::types::SYSTEM_DOMAIN;
use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Application state shared by the command line entry points
pub struct AppState {
    config: AppConfig,
    loader: Arc<InMemoryStandingsLoader>,
    store: Arc<InMemoryRatingStore>,
    metrics: Arc<MetricsCollector>,
    service: RatingService,
}

impl AppState {
    /// Create application state with empty storage for the system domain
    pub fn new(config: AppConfig) -> Result<Self> {
        let loader = Arc::new(InMemoryStandingsLoader::new());
        let store = Arc::new(InMemoryRatingStore::new());
        store.register_domain(SYSTEM_DOMAIN)?;
        let metrics = Arc::new(MetricsCollector::new()?);
        let calculator = Arc::new(SeedRatingCalculator::new(config.seed_rating_config())?);

        let service = RatingService::new(
            loader.clone(),
            store.clone(),
            calculator,
            metrics.clone(),
        );

        Ok(Self {
            config,
            loader,
            store,
            metrics,
            service,
        })
    }

    /// Create application state seeded from the configured snapshot.
    ///
    /// A missing snapshot file starts from empty storage.
    pub fn load(config: AppConfig) -> Result<Self> {
        let path = config.storage.snapshot_path.clone();
        let state = Self::new(config)?;

        if path.exists() {
            let snapshot = Snapshot::read_from(&path)?;
            snapshot.install(&state.loader, &state.store)?;
            // A snapshot without the system domain must not drop it
            state.store.register_domain(SYSTEM_DOMAIN)?;
            info!(
                "Loaded {} domains from snapshot {}",
                snapshot.domains.len(),
                path.display()
            );
        } else {
            warn!(
                "Snapshot {} does not exist, starting with empty storage",
                path.display()
            );
        }

        Ok(state)
    }

    /// Write the current loader and store contents back to the snapshot
    pub fn save(&self) -> Result<()> {
        let snapshot = Snapshot::capture(&self.loader, &self.store)?;
        snapshot.write_to(
            &self.config.storage.snapshot_path,
            self.config.storage.pretty_snapshot,
        )
    }

    /// Get the rating service
    pub fn service(&self) -> &RatingService {
        &self.service
    }

    /// Get the metrics collector
    pub fn metrics(&self) -> Arc<MetricsCollector> {
        self.metrics.clone()
    }

    /// Get the configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Get the rating store
    pub fn store(&self) -> Arc<InMemoryRatingStore> {
        self.store.clone()
    }

    /// Get the standings loader
    pub fn loader(&self) -> Arc<InMemoryStandingsLoader> {
        self.loader.clone()
    }
}
