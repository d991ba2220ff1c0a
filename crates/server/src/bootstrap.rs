use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use thiserror::Error;
use tracing::info;

use procura_agent::TurnEngine;
use procura_core::approvals::ManualDispatchSink;
use procura_core::catalog::Catalog;
use procura_core::config::{AppConfig, ConfigError, LoadOptions};
use procura_retrieval::{
    CandidateAggregator, ExternalSource, HttpLookupSource, NoopLookupSource, RetryPolicy,
    RetryingLookup, SourceError,
};
use procura_store::{InMemorySessionStore, SessionStore};

use crate::{health, routes};

pub struct Application {
    pub config: AppConfig,
    pub router: Router,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("lookup client initialization failed: {0}")]
    Lookup(#[source] SourceError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let catalog = Catalog::seeded();
    info!(
        event_name = "system.bootstrap.catalog_ready",
        correlation_id = "bootstrap",
        products = catalog.len(),
        "catalog synthesized"
    );

    let external: Arc<dyn ExternalSource> = if config.lookup.enabled {
        let client = HttpLookupSource::new(&config.lookup).map_err(BootstrapError::Lookup)?;
        Arc::new(RetryingLookup::new(
            client,
            RetryPolicy {
                max_attempts: config.lookup.max_retries,
                base_delay: Duration::from_secs(1),
            },
        ))
    } else {
        Arc::new(NoopLookupSource)
    };
    info!(
        event_name = "system.bootstrap.lookup_mode",
        correlation_id = "bootstrap",
        lookup_mode = if config.lookup.enabled { "http" } else { "noop" },
        "external lookup source initialized"
    );

    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let engine = Arc::new(TurnEngine::with_defaults(
        CandidateAggregator::new(catalog, external),
        Arc::clone(&store),
    ));

    let state = routes::ApiState {
        engine,
        store: Arc::clone(&store),
        sink: Arc::new(ManualDispatchSink::new(config.notifier.approver_email.clone())),
        approver_email: config.notifier.approver_email.clone(),
        approval_base_url: config.notifier.approval_base_url.clone(),
    };

    let router = routes::router(state).merge(health::router(store));

    Ok(Application { config, router })
}
