//! Application state - Dependency injection container.
//!
//! Provides centralized access to all application services and infrastructure.

use std::sync::Arc;

use crate::config::Config;
use crate::infra::{Cache, Database, NotificationHub};
use crate::services::{Backends, ServiceContainer, Services};

/// Application state shared by every handler.
#[derive(Clone)]
pub struct AppState {
    /// All application services behind their traits
    pub services: Arc<dyn ServiceContainer>,
    /// Redis cache (profiles, rate limits)
    pub cache: Arc<Cache>,
    /// Database connection
    pub database: Arc<Database>,
    /// Push hub, for connection stats
    pub hub: Arc<NotificationHub>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Build the full service container over `database`.
    pub fn from_config(
        database: Arc<Database>,
        cache: Arc<Cache>,
        config: Config,
        backends: Backends,
    ) -> Self {
        let hub = backends.hub.clone();
        let services = Services::from_connection(
            database.get_connection(),
            config.clone(),
            backends,
        );

        Self::new(Arc::new(services), cache, database, hub, config)
    }

    /// Create application state with manually injected services.
    pub fn new(
        services: Arc<dyn ServiceContainer>,
        cache: Arc<Cache>,
        database: Arc<Database>,
        hub: Arc<NotificationHub>,
        config: Config,
    ) -> Self {
        Self {
            services,
            cache,
            database,
            hub,
            config: Arc::new(config),
        }
    }
}
