/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    db::{DatabaseOptions, Db},
    error::{CourierError, CourierResult},
    federation::{Federator, LoggingFederator},
    locks::ResourceLocks,
    stream::Streams,
    visibility::{DefaultVisibility, VisibilityFilter},
    workers::Workers,
};
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: Db,
    pub workers: Arc<Workers>,
    pub locks: Arc<ResourceLocks>,
    // External collaborators
    pub federator: Arc<dyn Federator>,
    pub visibility: Arc<dyn VisibilityFilter>,
    pub streams: Arc<Streams>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> CourierResult<Self> {
        // Validate configuration
        config.validate()?;

        // Create data directories if they don't exist
        Self::ensure_directories(&config).await?;

        // Open the database and run migrations
        let db = Db::open(
            &config.storage.database,
            DatabaseOptions {
                max_connections: config.storage.max_connections,
                ..Default::default()
            },
        )
        .await?;

        Ok(Self::with_parts(config, db, Arc::new(LoggingFederator)))
    }

    /// Assemble a context around an already opened store
    pub fn with_parts(config: ServerConfig, db: Db, federator: Arc<dyn Federator>) -> Self {
        let visibility = Arc::new(DefaultVisibility::new(db.clone()));

        Self {
            config: Arc::new(config),
            db,
            workers: Arc::new(Workers::new()),
            locks: Arc::new(ResourceLocks::new()),
            federator,
            visibility,
            streams: Arc::new(Streams::new()),
        }
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> CourierResult<()> {
        let dir = &config.storage.data_directory;
        if !dir.exists() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                CourierError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
            })?;
        }

        Ok(())
    }

    /// Get instance base URL
    pub fn base_url(&self) -> String {
        self.config.base_url()
    }

    /// Whether `host` names this instance
    pub fn is_local_host(&self, host: &str) -> bool {
        host.eq_ignore_ascii_case(&self.config.instance.host)
    }
}
