/// Application context and dependency injection
use crate::{
    account::AccountManager,
    channel::ChannelDirectory,
    config::ServerConfig,
    db,
    error::ApiResult,
    media::{DiskMediaBackend, MediaStore},
    token::TokenService,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub tokens: Arc<TokenService>,
    pub accounts: Arc<AccountManager>,
    pub channels: Arc<ChannelDirectory>,
    pub media: Arc<MediaStore>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> ApiResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        // A database failure here is fatal: startup propagates the error
        let pool = db::create_pool(&config.storage.account_db, db::DatabaseOptions::default())
            .await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let tokens = Arc::new(TokenService::new(&config.auth));
        let accounts = Arc::new(AccountManager::new(pool.clone(), Arc::clone(&tokens)));
        let channels = Arc::new(ChannelDirectory::new(pool.clone()));

        let media_backend = DiskMediaBackend::new(config.storage.media_directory.clone());
        let media = Arc::new(MediaStore::new(
            Box::new(media_backend),
            config.service.public_url.clone(),
        ));

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            tokens,
            accounts,
            channels,
            media,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> ApiResult<()> {
        tokio::fs::create_dir_all(&config.storage.data_directory).await?;
        tokio::fs::create_dir_all(&config.storage.media_directory).await?;

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
