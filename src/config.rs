/// Configuration management for the Clipstream account server
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Public base URL used to build media URLs handed out to clients
    pub public_url: String,
    pub version: String,
    pub upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub account_db: PathBuf,
    pub media_directory: PathBuf,
}

/// Authentication configuration: two independent token signing domains
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub access: TokenConfig,
    pub refresh: TokenConfig,
}

/// One token signing domain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub ttl_seconds: i64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("CLIPSTREAM_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("CLIPSTREAM_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;

        let public_url = env::var("CLIPSTREAM_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port));
        let version = env::var("CLIPSTREAM_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let upload_limit = env::var("CLIPSTREAM_UPLOAD_LIMIT")
            .unwrap_or_else(|_| "5242880".to_string())
            .parse()
            .unwrap_or(5242880);

        let data_directory: PathBuf = env::var("CLIPSTREAM_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let account_db = env::var("CLIPSTREAM_ACCOUNT_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("accounts.sqlite"));
        let media_directory = env::var("CLIPSTREAM_MEDIA_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("media"));

        let access_secret = env::var("CLIPSTREAM_ACCESS_TOKEN_SECRET")
            .map_err(|_| ApiError::Validation("Access token secret required".to_string()))?;
        let access_ttl = env::var("CLIPSTREAM_ACCESS_TOKEN_TTL")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);

        let refresh_secret = env::var("CLIPSTREAM_REFRESH_TOKEN_SECRET")
            .map_err(|_| ApiError::Validation("Refresh token secret required".to_string()))?;
        let refresh_ttl = env::var("CLIPSTREAM_REFRESH_TOKEN_TTL")
            .unwrap_or_else(|_| "864000".to_string())
            .parse()
            .unwrap_or(864000);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                version,
                upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                account_db,
                media_directory,
            },
            auth: AuthConfig {
                access: TokenConfig {
                    secret: access_secret,
                    ttl_seconds: access_ttl,
                },
                refresh: TokenConfig {
                    secret: refresh_secret,
                    ttl_seconds: refresh_ttl,
                },
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.auth.access.secret.len() < 32 {
            return Err(ApiError::Validation(
                "Access token secret must be at least 32 characters".to_string(),
            ));
        }

        if self.auth.refresh.secret.len() < 32 {
            return Err(ApiError::Validation(
                "Refresh token secret must be at least 32 characters".to_string(),
            ));
        }

        if self.auth.access.secret == self.auth.refresh.secret {
            return Err(ApiError::Validation(
                "Access and refresh token secrets must differ".to_string(),
            ));
        }

        if self.auth.access.ttl_seconds <= 0 || self.auth.refresh.ttl_seconds <= 0 {
            return Err(ApiError::Validation(
                "Token TTLs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
