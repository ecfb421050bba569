use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub mail: MailConfig,

    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Default number of results per page; callers may override with
    /// `?page_size=` up to `max_page_size`.
    pub page_size: u64,

    pub max_page_size: u64,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/ratarr.db".to_string(),
            log_level: "info".to_string(),
            page_size: 10,
            max_page_size: 100,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:8000".to_string(),
                "http://127.0.0.1:8000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// HTTP relay endpoint for outbound mail. Empty means "log instead of
    /// deliver", which is only suitable for local development.
    pub relay_url: String,

    pub from_address: String,

    pub timeout_seconds: u64,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            relay_url: String::new(),
            from_address: "noreply@ratarr.local".to_string(),
            timeout_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC secret for signing bearer tokens. Override via RATARR_TOKEN_SECRET.
    pub token_secret: String,

    pub access_ttl_minutes: i64,

    pub refresh_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            access_ttl_minutes: 24 * 60,
            refresh_ttl_days: 30,
        }
    }
}

impl Config {
    /// Load configuration from the TOML file named by RATARR_CONFIG (falling
    /// back to ./config.toml), then apply environment overrides.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path =
            PathBuf::from(std::env::var("RATARR_CONFIG").unwrap_or_else(|_| "config.toml".into()));

        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            info!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(secret) = std::env::var("RATARR_TOKEN_SECRET") {
            config.auth.token_secret = secret;
        }
        if let Ok(db) = std::env::var("RATARR_DATABASE") {
            config.general.database_path = db;
        }

        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.token_secret.is_empty() {
            anyhow::bail!("auth.token_secret is empty; set it in config.toml or RATARR_TOKEN_SECRET");
        }
        if self.general.page_size == 0 || self.general.page_size > self.general.max_page_size {
            anyhow::bail!(
                "general.page_size must be between 1 and {}",
                self.general.max_page_size
            );
        }
        if self.auth.access_ttl_minutes <= 0 || self.auth.refresh_ttl_days <= 0 {
            anyhow::bail!("token lifetimes must be positive");
        }

        Ok(())
    }
}
