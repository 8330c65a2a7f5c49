use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};

use crate::error::{Error, Result};

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "./data/syncroom.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration for the server, loadable from a TOML file.
///
/// Priority: CLI args > environment (`HOST`, `PORT`, `DATABASE_URL`,
/// `ADMIN_API_KEY`, `CORS_ORIGINS`, `LOG_LEVEL`) > config file > defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Plaintext admin key. Admin endpoints reject everything when unset.
    #[serde(default)]
    pub admin_api_key: Option<String>,
    /// Comma-separated allowed origins; `*` means permissive.
    #[serde(default)]
    pub cors_origins: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// CLI overrides that can be applied on top of a config file.
#[derive(Debug, Default)]
pub struct ServerConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database_url: Option<String>,
}

impl ServerConfig {
    /// Default config file search paths.
    const SEARCH_PATHS: &'static [&'static str] = &["./syncroom.toml", "/etc/syncroom/server.toml"];

    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Filesystem path of the SQLite database; a `sqlite://` scheme prefix
    /// is accepted and stripped.
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        let raw = self
            .database_url
            .strip_prefix("sqlite://")
            .unwrap_or(&self.database_url);
        PathBuf::from(raw)
    }

    /// Load config from a specific file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ServerConfig =
            toml::from_str(&content).map_err(|e| Error::Config(e.to_string()))?;
        Ok(config)
    }

    /// Search for config file in default locations and load if found.
    pub fn load_from_search_paths() -> Option<Self> {
        for path_str in Self::SEARCH_PATHS {
            let path = Path::new(path_str);
            if path.exists() {
                if let Ok(config) = Self::load(path) {
                    return Some(config);
                }
            }
        }
        None
    }

    /// Applies recognized environment variables on top of the loaded values.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(host) = env::var("HOST") {
            self.host = host;
        }
        if let Ok(port) = env::var("PORT") {
            self.port = port
                .parse()
                .map_err(|_| Error::Config(format!("invalid PORT value '{port}'")))?;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            self.database_url = url;
        }
        if let Ok(key) = env::var("ADMIN_API_KEY") {
            self.admin_api_key = Some(key);
        }
        if let Ok(origins) = env::var("CORS_ORIGINS") {
            self.cors_origins = Some(origins);
        }
        if let Ok(level) = env::var("LOG_LEVEL") {
            self.log_level = level;
        }
        Ok(())
    }

    /// Load config with environment and CLI overrides.
    ///
    /// Priority: CLI args > environment > config file > defaults
    pub fn load_with_overrides(
        config_path: Option<&Path>,
        overrides: ServerConfigOverrides,
    ) -> Result<Self> {
        let mut config = if let Some(path) = config_path {
            Self::load(path)?
        } else {
            Self::load_from_search_paths().unwrap_or_default()
        };

        config.apply_env()?;

        if let Some(host) = overrides.host {
            config.host = host;
        }
        if let Some(port) = overrides.port {
            config.port = port;
        }
        if let Some(database_url) = overrides.database_url {
            config.database_url = database_url;
        }

        Ok(config)
    }

    /// CORS layer for both the request path and the channel handshake.
    #[must_use]
    pub fn cors_layer(&self) -> CorsLayer {
        let Some(origins) = self.cors_origins.as_deref() else {
            return CorsLayer::new();
        };
        if origins.trim() == "*" {
            return CorsLayer::permissive();
        }
        let origins: Vec<HeaderValue> = origins
            .split(',')
            .filter_map(|origin| origin.trim().parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database_url: default_database_url(),
            admin_api_key: None,
            cors_origins: None,
            log_level: default_log_level(),
        }
    }
}
