//! Configuration management for Metis
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence, applied by the binary)
//! 2. Environment variables (`METIS_<SECTION>__<KEY>`)
//! 3. metis.local.toml (gitignored, local overrides)
//! 4. metis.toml (git-tracked, project config)
//! 5. ~/.config/metis/config.toml (user defaults)
//! 6. Built-in defaults (lowest precedence)

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Metis configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetisConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub max_connections: usize,
    pub idle_timeout_secs: u64,
    /// Marks session cookies `Secure`.
    pub production: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            max_connections: 1024,
            idle_timeout_secs: 30,
            production: false,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_address.parse().map_err(|_| {
            ConfigError::ValidationError(format!(
                "server.bind_address '{}' is not a socket address",
                self.bind_address
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".metis/metis.sqlite3"),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HMAC key for session tokens.
    pub secret: String,
    pub session_ttl_secs: u64,
    pub issuer: String,
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            session_ttl_secs: 3600,
            issuer: "metis".to_string(),
            cookie_name: "session_token".to_string(),
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret", &"<redacted>")
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("issuer", &self.issuer)
            .field("cookie_name", &self.cookie_name)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedConfig {
    /// Apply seed data when the server starts.
    pub on_start: bool,
    /// TOML seed file; the demo fixture when unset.
    pub file: Option<PathBuf>,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            on_start: true,
            file: None,
        }
    }
}

/// Generates a random 256-bit session secret, base64url encoded.
pub fn generate_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl MetisConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// The configuration written by `metis init`: defaults plus a fresh secret.
    pub fn initial() -> Self {
        Self {
            auth: AuthConfig {
                secret: generate_secret(),
                ..AuthConfig::default()
            },
            ..Self::default()
        }
    }

    /// Checks values that would otherwise fail later at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "auth.secret must be set (run `metis init` or set METIS_AUTH__SECRET)".to_string(),
            ));
        }
        if self.auth.session_ttl_secs == 0 {
            return Err(ConfigError::ValidationError(
                "auth.session_ttl_secs must be greater than zero".to_string(),
            ));
        }
        if self.server.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "server.max_connections must be greater than zero".to_string(),
            ));
        }
        self.server.socket_addr()?;
        Ok(())
    }

    /// Resolve relative paths to absolute
    pub fn resolve_paths(&mut self, base_dir: impl AsRef<Path>) {
        let base = base_dir.as_ref();

        if self.database.path.is_relative() {
            self.database.path = base.join(&self.database.path);
        }

        if let Some(file) = self.seed.file.as_mut().filter(|f| f.is_relative()) {
            *file = base.join(&*file);
        }
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes the configuration to `path` as TOML.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_toml_string()?).map_err(|source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        })
    }
}
