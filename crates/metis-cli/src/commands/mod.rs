//! CLI command implementations.

pub mod check;
pub mod init;
pub mod seed;
pub mod start;
pub mod token;
pub mod version;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use metis_config::{MetisConfig, Paths};
use metis_directory::{SeedData, SqliteDirectory};
use metis_server::SessionConfig;
use tracing::debug;

/// Loads and validates the project's configuration.
pub fn load_config(project_dir: &Path) -> Result<MetisConfig> {
    if !Paths::is_initialized(project_dir) {
        bail!(
            "Project not initialized. Run 'metis init' in {} first.",
            project_dir.display()
        );
    }

    let config = MetisConfig::load_from_dir(project_dir)?;
    config.validate()?;
    debug!(config = ?config, "configuration loaded");
    Ok(config)
}

/// Opens (and migrates) the configured database.
pub fn open_store(config: &MetisConfig) -> Result<SqliteDirectory> {
    SqliteDirectory::open(&config.database.path).with_context(|| {
        format!(
            "Failed to open database at {}",
            config.database.path.display()
        )
    })
}

/// Picks the seed source: an explicit file, then `seed.file`, then the demo.
pub fn seed_data(config: &MetisConfig, file: Option<&Path>) -> Result<SeedData> {
    match file.or(config.seed.file.as_deref()) {
        Some(path) => SeedData::load(path)
            .with_context(|| format!("Failed to load seed file {}", path.display())),
        None => Ok(SeedData::demo()),
    }
}

/// Session settings derived from `[auth]` and `[server]`.
pub fn session_config(config: &MetisConfig) -> SessionConfig {
    SessionConfig::new(config.auth.secret.clone())
        .with_ttl(Duration::from_secs(config.auth.session_ttl_secs))
        .with_issuer(config.auth.issuer.clone())
        .with_cookie_name(config.auth.cookie_name.clone())
        .with_secure_cookie(config.server.production)
}
