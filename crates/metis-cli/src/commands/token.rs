//! Token command - issues a session token without going through login.

use std::path::Path;

use anyhow::{Context, Result, bail};
use metis_directory::ResourceStore;
use metis_server::AuthService;

pub fn run(project_dir: &Path, user: &str) -> Result<()> {
    let config = super::load_config(project_dir)?;
    let store = super::open_store(&config)?;

    let Some(identity) = store
        .find_identity_by_name(user)
        .context("Failed to look up identity")?
    else {
        bail!("Unknown identity '{user}'");
    };

    let auth = AuthService::new(super::session_config(&config));
    let token = auth
        .issue_token(&identity)
        .context("Failed to sign session token")?;

    // Bare token on stdout for `Authorization: Bearer $(metis token ...)`.
    println!("{token}");
    Ok(())
}
