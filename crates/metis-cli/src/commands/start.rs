//! Start command - runs the Metis HTTP server.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use metis_server::{AuthService, RequestHandler, Server, ServerConfig};
use tracing::info;

use crate::style::{print_labeled, print_spacer};

pub fn run(project_dir: &Path, address: Option<&str>) -> Result<()> {
    let config = super::load_config(project_dir)?;

    let bind_addr = match address {
        Some(address) => parse_address(address)?,
        None => config.server.socket_addr()?,
    };

    let store = Arc::new(super::open_store(&config)?);
    if config.seed.on_start {
        let report = super::seed_data(&config, None)?
            .apply(store.as_ref())
            .context("Failed to apply seed data")?;
        info!(inserted = report.total(), "seed applied on start");
    }

    let auth = AuthService::new(super::session_config(&config));
    let handler = RequestHandler::new(store, auth);

    let server_config = ServerConfig::new(bind_addr)
        .with_max_connections(config.server.max_connections)
        .with_idle_timeout(Duration::from_secs(config.server.idle_timeout_secs));

    let mut server = Server::new(server_config, handler)
        .context("Failed to create server")?
        .with_signal_handling()
        .context("Failed to install signal handlers")?;

    print_spacer();
    println!("Metis access control server");
    print_spacer();
    print_labeled("Database", &config.database.path.display().to_string());
    print_labeled("Listening", &server.local_addr()?.to_string());
    if config.server.production {
        print_labeled("Mode", "production (secure cookies)");
    }
    print_spacer();
    println!("Server is ready. Press Ctrl+C to stop.");

    server.run().context("Server error during operation")?;

    print_spacer();
    println!("Server stopped gracefully.");
    Ok(())
}

/// Parses an address string into a `SocketAddr`.
///
/// Accepts:
/// - Port only: "3000" -> "127.0.0.1:3000"
/// - Full address: "127.0.0.1:3000"
/// - IPv6: `[::1]:3000`
fn parse_address(address: &str) -> Result<SocketAddr> {
    if let Ok(addr) = address.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(port) = address.parse::<u16>() {
        return Ok(SocketAddr::from(([127, 0, 0, 1], port)));
    }

    bail!(
        "Invalid address '{address}'. Use a port (e.g., '3000') or full address (e.g., '127.0.0.1:3000')"
    );
}
