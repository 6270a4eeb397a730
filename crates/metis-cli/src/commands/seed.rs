//! Seed command - loads identities, projects, grants and analyses.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::style::{print_info_table, print_success};

pub fn run(project_dir: &Path, file: Option<&Path>) -> Result<()> {
    let config = super::load_config(project_dir)?;
    let data = super::seed_data(&config, file)?;
    let store = super::open_store(&config)?;

    let report = data.apply(&store).context("Failed to apply seed data")?;
    info!(inserted = report.total(), "seed applied");

    if report.is_empty() {
        print_success("Seed data already present, nothing inserted");
        return Ok(());
    }

    print_success("Seed data applied");
    print_info_table(&[
        ("Identities", report.identities.to_string()),
        ("Projects", report.containers.to_string()),
        ("Grants", report.grants.to_string()),
        ("Analyses", report.items.to_string()),
    ]);
    Ok(())
}
