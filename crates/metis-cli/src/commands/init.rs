//! Initialize command - creates a new Metis project.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use metis_config::{MetisConfig, Paths};
use metis_directory::sqlite::migrations;

use crate::style::{
    colors::SemanticStyle, print_code_example, print_hint, print_labeled, print_spacer,
    print_success, print_warn,
};

const GITIGNORE: &str = "# Metis local state\n.metis/\n\n# Local config overrides\nmetis.local.toml\n";

pub fn run(project_dir: &Path, force: bool) -> Result<()> {
    let config_path = Paths::project_config_file(project_dir);

    if Paths::is_initialized(project_dir) && !force {
        bail!(
            "Project already initialized in {}. metis.toml already exists (use --force to overwrite).",
            project_dir.display()
        );
    }

    fs::create_dir_all(Paths::state_dir(project_dir))
        .context("Failed to create state directory")?;

    let config = MetisConfig::initial();
    config
        .write_to(&config_path)
        .context("Failed to write metis.toml")?;
    if force {
        print_warn("Overwrote metis.toml; existing sessions are no longer valid");
    }

    let gitignore_path = project_dir.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(&gitignore_path, GITIGNORE).context("Failed to write .gitignore")?;
    }

    // Load through the normal layers so env overrides of database.path apply.
    let loaded = super::load_config(project_dir)?;
    let store = super::open_store(&loaded)?;
    drop(store);

    print_spacer();
    print_success("Project initialized");
    print_spacer();
    print_labeled("Config", &config_path.display().to_string());
    print_labeled("Database", &loaded.database.path.display().to_string());
    print_labeled(
        "Schema",
        &format!("version {}", migrations::latest_version()),
    );

    print_spacer();
    println!("{}", "Next steps:".header());
    print_hint("Load the demo data:");
    print_code_example("metis seed");
    print_hint("Start the server:");
    print_code_example("metis start");

    Ok(())
}
