//! Metis command-line interface.
//!
//! Role-based access control for projects and their analyses.
//!
//! # Quick Start
//!
//! ```bash
//! # Write metis.toml, create .metis/ and migrate the database
//! metis init
//!
//! # Load the demo identities, projects and analyses
//! metis seed
//!
//! # Ask the evaluator a question without starting the server
//! metis check --user reader --project 2 --action read
//!
//! # Serve the HTTP API
//! metis start --address 3000
//! ```

mod commands;
mod style;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use metis_rbac::Action;
use tracing_subscriber::EnvFilter;

/// Metis - role-based access control for projects and analyses.
#[derive(Parser)]
#[command(name = "metis")]
#[command(author, version, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory holding metis.toml and .metis/.
    #[arg(long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show version information.
    Version,

    /// Initialize a project: config file, state directory and database.
    Init {
        /// Overwrite an existing metis.toml (generates a new session secret).
        #[arg(long)]
        force: bool,
    },

    /// Load seed data into the database.
    Seed {
        /// TOML seed file. Defaults to `seed.file` from the config, then the demo data.
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Start the HTTP server.
    Start {
        /// Address to bind to (port only: 3000, or full: 127.0.0.1:3000).
        #[arg(short, long)]
        address: Option<String>,
    },

    /// Evaluate an access request against the database.
    Check {
        /// Identity display name.
        #[arg(short, long)]
        user: String,

        /// Project (container) id.
        #[arg(short, long)]
        project: String,

        /// Action to evaluate: read or write.
        #[arg(short, long, default_value = "read")]
        action: Action,
    },

    /// Print a session token for an identity.
    Token {
        /// Identity display name.
        #[arg(short, long)]
        user: String,
    },
}

fn main() -> Result<()> {
    // Logs go to stderr so command output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    style::set_no_color(cli.no_color);
    let project_dir = cli.project_dir.as_path();

    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(())
        }
        Commands::Init { force } => commands::init::run(project_dir, force),
        Commands::Seed { file } => commands::seed::run(project_dir, file.as_deref()),
        Commands::Start { address } => commands::start::run(project_dir, address.as_deref()),
        Commands::Check {
            user,
            project,
            action,
        } => commands::check::run(project_dir, &user, &project, action),
        Commands::Token { user } => commands::token::run(project_dir, &user),
    }
}
