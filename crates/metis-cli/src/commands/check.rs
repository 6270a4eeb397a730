//! Check command - evaluates one access request offline.

use std::path::Path;

use anyhow::{Context, Result, bail};
use metis_directory::ResourceStore;
use metis_rbac::{AccessEvaluator, Action};
use metis_types::ContainerId;

use crate::style::colors::SemanticStyle;
use crate::style::print_info_table;

pub fn run(project_dir: &Path, user: &str, project: &str, action: Action) -> Result<()> {
    let config = super::load_config(project_dir)?;
    let store = super::open_store(&config)?;

    let Some(identity) = store
        .find_identity_by_name(user)
        .context("Failed to look up identity")?
    else {
        bail!("Unknown identity '{user}'");
    };

    let evaluator = AccessEvaluator::new(&store);
    let decision = evaluator.evaluate(&identity, &ContainerId::new(project), action);

    let verdict = if decision.allow {
        "allow".success()
    } else {
        "deny".error()
    };
    println!("{verdict}");

    print_info_table(&[
        (
            "Identity",
            format!("{} ({})", identity.display_name, identity.id),
        ),
        ("Role", identity.role.to_string()),
        ("Project", project.to_string()),
        ("Action", action.to_string()),
        ("Rule", decision.rule.as_str().to_string()),
        ("Reason", decision.reason()),
    ]);
    Ok(())
}
