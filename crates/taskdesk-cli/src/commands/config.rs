//! Configuration management commands.

use std::path::Path;

use anyhow::{Context, Result};
use taskdesk_config::{Paths, TaskdeskConfig};
use taskdesk_rbac::RoleStore;

use crate::ConfigFormat;
use crate::context::AppContext;
use crate::style::{print_field, print_notice, print_ok};

/// Show the merged configuration.
pub fn show(project: &Path, format: ConfigFormat) -> Result<()> {
    let config =
        TaskdeskConfig::load_from_dir(project).context("Failed to load configuration")?;

    match format {
        ConfigFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
        ConfigFormat::Toml => print!("{}", config.to_toml_string()?),
    }

    Ok(())
}

/// Validate configuration and the role store seeded from it.
pub fn validate(project: &Path) -> Result<()> {
    if !Paths::is_initialized(project) {
        print_notice(&format!(
            "No taskdesk.toml in {}, using defaults",
            project.display()
        ));
    }

    let ctx = AppContext::load(project)?;
    let roles = ctx.store.list_roles()?;

    print_ok("Configuration is valid");
    print_field("Super role", &ctx.config.rbac.super_role);
    print_field("Roles", &roles.len().to_string());
    print_field("Assignments", &ctx.config.assignments.len().to_string());
    Ok(())
}
