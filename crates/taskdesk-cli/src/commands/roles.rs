//! Role inspection commands.

use std::path::Path;

use anyhow::{Context, Result};
use taskdesk_rbac::codec::{RoleRecord, encode_permissions};
use taskdesk_rbac::{EffectivePermissions, Role, RoleStore};
use taskdesk_types::{RoleName, UserId};

use crate::Format;
use crate::context::AppContext;
use crate::style::{print_field, print_notice, print_table, print_title};

fn row(role: &Role) -> Vec<String> {
    vec![
        role.name().to_string(),
        role.display_name().to_string(),
        if role.is_system() { "yes" } else { "no" }.to_string(),
        encode_permissions(role.permissions()),
    ]
}

pub fn list(project: &Path, format: Format) -> Result<()> {
    let ctx = AppContext::load(project)?;
    let roles = ctx.store.list_roles()?;

    match format {
        Format::Json => {
            let records: Vec<RoleRecord> = roles.iter().map(RoleRecord::from).collect();
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Format::Table => {
            let rows: Vec<Vec<String>> = roles.iter().map(row).collect();
            print_table(&["Name", "Display name", "System", "Permissions"], &rows, "role");
        }
    }

    Ok(())
}

pub fn show(project: &Path, name: &str, format: Format) -> Result<()> {
    let ctx = AppContext::load(project)?;
    let name = RoleName::parse(name).with_context(|| format!("Invalid role name '{name}'"))?;
    let role = ctx.store.get_role(&name)?;

    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(&RoleRecord::from(&role))?);
        }
        Format::Table => {
            print_title(&format!("Role {}", role.name()));
            print_field("Display name", role.display_name());
            print_field("System", if role.is_system() { "yes" } else { "no" });
            if ctx.guard.aggregator().bypasses(&role) {
                print_field("Permissions", "all (bypasses every check)");
            } else {
                let rows: Vec<Vec<String>> = role
                    .permissions()
                    .tokens()
                    .map(|token| vec![token.to_string()])
                    .collect();
                print_table(&["Permission"], &rows, "permission");
            }
        }
    }

    Ok(())
}

pub fn effective(project: &Path, user: &str) -> Result<()> {
    let ctx = AppContext::load(project)?;
    let user = UserId::from(user);
    let roles = ctx.store.roles_for_user(&user)?;

    print_title(&format!("User {user}"));
    let names: Vec<String> = roles.iter().map(|role| role.name().to_string()).collect();
    print_field("Roles", &names.join(", "));

    match ctx.guard.resolve(&roles) {
        EffectivePermissions::AllowAll => print_field("Permissions", "all"),
        EffectivePermissions::Set(set) if set.is_empty() => {
            print_notice("No permissions granted");
        }
        EffectivePermissions::Set(set) => {
            let rows: Vec<Vec<String>> = set.iter().map(|token| vec![token.to_string()]).collect();
            print_table(&["Permission"], &rows, "permission");
        }
    }

    Ok(())
}
