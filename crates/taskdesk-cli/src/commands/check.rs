//! Authorization check command.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use taskdesk_rbac::{Decision, Identity, Role, RoleStore};
use taskdesk_types::{RoleName, UserId};

use crate::context::AppContext;
use crate::style::{print_allowed, print_denied};

/// Exit status of a denied check.
const DENIED: u8 = 2;

/// Whose permissions are checked.
pub enum Caller {
    /// A user whose roles come from the configured assignments.
    User(String),
    /// An ad hoc set of role names.
    Roles(Vec<String>),
}

/// What is checked.
pub enum Target {
    Operation(String),
    Tokens(Vec<String>),
}

fn identity(ctx: &AppContext, caller: &Caller) -> Result<Identity> {
    match caller {
        Caller::User(user) => Ok(Identity::load(ctx.store.as_ref(), UserId::from(user.as_str()))?),
        Caller::Roles(names) => {
            let roles = names
                .iter()
                .map(|raw| -> Result<Role> {
                    let name = RoleName::parse(raw)
                        .with_context(|| format!("Invalid role name '{raw}'"))?;
                    Ok(ctx.store.get_role(&name)?)
                })
                .collect::<Result<Vec<Role>>>()?;
            Ok(Identity::new("cli", roles))
        }
    }
}

pub fn run(project: &Path, caller: &Caller, target: &Target) -> Result<ExitCode> {
    let ctx = AppContext::load(project)?;
    let identity = identity(&ctx, caller)?;

    let (subject, decision) = match target {
        Target::Operation(operation) => (
            operation.clone(),
            ctx.guard.authorize_operation(&identity, operation),
        ),
        Target::Tokens(tokens) => (
            tokens.join(", "),
            ctx.guard.authorize(tokens, &identity.roles),
        ),
    };

    match decision {
        Decision::Allow => {
            print_allowed(&subject);
            Ok(ExitCode::SUCCESS)
        }
        Decision::Deny { missing } => {
            print_denied(&subject, missing.as_str());
            Ok(ExitCode::from(DENIED))
        }
    }
}
