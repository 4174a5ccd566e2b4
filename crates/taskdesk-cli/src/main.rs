//! taskdesk command-line tool.
//!
//! Inspects the configured roles and evaluates authorization decisions
//! without running the backend.
//!
//! # Quick Start
//!
//! ```bash
//! # List roles (built-ins plus those in ./taskdesk.toml)
//! taskdesk roles list
//!
//! # Would alice be allowed to delete a task?
//! taskdesk check delete_task --user alice
//!
//! # Ad hoc role set and explicit requirement
//! taskdesk check --role member --role guest --require tasks.view,tasks.create
//! ```

mod commands;
mod context;
mod style;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// taskdesk - role-based access control for the task/project backend.
#[derive(Parser)]
#[command(name = "taskdesk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Project directory holding taskdesk.toml.
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

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

    /// Role inspection commands.
    #[command(subcommand)]
    Roles(RoleCommands),

    /// Operation declaration commands.
    #[command(subcommand)]
    Operations(OperationCommands),

    /// Decide whether a caller may invoke an operation.
    ///
    /// Exits with status 0 when allowed and 2 when denied.
    Check {
        /// Operation to check (see `taskdesk operations list`).
        #[arg(required_unless_present = "require", conflicts_with = "require")]
        operation: Option<String>,

        /// Check these permission tokens instead of an operation.
        #[arg(long, value_delimiter = ',')]
        require: Vec<String>,

        /// Caller whose assigned roles are used.
        #[arg(short, long, required_unless_present = "role", conflicts_with = "role")]
        user: Option<String>,

        /// Role held by the caller (repeatable).
        #[arg(short, long)]
        role: Vec<String>,
    },

    /// Configuration management commands.
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum RoleCommands {
    /// List all roles.
    List {
        #[arg(short, long, value_enum, default_value = "table")]
        format: Format,
    },

    /// Show one role and its permissions.
    Show {
        /// Role name (case-insensitive).
        name: String,

        #[arg(short, long, value_enum, default_value = "table")]
        format: Format,
    },

    /// Show the effective permissions of a user.
    Effective {
        /// User id.
        user: String,
    },
}

#[derive(Subcommand)]
enum OperationCommands {
    /// List declared operations and their required permissions.
    List {
        #[arg(short, long, value_enum, default_value = "table")]
        format: Format,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show the merged configuration.
    Show {
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },

    /// Validate configuration and seed the role store from it.
    Validate,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Format {
    Table,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}

fn init_tracing(project: &std::path::Path) {
    // RUST_LOG wins; otherwise the configured filter.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let configured = taskdesk_config::ConfigLoader::new()
            .with_project_dir(project)
            .load_or_default()
            .logging
            .filter;
        tracing_subscriber::EnvFilter::try_new(configured)
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!style::plain())
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    style::configure(cli.no_color);
    init_tracing(&cli.project);

    let project = cli.project.as_path();
    match cli.command {
        Commands::Version => {
            commands::version::run();
            Ok(ExitCode::SUCCESS)
        }
        Commands::Roles(cmd) => {
            match cmd {
                RoleCommands::List { format } => commands::roles::list(project, format)?,
                RoleCommands::Show { name, format } => {
                    commands::roles::show(project, &name, format)?;
                }
                RoleCommands::Effective { user } => commands::roles::effective(project, &user)?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Operations(OperationCommands::List { format }) => {
            commands::operations::list(project, format)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check {
            operation,
            require,
            user,
            role,
        } => {
            let caller = match user {
                Some(user) => commands::check::Caller::User(user),
                None => commands::check::Caller::Roles(role),
            };
            let target = match operation {
                Some(operation) => commands::check::Target::Operation(operation),
                None => commands::check::Target::Tokens(require),
            };
            commands::check::run(project, &caller, &target)
        }
        Commands::Config(cmd) => {
            match cmd {
                ConfigCommands::Show { format } => commands::config::show(project, format)?,
                ConfigCommands::Validate => commands::config::validate(project)?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
