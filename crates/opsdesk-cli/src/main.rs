//! OpsDesk CLI - operator tooling for dashboard page permissions and the
//! audit trail.
//!
//! Every command runs against the data file named by `storage.data_path`
//! (default `~/.opsdesk/data.json`), which holds both profiles and audit
//! entries.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use opsdesk_config::Config;
use opsdesk_core::{Principal, Role, UserId};
use opsdesk_telemetry::{LogConfig, LogFormat, RequestContext};
use tracing::Instrument as _;

mod app;
mod commands;
mod config_bridge;
mod theme;

use app::Services;
use commands::audit::FilterArgs;
use commands::{access, audit, config};

/// Exit code of `access check` when access is denied.
const EXIT_DENIED: u8 = 2;

/// OpsDesk - page permissions and audit trail
#[derive(Parser)]
#[command(name = "opsdesk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Extra config file, merged above the user config
    #[arg(short, long, global = true, env = "OPSDESK_CONFIG")]
    config: Option<PathBuf>,

    /// Data file, overriding `storage.data_path`
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// User id recorded as the actor of audited changes
    #[arg(long, global = true, env = "OPSDESK_ACTOR", default_value = "operator")]
    actor: String,

    /// Email recorded for the actor
    #[arg(long, global = true, env = "OPSDESK_ACTOR_EMAIL")]
    actor_email: Option<String>,

    /// Print machine-readable JSON where supported
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check and grant page permissions
    Access {
        #[command(subcommand)]
        command: AccessCommands,
    },

    /// Record, list, export and scan audit entries
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },

    /// View and validate configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum AccessCommands {
    /// Check whether a user may open a page (exit code 2 when denied)
    Check {
        /// User id
        #[arg(long)]
        user: UserId,
        /// Email of the user, recorded if the check is denied
        #[arg(long)]
        email: Option<String>,
        /// Page route, e.g. /senhas
        #[arg(long)]
        path: String,
    },
    /// Set a user's role and page allow-list
    Grant {
        /// User id
        #[arg(long)]
        user: UserId,
        /// Role: admin or user
        #[arg(long, default_value = "user")]
        role: Role,
        /// Allowed routes, comma separated
        #[arg(long, value_delimiter = ',', conflicts_with = "unrestricted")]
        paths: Vec<String>,
        /// Remove the allow-list (every page)
        #[arg(long)]
        unrestricted: bool,
        /// Full name shown in the audit trail
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand)]
enum AuditCommands {
    /// Record an audit entry as the actor
    Record {
        /// Action type, e.g. CREATE or PASSWORD_VIEWED
        #[arg(long)]
        action: opsdesk_audit::ActionType,
        /// Affected record id
        #[arg(long)]
        record: Option<String>,
        /// Table of the affected record
        #[arg(long)]
        table: Option<String>,
        /// Human-readable description
        #[arg(long)]
        description: String,
        /// Record state before, as a JSON object
        #[arg(long)]
        old: Option<String>,
        /// Record state after, as a JSON object
        #[arg(long)]
        new: Option<String>,
    },
    /// List entries, newest first
    List {
        #[command(flatten)]
        filter: FilterArgs,
        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: usize,
        /// Entries per page (defaults to `query.default_page_size`)
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Export matching entries as CSV
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Scan a user's recent activity for suspicious patterns
    Scan {
        /// User id
        #[arg(long)]
        user: UserId,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show resolved configuration with source annotations
    Show {
        /// Output format (toml or json)
        #[arg(short, long, default_value = "toml")]
        format: String,
        /// Show only a specific section (e.g. audit, detector)
        #[arg(short, long)]
        section: Option<String>,
    },
    /// Validate the current configuration
    Validate,
    /// Show config file paths being checked
    Paths,
}

fn actor(cli: &Cli) -> Result<Principal> {
    let id = UserId::new(&cli.actor)?;
    let email = cli
        .actor_email
        .clone()
        .unwrap_or_else(|| format!("{}@localhost", cli.actor));
    Ok(Principal::new(id, email))
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = Config::load(cli.config.as_deref());

    // Set up logging from config, with --verbose override.
    let log_config = if let Ok(resolved) = &loaded {
        let mut lc = config_bridge::to_log_config(&resolved.config);
        if cli.verbose {
            "debug".clone_into(&mut lc.level);
        }
        lc
    } else {
        // Fallback if config loading fails.
        let level = if cli.verbose { "debug" } else { "warn" };
        LogConfig::new(level).with_format(LogFormat::Compact)
    };
    if let Err(e) = opsdesk_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match &cli.command {
        Commands::Config { command } => handle_config(&cli, command),
        Commands::Access { command } => {
            let services = open_services(&cli, loaded?.config)?;
            handle_access(&cli, &services, command).await
        },
        Commands::Audit { command } => {
            let services = open_services(&cli, loaded?.config)?;
            handle_audit(&cli, &services, command).await?;
            Ok(ExitCode::SUCCESS)
        },
    }
}

fn open_services(cli: &Cli, config: Config) -> Result<Services> {
    let path = match &cli.data {
        Some(p) => p.clone(),
        None => config_bridge::data_path(&config)?,
    };
    Services::open(config, &path)
}

async fn handle_access(cli: &Cli, services: &Services, command: &AccessCommands) -> Result<ExitCode> {
    match command {
        AccessCommands::Check { user, email, path } => {
            let principal = Principal::new(
                user.clone(),
                email.clone().unwrap_or_else(|| format!("{user}@localhost")),
            );
            let ctx = RequestContext::new("cli")
                .with_operation("access check")
                .with_user_id(user.as_str());
            let allowed = access::check(services, &principal, path, cli.json)
                .instrument(ctx.span())
                .await?;
            Ok(if allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(EXIT_DENIED)
            })
        },
        AccessCommands::Grant {
            user,
            role,
            paths,
            unrestricted,
            name,
        } => {
            let actor = actor(cli)?;
            let ctx = RequestContext::new("cli")
                .with_operation("access grant")
                .with_user_id(actor.id.as_str());
            let grant = access::Grant {
                user: user.clone(),
                role: *role,
                paths: (!*unrestricted && !paths.is_empty()).then(|| paths.clone()),
                full_name: name.clone(),
            };
            access::grant(services, &actor, grant)
                .instrument(ctx.span())
                .await?;
            Ok(ExitCode::SUCCESS)
        },
    }
}

async fn handle_audit(cli: &Cli, services: &Services, command: &AuditCommands) -> Result<()> {
    let actor = actor(cli)?;
    let ctx = RequestContext::new("cli").with_user_id(actor.id.as_str());

    match command {
        AuditCommands::Record {
            action,
            record,
            table,
            description,
            old,
            new,
        } => {
            let request = audit::RecordRequest {
                action: *action,
                record_id: record.clone(),
                table: table.clone(),
                description: description.clone(),
                old_data: old.clone(),
                new_data: new.clone(),
            };
            audit::record(services, &actor, request)
                .instrument(ctx.with_operation("audit record").span())
                .await
        },
        AuditCommands::List {
            filter,
            page,
            page_size,
        } => {
            audit::list(services, filter, *page, *page_size, cli.json)
                .instrument(ctx.with_operation("audit list").span())
                .await
        },
        AuditCommands::Export { filter, output } => {
            audit::export(services, &actor, filter, output.as_deref())
                .instrument(ctx.with_operation("audit export").span())
                .await
        },
        AuditCommands::Scan { user } => {
            audit::scan(services, user, cli.json)
                .instrument(ctx.with_operation("audit scan").span())
                .await
        },
    }
}

fn handle_config(cli: &Cli, command: &ConfigCommands) -> Result<ExitCode> {
    let explicit = cli.config.as_deref();
    match command {
        ConfigCommands::Show { format, section } => {
            config::show_config(explicit, format, section.as_deref())?;
        },
        ConfigCommands::Validate => {
            if !config::validate_config(explicit) {
                return Ok(ExitCode::FAILURE);
            }
        },
        ConfigCommands::Paths => config::show_paths(),
    }
    Ok(ExitCode::SUCCESS)
}
