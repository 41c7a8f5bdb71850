//! keepsafe operator tool.
//!
//! Removes backup locations and roles directly against the metadata store,
//! with the same dependent handling the service applies.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use keepsafe_core::RemoveMode;
use keepsafe_core::config::AppConfig;
use keepsafe_metadata::{ErrorKind, MetadataError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// keepsafe metadata administration
#[derive(Parser, Debug)]
#[command(name = "keepsafe-admin")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "KEEPSAFE_CONFIG",
        default_value = "config/keepsafe.toml"
    )]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check that the metadata store is reachable and migrated
    Check,

    /// Remove a backup location
    RemoveLocation {
        /// Location ID
        location_id: String,

        /// Also remove its artifacts, restore history and scheduled tasks
        #[arg(long)]
        force: bool,
    },

    /// Delete a role
    DeleteRole {
        /// Role ID
        role_id: i64,

        /// Role given to members for whom this was the last role.
        /// 0 or omitted leaves them without a role.
        #[arg(long, default_value_t = 0)]
        replacement: i64,
    },
}

fn load_config(path: &str) -> Result<AppConfig> {
    let config_path = std::path::Path::new(path);
    let mut figment = Figment::new();

    if config_path.exists() {
        tracing::debug!(config_path = %path, "Loading configuration from file");
        figment = figment.merge(Toml::file(path));
    } else {
        tracing::debug!("No config file found at {path}, using defaults and environment");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("KEEPSAFE_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .metadata
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid metadata configuration: {e}"))?;
    Ok(config)
}

/// Process exit code for a failed removal, by error class.
fn exit_code(err: &MetadataError) -> i32 {
    match err.kind() {
        ErrorKind::NotFound => 3,
        ErrorKind::InvalidArgument => 4,
        ErrorKind::FailedPrecondition | ErrorKind::InvalidOperation => 5,
        ErrorKind::AlreadyExists | ErrorKind::Internal => 1,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,keepsafe_metadata=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&args.config)?;
    let store = keepsafe_metadata::from_config(&config.metadata)
        .await
        .context("failed to open metadata store")?;

    let outcome = match args.command {
        Command::Check => store.health_check().await.map(|()| {
            println!("Metadata store OK");
        }),
        Command::RemoveLocation { location_id, force } => store
            .remove_location(&location_id, RemoveMode::from_force(force))
            .await
            .map(|report| {
                println!("Removed backup location {location_id}");
                if report.dependents_removed() > 0 {
                    println!("  restore history items: {}", report.restore_history_items);
                    println!("  artifacts:             {}", report.artifacts);
                    println!("  scheduled tasks:       {}", report.scheduled_tasks);
                }
            }),
        Command::DeleteRole {
            role_id,
            replacement,
        } => {
            let replacement = (replacement != 0).then_some(replacement);
            store.delete_role(role_id, replacement).await.map(|report| {
                println!("Deleted role {role_id}");
                println!("  users affected:         {}", report.users_affected);
                println!("  memberships removed:    {}", report.memberships_removed);
                println!("  memberships reassigned: {}", report.memberships_reassigned);
            })
        }
    };

    if let Err(err) = outcome {
        eprintln!("error: {err}");
        if err.kind() == ErrorKind::FailedPrecondition {
            eprintln!("hint: pass --force to remove the location together with its dependents");
        }
        std::process::exit(exit_code(&err));
    }
    Ok(())
}
