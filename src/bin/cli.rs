//! RHACbot CLI
//!
//! Runs the control panel API and offers a few offline inspection commands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rhacbot::{
    config::{self, DEFAULT_CONFIG_PATH},
    error::{AppError, Result},
    models::{Config, Region, SelectionNode},
    server::{self, AppState},
    services::{ChatRegistry, SelectionTree},
    utils::log as console,
};

/// RHACbot - residence hall floor chat broadcaster
#[derive(Parser, Debug)]
#[command(
    name = "rhacbot",
    version,
    about = "Register floor GroupMe chats and broadcast announcements to them"
)]
struct Cli {
    /// Directory containing data/config.toml and the buildings file
    #[arg(short, long, default_value = ".")]
    base_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API until Ctrl-C
    Serve {
        /// Override the listen address (e.g. 0.0.0.0:5000)
        #[arg(long)]
        bind: Option<String>,
    },

    /// Validate configuration and building data
    Validate,

    /// List buildings
    Buildings {
        /// Only buildings in this region
        #[arg(long)]
        region: Option<String>,
    },

    /// Canonicalize raw selection values (region-all, region-North, 12, ...)
    Canonicalize {
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Show environment, registry location and registrations per building
    Info,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let configured_level = Config::load(cli.base_dir.join(DEFAULT_CONFIG_PATH))
        .map(|c| c.logging.level)
        .unwrap_or_else(|_| "info".to_string());
    init_logging(cli.verbose, &configured_level);

    let (mut config, directory) = config::load_all(&cli.base_dir)?;
    log::debug!(
        "Loaded configuration from {} (env={})",
        cli.base_dir.display(),
        config.env
    );

    match cli.command {
        Command::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            config.validate()?;
            config::ensure_admin_password(&mut config);

            log::info!(
                "RHACbot starting (env={}, {} buildings)",
                config.env,
                directory.len()
            );
            let bind = config.server.bind.clone();
            let state = AppState::from_config(&config, directory)?;
            server::serve(state, &bind).await?;
        }

        Command::Validate => {
            console::header("Validating configuration");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            console::success("Config OK");

            for missing in config.missing_required() {
                console::sub_item(&format!("missing: {missing}"));
            }

            let tree = SelectionTree::from_directory(&directory);
            let items: Vec<(&str, String)> = tree
                .regions()
                .map(|region| (region.as_str(), tree.buildings_in(region).len().to_string()))
                .collect();
            console::summary(
                &format!("{} buildings in {} regions", directory.len(), items.len()),
                &items,
            );

            if directory.is_empty() {
                log::warn!("No buildings loaded from {}", config.paths.buildings_file);
            }
        }

        Command::Buildings { region } => {
            let region = region
                .map(|r| {
                    Region::parse(&r)
                        .ok_or_else(|| AppError::validation(format!("Invalid region: {r}")))
                })
                .transpose()?;

            for building in directory.all() {
                if region.is_some_and(|r| building.region != r) {
                    continue;
                }
                println!(
                    "{:>3}  {:<28} {:<6} {}",
                    building.id, building.name, building.region, building.address
                );
            }
        }

        Command::Canonicalize { values } => {
            let raw = values
                .iter()
                .map(|v| SelectionNode::parse(v))
                .collect::<Result<Vec<_>>>()?;

            let tree = SelectionTree::from_directory(&directory);
            let canonical = tree.canonicalize(&raw);
            let output = serde_json::json!({
                "selection": canonical.labeled(&directory),
                "targets": canonical.to_targets(&tree),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Info => {
            let registry = ChatRegistry::from_config(&config);
            let database = match config.database_path() {
                Some(path) if path.exists() => format!("{} (exists)", path.display()),
                Some(path) => format!("{} (not found)", path.display()),
                None => "none (in-memory only)".to_string(),
            };

            let grouped = registry.list_by_buildings(&directory.ids()).await?;
            let total: usize = grouped.values().map(Vec::len).sum();

            console::summary(
                "RHACbot",
                &[
                    ("env", config.env.clone()),
                    ("database", database),
                    ("backend", registry.backend().await.to_string()),
                    ("buildings", directory.len().to_string()),
                    ("registered chats", total.to_string()),
                ],
            );

            let per_building: Vec<(&str, String)> = grouped
                .iter()
                .filter(|(_, chats)| !chats.is_empty())
                .map(|(id, chats)| (directory.name_of(*id), chats.len().to_string()))
                .collect();
            if !per_building.is_empty() {
                console::summary("Registrations per building", &per_building);
            }
        }
    }

    Ok(())
}
