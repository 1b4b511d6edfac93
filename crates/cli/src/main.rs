mod extension_commands;
mod terminal_prompt;

use std::{path::PathBuf, sync::Arc};

use {
    clap::{Parser, Subcommand},
    plugport_extensions::{
        ExtensionRegistry, ExtensionService, IndexStore, JsonSettingsStore, Subscription,
    },
    tracing::{debug, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use crate::terminal_prompt::TerminalPrompt;

#[derive(Parser)]
#[command(name = "plugport", about = "Plugport, extension manager", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Accept every suggested path without prompting.
    #[arg(short, long, global = true, default_value_t = false)]
    yes: bool,

    /// Custom config directory (overrides default ~/.config/plugport/).
    #[arg(long, global = true, env = "PLUGPORT_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
    /// Custom data directory (overrides default data dir).
    #[arg(long, global = true, env = "PLUGPORT_DATA_DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover and register extensions under the given paths.
    Import {
        /// Directories or manifest files. Defaults to the configured search paths.
        paths: Vec<PathBuf>,
        /// Directory levels to descend (defaults to the configured depth).
        #[arg(long)]
        depth: Option<usize>,
        /// Ask for the paths interactively.
        #[arg(long, conflicts_with = "paths")]
        dialog: bool,
    },
    /// List registered extensions.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the manifest of an extension.
    Show { id: String },
    /// Print the entry script of an extension.
    Source { id: String },
    /// Unregister an extension. Files on disk are left alone.
    Remove { id: String },
    /// Create a new extension package from local files.
    New {
        /// Suggested directory name for the package.
        dir_name: String,
        /// Files to include; one of them must be manifest.json.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Copy files to a chosen destination.
    Export {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Keep paths relative to this directory instead of flattening.
        #[arg(long)]
        base: Option<PathBuf>,
    },
    /// Watch registered manifests and report changes.
    #[cfg(feature = "file-watcher")]
    Watch,
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file path in use (or where one would be created).
    Path,
    /// Write a config file with the current settings.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Service plus the subscription that keeps the on-disk index in sync.
struct App {
    service: ExtensionService,
    default_depth: usize,
    _index: Subscription,
}

fn build_app(cli: &Cli) -> anyhow::Result<App> {
    if let Some(ref dir) = cli.config_dir {
        plugport_config::set_config_dir(dir.clone());
    }
    if let Some(ref dir) = cli.data_dir {
        plugport_config::set_data_dir(dir.clone());
    }

    let config = plugport_config::discover_and_load();
    let data_dir = plugport_config::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    debug!(data_dir = %data_dir.display(), "using data directory");

    let registry = Arc::new(ExtensionRegistry::new());
    let index = Arc::new(IndexStore::new(IndexStore::default_path()));
    let subscription = index.attach(&registry)?;
    let settings = Arc::new(JsonSettingsStore::open(JsonSettingsStore::default_path())?);
    let prompt = Arc::new(TerminalPrompt::new(cli.yes));

    let default_depth = config.extensions.depth;
    Ok(App {
        service: ExtensionService::new(registry, prompt, settings, config.extensions),
        default_depth,
        _index: subscription,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "plugport starting");

    let app = build_app(&cli)?;
    let service = &app.service;

    match cli.command {
        Commands::Import {
            paths,
            depth,
            dialog,
        } => {
            extension_commands::handle_import(service, paths, depth, dialog, app.default_depth)
                .await
        },
        Commands::List { json } => extension_commands::handle_list(service, json).await,
        Commands::Show { id } => extension_commands::handle_show(service, id).await,
        Commands::Source { id } => extension_commands::handle_source(service, id).await,
        Commands::Remove { id } => extension_commands::handle_remove(service, id),
        Commands::New { dir_name, files } => {
            extension_commands::handle_new(service, dir_name, files).await
        },
        Commands::Export { files, base } => {
            extension_commands::handle_export(service, files, base).await
        },
        #[cfg(feature = "file-watcher")]
        Commands::Watch => extension_commands::handle_watch(service).await,
        Commands::Config { action } => handle_config(action),
    }
}

fn handle_config(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Path => {
            println!("{}", plugport_config::find_or_default_config_path().display());
        },
        ConfigAction::Init { force } => {
            let path = plugport_config::find_or_default_config_path();
            if path.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
            }
            let written = plugport_config::save_config(&plugport_config::discover_and_load())?;
            println!("Wrote {}", written.display());
        },
    }
    Ok(())
}
