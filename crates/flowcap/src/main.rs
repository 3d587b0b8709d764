mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use flowcap_engine::config::{ConfigLoader, FlowcapConfig};
use flowcap_engine::settings::PageDetectionMode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flowcap", version, about = "Capture web requests as workflow actions")]
struct Args {
    /// Config file (defaults: $FLOWCAP_CONFIG, ./flowcap.yaml, ~/.flowcap/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the background context behind the extension bridge
    Serve {
        /// WebSocket port (overrides the config file)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print the workflow action synthesized for a request described in JSON
    Classify {
        /// File with {"method", "url", "headers", "body"}
        file: PathBuf,
    },
    /// Manage favorite actions
    Favorites {
        #[command(subcommand)]
        command: FavoritesCommand,
    },
    /// Show or change user settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommand,
    },
    /// Load actions from the external template source
    Templates {
        /// Source URL (defaults to the one stored in settings)
        url: Option<String>,
        /// Ignore the one-hour cache
        #[arg(long)]
        refresh: bool,
    },
}

#[derive(Subcommand)]
enum FavoritesCommand {
    List,
    Search { query: String },
    Remove { id: String },
    Export { path: PathBuf },
    Import { path: PathBuf },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    Mode { mode: ModeArg },
    Reset,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Automatic,
    Override,
    Classic,
    Modern,
}

impl From<ModeArg> for PageDetectionMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Automatic => PageDetectionMode::Automatic,
            ModeArg::Override => PageDetectionMode::OverrideRecording,
            ModeArg::Classic => PageDetectionMode::ClassicEditor,
            ModeArg::Modern => PageDetectionMode::ModernEditor,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries command output, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config).await?;

    match args.command {
        Command::Serve { port } => commands::serve(config, port).await,
        Command::Classify { file } => commands::classify(&file).await,
        Command::Favorites { command } => match command {
            FavoritesCommand::List => commands::favorites_list(&config).await,
            FavoritesCommand::Search { query } => {
                commands::favorites_search(&config, &query).await
            }
            FavoritesCommand::Remove { id } => commands::favorites_remove(&config, &id).await,
            FavoritesCommand::Export { path } => {
                commands::favorites_export(&config, &path).await
            }
            FavoritesCommand::Import { path } => {
                commands::favorites_import(&config, &path).await
            }
        },
        Command::Settings { command } => match command {
            SettingsCommand::Show => commands::settings_show(&config).await,
            SettingsCommand::Mode { mode } => commands::settings_mode(&config, mode.into()).await,
            SettingsCommand::Reset => commands::settings_reset(&config).await,
        },
        Command::Templates { url, refresh } => commands::templates(&config, url, refresh).await,
    }
}

async fn load_config(path: Option<PathBuf>) -> anyhow::Result<FlowcapConfig> {
    let config = match path {
        Some(path) => ConfigLoader::load_from(&path).await?,
        None => ConfigLoader::load_default().await?,
    };
    Ok(config)
}
