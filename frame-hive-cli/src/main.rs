//! hive: host driver for the Frame Hive registry
//!
//! Replays blocks of calls against a registry, printing one JSON line of
//! receipts per block, and optionally persists the resulting ledger as a
//! JSON snapshot so later runs can resume from it.

mod script;
mod settings;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use frame_hive::{Principal, Registry};
use tracing::info;

use script::BlockScript;

#[derive(Parser)]
#[command(name = "hive")]
#[command(about = "Replay call blocks against a Frame Hive registry")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "frame-hive.yaml", env = "FRAME_HIVE_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply a block script and print receipts
    Replay {
        /// JSON block script
        script: PathBuf,

        /// Ledger snapshot to start from
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Write the resulting ledger back to --state
        #[arg(long, requires = "state")]
        save: bool,
    },
    /// Print a principal's reputation from a snapshot
    Reputation {
        principal: String,

        #[arg(short, long)]
        state: PathBuf,
    },
    /// Print the effective configuration as YAML
    Config,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = settings::load(&cli.config)?;

    // Initialize tracing
    let level = &config.general.log_level;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("frame_hive={}", level).parse()?)
                .add_directive(format!("hive={}", level).parse()?),
        )
        .init();

    if cli.config.exists() {
        info!("Config file: {}", cli.config.display());
    } else {
        info!("Config file not found, using defaults");
    }

    match cli.command {
        Command::Replay {
            script,
            state,
            save,
        } => {
            let ledger = match &state {
                Some(path) => script::load_state(path)?,
                None => Default::default(),
            };
            let mut registry = Registry::with_state(config, ledger)?;
            let blocks = BlockScript::load(&script)?;

            for block in script::replay(&mut registry, &blocks) {
                println!("{}", serde_json::to_string(&block)?);
            }

            let stats = registry.stats();
            info!(
                photos = stats.photos,
                galleries = stats.galleries,
                collaborations = stats.collaborations,
                accounts = stats.reputation_accounts,
                "Replay finished"
            );

            if let (true, Some(path)) = (save, &state) {
                script::save_state(path, registry.state())?;
            }
        }
        Command::Reputation { principal, state } => {
            let registry = Registry::with_state(config, script::load_state(&state)?)?;
            let reputation = registry.get_user_reputation(&Principal::new(principal));
            println!("{}", serde_json::to_string(&reputation)?);
        }
        Command::Config => {
            print!("{}", config.to_yaml()?);
        }
    }

    Ok(())
}
