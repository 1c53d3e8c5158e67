//! # Delta Core Node
//!
//! Entry point for the delta consensus node.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use deltacore::{init_tracing, parse_peer_id, LogFormat, Node, NodeOptions, DEFAULT_CONFIG_FILE};
use deltacore_config::Config;
use tracing::{info, warn};

/// Delta consensus node and tools
#[derive(Parser, Debug)]
#[command(name = "deltacore")]
#[command(version)]
#[command(about = "Delta consensus node - deterministic delta production and election")]
#[command(long_about = None)]
struct Cli {
    /// Enable verbose logging (can be repeated for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format: text, json, or compact (defaults to the config file)
    #[arg(long)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run a producing node
    Run {
        /// Configuration file path; defaults apply when it does not exist
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,

        /// Hex-encoded identity of this node (random when omitted)
        #[arg(long)]
        peer_id: Option<String>,

        /// Hex-encoded identity of another producer (repeatable)
        #[arg(long = "producer")]
        producers: Vec<String>,
    },

    /// Write the default configuration
    InitConfig {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a configuration file
    CheckConfig {
        /// Configuration file path
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        config: PathBuf,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            peer_id,
            producers,
        } => {
            let config = load_or_default(&config)?;
            let format = cli
                .log_format
                .unwrap_or_else(|| LogFormat::from_config(&config.logging));
            init_tracing(format, &config.logging, cli.verbose)?;
            handle_run(config, peer_id, producers).await
        }
        Commands::InitConfig { output } => handle_init_config(output),
        Commands::CheckConfig { config } => handle_check_config(&config),
        Commands::Version => {
            println!("deltacore {}", deltacore::VERSION);
            Ok(())
        }
    }
}

fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        Ok(Config::load(path)?)
    } else {
        eprintln!(
            "config file {} not found, using defaults",
            path.display()
        );
        Ok(Config::default())
    }
}

/// Handle the `run` command
async fn handle_run(config: Config, peer_id: Option<String>, producers: Vec<String>) -> Result<()> {
    let mut options = match peer_id {
        Some(id) => NodeOptions::single(parse_peer_id(&id)?),
        None => {
            warn!("no peer id given, generating a random identity");
            NodeOptions::generate()
        }
    };
    for producer in &producers {
        options.producers.push(parse_peer_id(producer)?);
    }

    info!(
        version = deltacore::VERSION,
        peer = %options.local_peer,
        producers = options.producers.len(),
        "starting delta core"
    );

    let node = Node::new(config, options)?;
    node.run().await
}

/// Handle the `init-config` command
fn handle_init_config(output: Option<PathBuf>) -> Result<()> {
    let config = Config::default();
    match output {
        Some(path) => {
            config.save(&path)?;
            println!("wrote default configuration to {}", path.display());
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}

/// Handle the `check-config` command
fn handle_check_config(path: &Path) -> Result<()> {
    let config = Config::load(path)?;
    config.validate()?;
    println!("{} is valid", path.display());
    Ok(())
}
