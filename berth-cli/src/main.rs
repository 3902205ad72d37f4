use anyhow::{Context, Result};
use berth_core::EngineConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "berth")]
#[command(about = "Deploy and manage Compose stacks on a container engine", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Container engine endpoint (unix:///var/run/docker.sock, tcp://host:2375)
    #[arg(long, global = true)]
    docker_host: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a stack from a compose file
    Deploy {
        /// Stack name
        name: String,

        /// Path to the compose file
        #[arg(short, long, default_value = "docker-compose.yml")]
        file: PathBuf,
    },

    /// List all stacks
    Ls {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show details of one stack
    Inspect {
        /// Stack name
        name: String,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Stop every container of a stack
    Stop {
        /// Stack name
        name: String,
    },

    /// Remove a stack's containers and networks
    Rm {
        /// Stack name
        name: String,

        /// Also remove the stack's volumes
        #[arg(long)]
        volumes: bool,

        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

fn load_config(cli: &Cli) -> Result<EngineConfig> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)
            .and_then(EngineConfig::with_env_overrides)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::load().context("Failed to load config")?,
    };

    if let Some(host) = &cli.docker_host {
        config.docker_host = Some(host.clone());
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    berth_core::init_observability(&config.log_level)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    match cli.command {
        Commands::Deploy { name, file } => {
            commands::stack::deploy(config, &name, &file).await?;
        }

        Commands::Ls { json } => {
            commands::stack::ls(&config, json).await?;
        }

        Commands::Inspect { name, json } => {
            commands::stack::inspect(&config, &name, json).await?;
        }

        Commands::Stop { name } => {
            commands::stack::stop(&config, &name).await?;
        }

        Commands::Rm { name, volumes, force } => {
            commands::stack::rm(&config, &name, volumes, force).await?;
        }
    }

    Ok(())
}
