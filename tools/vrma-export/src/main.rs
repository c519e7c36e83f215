//! vrma-export - humanoid glTF animation to VRM Animation (.vrma)

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use vrma_export::{ConvertOptions, ExportConfig, VRMA_EXT, config, convert};

#[derive(Parser)]
#[command(name = "vrma-export")]
#[command(about = "Export humanoid glTF animations as VRM Animation (.vrma)")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export one animation clip
    Convert {
        /// Input glTF/GLB/VRM file
        input: PathBuf,

        /// Output .vrma file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Animation name or index (default: first animation)
        #[arg(short, long)]
        animation: Option<String>,

        /// Export config (vrma.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Resolve expressions from channel names, ignoring VRMC_vrm
        #[arg(long)]
        direct_expressions: bool,
    },

    /// List animations, humanoid bones and morph channels
    List {
        /// Input glTF/GLB/VRM file
        input: PathBuf,

        /// Export config (vrma.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ExportConfig> {
    match path {
        Some(path) => config::load_config(path),
        None => Ok(ExportConfig::default()),
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Convert {
            input,
            output,
            animation,
            config,
            direct_expressions,
        } => {
            let output = output.unwrap_or_else(|| input.with_extension(VRMA_EXT));
            let options = ConvertOptions {
                animation,
                config: load_config(config.as_ref())?,
                direct_expressions,
            };
            tracing::info!("Converting {:?} -> {:?}", input, output);
            convert::convert_gltf(&input, &output, &options)?;
            tracing::info!("Done!");
        }

        Commands::List { input, config } => {
            let config = load_config(config.as_ref())?;
            convert::list_gltf(&input, &config)?;
        }
    }

    Ok(())
}
