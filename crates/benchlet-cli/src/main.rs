//! benchlet CLI
//!
//! Launches a single benchmark container bound to one accelerator.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// benchlet - run benchmark containers on accelerator devices
#[derive(Parser, Debug)]
#[command(name = "benchlet")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run an existing image on one device
    Run {
        /// Container image to run
        #[arg(long, default_value = benchlet_core::DEFAULT_IMAGE)]
        image_name: String,

        /// Script to run inside the container (interactive shell when omitted)
        #[arg(long)]
        script: Option<String>,

        /// Host folder mounted as the container's huggingface cache
        #[arg(long, default_value = "./.cache/huggingface")]
        hf_cache_dir: PathBuf,

        /// Device path, e.g. /dev/dri/renderD128
        #[arg(long)]
        device: String,

        /// Human-readable device name
        #[arg(long)]
        device_name: String,

        /// Environment allow-list
        #[arg(long, default_value = "yaml/env_vars.yaml")]
        env_vars: PathBuf,

        /// Container runtime binary
        #[arg(long, default_value = "docker")]
        container_runtime: String,

        /// Print the container invocation instead of running it
        #[arg(long)]
        dry_run: bool,

        /// Arguments forwarded to the script
        #[arg(last = true)]
        script_args: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    match cli.command {
        Commands::Run {
            image_name,
            script,
            hf_cache_dir,
            device,
            device_name,
            env_vars,
            container_runtime,
            dry_run,
            script_args,
        } => {
            let request = commands::RunRequest {
                image: image_name,
                script,
                hf_cache_dir,
                device,
                device_name,
                env_vars,
                runtime_binary: container_runtime,
                dry_run,
                script_args,
            };
            let exit_code = commands::run(request).await?;
            if exit_code != 0 {
                eprintln!("Container run failed with exit code {}", exit_code);
                std::process::exit(exit_code);
            }
        }
    }

    Ok(())
}
