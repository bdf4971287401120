//! benchlet fleet driver
//!
//! Runs every model in the model catalog on every eligible device in the
//! device catalog, one container at a time, round-robin across devices.

use anyhow::Context;
use benchlet_core::{BenchletError, Catalog, EnvAllowList, FleetConfig};
use benchlet_runtime::{ContainerLauncher, DryRunLauncher, Launcher, RunContext};
use benchlet_scheduler::{build_queues, Dispatcher};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// benchlet-fleet - benchmark every model on every eligible accelerator
#[derive(Parser, Debug)]
#[command(name = "benchlet-fleet")]
#[command(version, about, long_about = None)]
struct Args {
    /// Settings file (TOML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Name of the script to run inside the containers
    #[arg(long)]
    script: Option<String>,

    /// Container image to run
    #[arg(long)]
    docker_image: Option<String>,

    /// Maximum concurrent jobs (advisory; jobs currently run one at a time)
    #[arg(long, default_value_t = 1)]
    num_procs: u32,

    /// Device catalog, overriding the settings file
    #[arg(long)]
    devices: Option<PathBuf>,

    /// Model catalog, overriding the settings file
    #[arg(long)]
    models: Option<PathBuf>,

    /// Environment allow-list, overriding the settings file
    #[arg(long)]
    env_vars: Option<PathBuf>,

    /// Container runtime binary
    #[arg(long)]
    container_runtime: Option<String>,

    /// Print each container invocation instead of running it
    #[arg(long)]
    dry_run: bool,

    /// Exit non-zero when any job fails
    #[arg(long)]
    fail_on_job_error: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = FleetConfig::load(args.config.as_deref())?;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    init_logging(&config.logging.level);

    info!("Starting benchlet fleet driver v{}", env!("CARGO_PKG_VERSION"));

    apply_overrides(&mut config, &args);
    config.layout.validate()?;

    let catalog = Catalog::load(&config.catalog.devices, &config.catalog.models)
        .context("Failed to load catalogs")?;
    let allow_list = EnvAllowList::load(&config.catalog.env_vars)
        .context("Failed to load environment allow-list")?;

    if args.num_procs > 1 {
        warn!(
            num_procs = args.num_procs,
            "Parallel dispatch is not supported yet, running jobs one at a time"
        );
    }

    let queues = build_queues(&catalog.devices, &catalog.models);
    for queue in &queues {
        info!(
            device = %queue.device(),
            models = ?queue.model_names(),
            "Device queue"
        );
    }

    let ctx = RunContext::from_config(&config.launcher, config.layout.clone(), allow_list);
    let launcher: Arc<dyn Launcher> = if args.dry_run {
        Arc::new(DryRunLauncher::default())
    } else {
        Arc::new(ContainerLauncher::new())
    };

    let dispatcher = Dispatcher::new(launcher, ctx);
    let summary = dispatcher.run(queues).await;

    println!();
    print!("{}", summary.render());

    if !args.dry_run {
        if let Err(e) = summary.write_json(&config.layout.logs_dir) {
            warn!(error = %e, "Failed to write run summary");
        }
    }

    if args.fail_on_job_error && summary.failed() > 0 {
        return Err(BenchletError::Launch(format!(
            "{} of {} jobs failed",
            summary.failed(),
            summary.total()
        ))
        .into());
    }

    Ok(())
}

/// Command-line flags take precedence over the settings file
fn apply_overrides(config: &mut FleetConfig, args: &Args) {
    if let Some(script) = &args.script {
        config.launcher.script = script.clone();
    }
    if let Some(image) = &args.docker_image {
        config.launcher.image = image.clone();
    }
    if let Some(runtime) = &args.container_runtime {
        config.launcher.runtime_binary = runtime.clone();
    }
    if let Some(path) = &args.devices {
        config.catalog.devices = path.clone();
    }
    if let Some(path) = &args.models {
        config.catalog.models = path.clone();
    }
    if let Some(path) = &args.env_vars {
        config.catalog.env_vars = path.clone();
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
