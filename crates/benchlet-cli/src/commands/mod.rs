//! CLI commands implementation

use anyhow::{Context, Result};
use benchlet_core::{validate_cache_dir, Device, EnvAllowList, HostLayout};
use benchlet_runtime::{propagate, ContainerInvocation, ContainerLauncher, HostEnv};
use std::path::PathBuf;
use tracing::info;

/// Parameters of `benchlet run`
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub image: String,
    pub script: Option<String>,
    pub hf_cache_dir: PathBuf,
    pub device: String,
    pub device_name: String,
    pub env_vars: PathBuf,
    pub runtime_binary: String,
    pub dry_run: bool,
    pub script_args: Vec<String>,
}

impl RunRequest {
    /// Reject a cache directory that does not end with `.cache/huggingface`
    pub fn validate(&self) -> Result<()> {
        validate_cache_dir(&self.hf_cache_dir)?;
        Ok(())
    }

    /// Resolve the request into an invocation
    pub fn invocation(&self, allow_list: &EnvAllowList) -> ContainerInvocation {
        let layout = HostLayout {
            cache_dir: self.hf_cache_dir.clone(),
            ..HostLayout::default()
        };
        let device = Device::new(&self.device, &self.device_name);

        ContainerInvocation::builder(&self.image)
            .device(&device)
            .layout(&layout)
            .env(propagate(allow_list, &HostEnv))
            .script(self.script.clone(), self.script_args.clone())
            .build()
    }
}

/// Run one container and return its exit code
pub async fn run(request: RunRequest) -> Result<i32> {
    request.validate()?;
    let allow_list = EnvAllowList::load(&request.env_vars)
        .context("Failed to load environment allow-list")?;
    let invocation = request.invocation(&allow_list);

    for mount in &invocation.mounts {
        info!(
            host = %mount.host.display(),
            container = %mount.container.display(),
            "Mounting"
        );
    }

    if request.dry_run {
        println!("{} {}", request.runtime_binary, invocation);
        return Ok(0);
    }

    let outcome = ContainerLauncher::new()
        .execute(
            &request.runtime_binary,
            &invocation,
            &request.hf_cache_dir,
            None,
        )
        .await?;

    info!(
        exit_code = outcome.exit_code,
        duration = ?outcome.duration,
        "Container exited"
    );

    Ok(outcome.exit_code)
}
