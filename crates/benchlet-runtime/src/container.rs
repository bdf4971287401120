//! Container-based launcher
//!
//! Each job runs as a blocking `docker run` (or compatible CLI) process.
//! Output of non-interactive runs is mirrored to the console and to a log
//! file under `<logs>/<device>/<model>/launcher-<device path>.log`.

use async_trait::async_trait;
use benchlet_core::{BenchletError, BenchletResult, Job};
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::context::RunContext;
use crate::env::{propagate, EnvSource, HostEnv};
use crate::invocation::ContainerInvocation;
use crate::sink::TeeWriter;
use crate::traits::{LaunchOutcome, Launcher};

const PUMP_BUFFER: usize = 8 * 1024;

/// Launches jobs through a container runtime CLI
pub struct ContainerLauncher {
    env: Box<dyn EnvSource>,
}

impl Default for ContainerLauncher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerLauncher {
    /// Launcher reading the host process environment
    pub fn new() -> Self {
        Self::with_env_source(HostEnv)
    }

    /// Launcher reading variables from `source`
    pub fn with_env_source(source: impl EnvSource + 'static) -> Self {
        Self {
            env: Box::new(source),
        }
    }

    /// Resolve the invocation for a job without running it
    pub fn prepare(&self, job: &Job, ctx: &RunContext) -> ContainerInvocation {
        let env = propagate(&ctx.allow_list, self.env.as_ref());
        ContainerInvocation::for_job(job, ctx, env)
    }

    /// Execute a resolved invocation and wait for it to exit.
    ///
    /// When `log_file` is given and the run is not interactive, output is
    /// mirrored into it.
    pub async fn execute(
        &self,
        runtime_binary: &str,
        invocation: &ContainerInvocation,
        cache_dir: &Path,
        log_file: Option<PathBuf>,
    ) -> BenchletResult<LaunchOutcome> {
        tokio::fs::create_dir_all(cache_dir).await.map_err(|e| {
            BenchletError::Launch(format!(
                "Failed to create cache dir {}: {}",
                cache_dir.display(),
                e
            ))
        })?;

        info!(
            runtime = runtime_binary,
            command = %invocation,
            "Running container"
        );

        let mut cmd = Command::new(runtime_binary);
        cmd.args(invocation.args());

        let started = Instant::now();
        let waited = if invocation.interactive {
            cmd.stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
            let mut child = spawn(&mut cmd, runtime_binary)?;
            child.wait().await
        } else {
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            let mut child = spawn(&mut cmd, runtime_binary)?;

            let (out_sink, err_sink) = open_sinks(log_file.as_deref()).await;
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();

            let (out, err, status) = tokio::join!(
                pump(stdout, out_sink),
                pump(stderr, err_sink),
                child.wait()
            );
            for result in [out, err] {
                if let Err(e) = result {
                    warn!(error = %e, "Failed to mirror container output");
                }
            }
            status
        };
        let status = waited.map_err(|e| {
            error!(error = %e, "Failed to wait for container");
            BenchletError::Launch(format!("Failed to wait for {}: {}", runtime_binary, e))
        })?;

        let outcome = LaunchOutcome {
            exit_code: exit_code(status),
            duration: started.elapsed(),
        };

        if outcome.exit_code != 0 {
            warn!(exit_code = outcome.exit_code, "Container exited with failure");
        } else {
            debug!(duration = ?outcome.duration, "Container exited");
        }

        Ok(outcome)
    }
}

#[async_trait]
impl Launcher for ContainerLauncher {
    async fn launch(&self, job: Job, ctx: &RunContext) -> BenchletResult<LaunchOutcome> {
        info!(
            job_id = %job.id,
            device = %job.device,
            model = %job.model.name,
            "Launching job"
        );

        let invocation = self.prepare(&job, ctx);
        let log_file = ctx.layout.logs_dir.join(job.launcher_log());

        self.execute(
            &ctx.runtime_binary,
            &invocation,
            &ctx.layout.cache_dir,
            Some(log_file),
        )
        .await
    }

    fn name(&self) -> &'static str {
        "container"
    }
}

/// Prints the invocation for each job instead of running it
#[derive(Debug, Default)]
pub struct DryRunLauncher {
    inner: ContainerLauncher,
}

impl DryRunLauncher {
    pub fn new(inner: ContainerLauncher) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Launcher for DryRunLauncher {
    async fn launch(&self, job: Job, ctx: &RunContext) -> BenchletResult<LaunchOutcome> {
        let invocation = self.inner.prepare(&job, ctx);
        println!("{} {}", ctx.runtime_binary, invocation);
        Ok(LaunchOutcome {
            exit_code: 0,
            duration: std::time::Duration::ZERO,
        })
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

impl std::fmt::Debug for ContainerLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerLauncher").finish_non_exhaustive()
    }
}

fn spawn(cmd: &mut Command, runtime_binary: &str) -> BenchletResult<tokio::process::Child> {
    cmd.spawn().map_err(|e| {
        error!(runtime = runtime_binary, error = %e, "Failed to spawn container runtime");
        BenchletError::Launch(format!("Failed to invoke {}: {}", runtime_binary, e))
    })
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Stdout and stderr writers, each mirroring into the per-job log file
/// when it can be opened
async fn open_sinks(log_file: Option<&Path>) -> (TeeWriter, TeeWriter) {
    let out = TeeWriter::new().with_sink(std::io::stdout());
    let err = TeeWriter::new().with_sink(std::io::stderr());

    let Some(path) = log_file else {
        return (out, err);
    };

    if let Some(parent) = path.parent() {
        if let Err(e) = tokio::fs::create_dir_all(parent).await {
            warn!(path = %parent.display(), error = %e, "Failed to create job log dir");
            return (out, err);
        }
    }

    let opened = std::fs::File::create(path).and_then(|file| {
        let clone = file.try_clone()?;
        Ok((file, clone))
    });
    match opened {
        Ok((file, clone)) => {
            debug!(path = %path.display(), "Mirroring container output");
            (out.with_sink(file), err.with_sink(clone))
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to open job log");
            (out, err)
        }
    }
}

/// Copy raw bytes from a child pipe into `sink` until EOF.
///
/// The pipe is drained even after the sink fails, so the child never
/// blocks or dies on a closed pipe.
async fn pump<R>(reader: Option<R>, mut sink: TeeWriter) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    use std::io::Write;

    let Some(mut reader) = reader else {
        return Ok(());
    };

    let mut buf = vec![0u8; PUMP_BUFFER];
    let mut mirroring = true;
    loop {
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        if mirroring {
            if let Err(e) = sink.write_all(&buf[..n]) {
                warn!(error = %e, "Failed to mirror container output, discarding the rest");
                mirroring = false;
            }
        }
    }
}
