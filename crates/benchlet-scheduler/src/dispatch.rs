//! Round-robin dispatch loop

use benchlet_core::{Job, JobOutcome, JobStatus};
use benchlet_runtime::{Launcher, RunContext};
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::queue::{total_jobs, DeviceQueue};
use crate::summary::RunSummary;

/// Drives per-device queues to completion, one job per device per pass.
///
/// Jobs run strictly one at a time. A failed job (non-zero exit or launch
/// error) is recorded and the loop moves on.
pub struct Dispatcher {
    launcher: Arc<dyn Launcher>,
    ctx: RunContext,
}

impl Dispatcher {
    pub fn new(launcher: Arc<dyn Launcher>, ctx: RunContext) -> Self {
        Self { launcher, ctx }
    }

    /// Run every queued job and return the recorded outcomes
    pub async fn run(&self, mut queues: Vec<DeviceQueue>) -> RunSummary {
        let mut summary = RunSummary::new(
            self.ctx.run_id,
            queues.iter().map(|q| q.device()),
        );

        info!(
            run_id = %self.ctx.run_id,
            launcher = self.launcher.name(),
            devices = queues.len(),
            jobs = total_jobs(&queues),
            "Starting fleet run"
        );

        while queues.iter().any(|q| !q.is_empty()) {
            summary.passes += 1;
            debug!(pass = summary.passes, "Starting dispatch pass");

            for queue in queues.iter_mut() {
                let Some(job) = queue.next_job(self.ctx.script.clone()) else {
                    continue;
                };
                let outcome = self.run_job(job).await;
                summary.record(outcome);
            }
        }

        info!(
            run_id = %self.ctx.run_id,
            passes = summary.passes,
            succeeded = summary.succeeded(),
            failed = summary.failed(),
            "Fleet run complete"
        );

        summary
    }

    /// Launch one job, converting every failure into a recorded status
    async fn run_job(&self, job: Job) -> JobOutcome {
        let key = job.key();
        let started_at = Utc::now();
        let started = Instant::now();

        let (status, duration) = match self.launcher.launch(job, &self.ctx).await {
            Ok(launched) => (JobStatus::from_exit_code(launched.exit_code), launched.duration),
            Err(e) => (
                JobStatus::LaunchFailed {
                    message: e.to_string(),
                },
                started.elapsed(),
            ),
        };

        if status.is_success() {
            info!(
                device = %key.device,
                path = %key.device_path,
                model = %key.model,
                status = %status,
                duration = ?duration,
                "Job finished"
            );
        } else {
            warn!(
                device = %key.device,
                path = %key.device_path,
                model = %key.model,
                status = %status,
                duration = ?duration,
                "Job failed"
            );
        }

        JobOutcome::new(key, status, duration, started_at)
    }
}
