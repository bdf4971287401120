//! Launcher trait definitions

use async_trait::async_trait;
use benchlet_core::{BenchletResult, Job};
use std::time::Duration;

use crate::context::RunContext;

/// Result of a container run that was successfully invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// Exit code of the container process; -1 when killed by a signal
    pub exit_code: i32,
    /// Time from spawn to exit
    pub duration: Duration,
}

/// Runs one job to completion
#[async_trait]
pub trait Launcher: Send + Sync {
    /// Launch `job` and block until it exits.
    ///
    /// A non-zero exit is reported in the outcome; `Err` means the runtime
    /// itself could not be invoked.
    async fn launch(&self, job: Job, ctx: &RunContext) -> BenchletResult<LaunchOutcome>;

    /// Get the launcher name
    fn name(&self) -> &'static str;
}
