//! Model, Job and JobOutcome type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

use crate::device::Device;

/// A workload descriptor from the model catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    /// Model reference (e.g. "Qwen/Qwen3-8B")
    pub name: String,
    /// Workload kind, forwarded to the runner script as --model-type
    #[serde(alias = "type", default)]
    pub kind: String,
    /// Names of devices this model must never run on
    #[serde(alias = "disabled_on", default)]
    pub excluded_devices: BTreeSet<String>,
}

impl Model {
    /// Create a model with no exclusions
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            excluded_devices: BTreeSet::new(),
        }
    }

    /// Builder-style helper to exclude a device by name
    pub fn excluding(mut self, device_name: impl Into<String>) -> Self {
        self.excluded_devices.insert(device_name.into());
        self
    }

    /// Arguments handed to the in-container script for this model
    pub fn script_args(&self) -> Vec<String> {
        vec![
            "--model".to_string(),
            self.name.clone(),
            "--model-type".to_string(),
            self.kind.clone(),
        ]
    }

    /// Model name usable as a single path segment
    pub fn path_segment(&self) -> String {
        self.name.replace('/', "_")
    }
}

/// One (device, model) pairing scheduled for execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Unique job identifier
    pub id: Uuid,
    /// Target device
    pub device: Device,
    /// Model to run
    pub model: Model,
    /// Script to run inside the container; `None` opens an interactive shell
    pub script: Option<String>,
    /// Arguments forwarded to the script
    pub extra_args: Vec<String>,
}

impl Job {
    /// Create a job for a device/model pair with the model's script arguments
    pub fn new(device: Device, model: Model, script: Option<String>) -> Self {
        let extra_args = model.script_args();
        Self {
            id: Uuid::new_v4(),
            device,
            model,
            script,
            extra_args,
        }
    }

    /// Log directory for this job, relative to the shared log root.
    ///
    /// This is the directory the in-container runner writes to for the
    /// same `DEVICE_NAME` and model.
    pub fn log_scope(&self) -> PathBuf {
        PathBuf::from(self.device.env_name()).join(self.model.path_segment())
    }

    /// Launcher log for this job, relative to the shared log root.
    ///
    /// Devices may share a name, so the file name carries the device path.
    pub fn launcher_log(&self) -> PathBuf {
        let file = format!("launcher-{}.log", self.device.path_segment());
        self.log_scope().join(file)
    }

    pub fn key(&self) -> JobKey {
        JobKey {
            job_id: self.id,
            device: self.device.name.clone(),
            device_path: self.device.path.clone(),
            model: self.model.name.clone(),
        }
    }
}

/// How a job ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    /// Container exited with code 0
    Succeeded,
    /// Container exited non-zero (or was killed by a signal, reported as -1)
    Failed { exit_code: i32 },
    /// The container runtime could not be invoked
    LaunchFailed { message: String },
}

impl JobStatus {
    /// Map a process exit code onto a status
    pub fn from_exit_code(exit_code: i32) -> Self {
        if exit_code == 0 {
            JobStatus::Succeeded
        } else {
            JobStatus::Failed { exit_code }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Succeeded)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Succeeded => write!(f, "Succeeded"),
            JobStatus::Failed { exit_code } => write!(f, "Failed (exit {})", exit_code),
            JobStatus::LaunchFailed { message } => write!(f, "LaunchFailed ({})", message),
        }
    }
}

/// Identity of a job, kept after the job itself is handed to the launcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobKey {
    /// Job identifier
    pub job_id: Uuid,
    /// Device name the job ran on
    pub device: String,
    /// Device path the job ran on, unique within the fleet
    pub device_path: String,
    /// Model name
    pub model: String,
}

/// Recorded result of one dispatched job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobOutcome {
    #[serde(flatten)]
    pub key: JobKey,
    /// Final status
    pub status: JobStatus,
    /// Wall-clock time spent in the launcher
    pub duration: Duration,
    /// When the job was handed to the launcher
    pub started_at: DateTime<Utc>,
}

impl JobOutcome {
    pub fn new(key: JobKey, status: JobStatus, duration: Duration, started_at: DateTime<Utc>) -> Self {
        Self {
            key,
            status,
            duration,
            started_at,
        }
    }
}
