//! Run summary

use benchlet_core::{BenchletResult, Device, JobOutcome};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Succeeded/failed counts for one device, keyed by device path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTally {
    pub device: String,
    pub path: String,
    pub succeeded: u32,
    pub failed: u32,
}

/// Outcomes of a fleet run, in dispatch order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    /// Run identifier
    pub run_id: Uuid,
    /// Number of round-robin passes performed
    pub passes: u32,
    /// Every recorded outcome
    pub outcomes: Vec<JobOutcome>,
    /// Per-device counts, in device catalog order
    pub devices: Vec<DeviceTally>,
}

impl RunSummary {
    /// Empty summary with a zeroed tally for each device
    pub fn new<'a>(run_id: Uuid, devices: impl IntoIterator<Item = &'a Device>) -> Self {
        Self {
            run_id,
            passes: 0,
            outcomes: Vec::new(),
            devices: devices
                .into_iter()
                .map(|device| DeviceTally {
                    device: device.name.clone(),
                    path: device.path.clone(),
                    ..DeviceTally::default()
                })
                .collect(),
        }
    }

    /// Record one outcome
    pub fn record(&mut self, outcome: JobOutcome) {
        let idx = match self
            .devices
            .iter()
            .position(|t| t.path == outcome.key.device_path)
        {
            Some(idx) => idx,
            None => {
                self.devices.push(DeviceTally {
                    device: outcome.key.device.clone(),
                    path: outcome.key.device_path.clone(),
                    ..DeviceTally::default()
                });
                self.devices.len() - 1
            }
        };

        if outcome.status.is_success() {
            self.devices[idx].succeeded += 1;
        } else {
            self.devices[idx].failed += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    /// Tally for the device at `path`
    pub fn tally(&self, path: &str) -> Option<&DeviceTally> {
        self.devices.iter().find(|t| t.path == path)
    }

    /// Human-readable report of every job and the per-device counts
    pub fn render(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!(
            "{:<20} {:<40} {:<30} {:>10}\n",
            "DEVICE", "MODEL", "STATUS", "DURATION"
        ));
        out.push_str(&format!("{}\n", "-".repeat(103)));
        for outcome in &self.outcomes {
            out.push_str(&format!(
                "{:<20} {:<40} {:<30} {:>9.1}s\n",
                outcome.key.device,
                outcome.key.model,
                outcome.status.to_string(),
                outcome.duration.as_secs_f64()
            ));
        }

        out.push('\n');
        out.push_str(&format!(
            "{:<20} {:<24} {:>10} {:>10}\n",
            "DEVICE", "PATH", "SUCCEEDED", "FAILED"
        ));
        for tally in &self.devices {
            out.push_str(&format!(
                "{:<20} {:<24} {:>10} {:>10}\n",
                tally.device, tally.path, tally.succeeded, tally.failed
            ));
        }
        out.push_str(&format!(
            "\n{} jobs: {} succeeded, {} failed\n",
            self.total(),
            self.succeeded(),
            self.failed()
        ));
        out
    }

    /// Write the summary as JSON to `<dir>/summary-<run id>.json`
    pub fn write_json(&self, dir: &Path) -> BenchletResult<std::path::PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("summary-{}.json", self.run_id));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;

        info!(path = %path.display(), "Run summary written");
        Ok(path)
    }
}
