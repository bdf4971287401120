//! Per-device assignment queues

use benchlet_core::{Device, Job, Model};
use std::collections::VecDeque;
use tracing::debug;

use crate::eligibility::eligible;

/// Ordered work for one device.
///
/// Each queue is self-contained, so it can be drained by the shared
/// round-robin loop or by a dedicated per-device worker.
#[derive(Debug, Clone)]
pub struct DeviceQueue {
    device: Device,
    models: VecDeque<Model>,
}

impl DeviceQueue {
    /// Queue of every model in `catalog` eligible for `device`, in catalog order
    pub fn build(device: Device, catalog: &[Model]) -> Self {
        let models: VecDeque<Model> = catalog
            .iter()
            .filter(|model| eligible(&device, model))
            .cloned()
            .collect();

        debug!(
            device = %device,
            queued = models.len(),
            skipped = catalog.len() - models.len(),
            "Built device queue"
        );

        Self { device, models }
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Queued model names, front first
    pub fn model_names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name.as_str()).collect()
    }

    /// Pop the next model and wrap it in a job
    pub fn next_job(&mut self, script: Option<String>) -> Option<Job> {
        let model = self.models.pop_front()?;
        Some(Job::new(self.device.clone(), model, script))
    }
}

/// One queue per enabled device, in device catalog order
pub fn build_queues(devices: &[Device], models: &[Model]) -> Vec<DeviceQueue> {
    devices
        .iter()
        .filter(|device| !device.disabled)
        .map(|device| DeviceQueue::build(device.clone(), models))
        .collect()
}

/// Total number of jobs the queues will produce
pub fn total_jobs(queues: &[DeviceQueue]) -> usize {
    queues.iter().map(DeviceQueue::len).sum()
}
