//! benchlet-scheduler: Fleet scheduling for benchlet
//!
//! This crate turns catalogs into work and drives it:
//! - Device/model eligibility
//! - Per-device assignment queues
//! - Round-robin dispatch with per-job failure isolation
//! - Run summaries

pub mod dispatch;
pub mod eligibility;
pub mod queue;
pub mod summary;

pub use dispatch::Dispatcher;
pub use eligibility::eligible;
pub use queue::{build_queues, total_jobs, DeviceQueue};
pub use summary::{DeviceTally, RunSummary};
