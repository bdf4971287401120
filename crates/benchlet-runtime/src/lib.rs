//! benchlet-runtime: Container launch layer
//!
//! This crate turns a scheduled job into a running container:
//! - Environment allow-list propagation with secret redaction
//! - Container invocation synthesis as a structured argument list
//! - Blocking execution through a container runtime CLI
//! - Multi-sink output mirroring

pub mod container;
pub mod context;
pub mod env;
pub mod invocation;
pub mod sink;
pub mod traits;

pub use container::{ContainerLauncher, DryRunLauncher};
pub use context::RunContext;
pub use env::{propagate, EnvSource, HostEnv};
pub use invocation::{ContainerInvocation, Mount};
pub use sink::TeeWriter;
pub use traits::{LaunchOutcome, Launcher};
