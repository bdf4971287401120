//! benchlet-core: Core types for the benchlet fleet dispatcher
//!
//! This crate provides the fundamental types used throughout benchlet:
//! - Device and model catalog records
//! - Jobs and their recorded outcomes
//! - Configuration types and catalog loading
//! - Error handling

pub mod config;
pub mod device;
pub mod error;
pub mod model;

pub use config::*;
pub use device::*;
pub use error::*;
pub use model::*;
