//! # volmount-core
//!
//! Per-volume mount coordination for container workloads.
//!
//! This crate provides:
//! - **Registry**: a process-wide map from volume key to a dedicated lock,
//!   so unrelated volumes never serialize behind each other.
//! - **Mount collaborators**: node path resolution, mount point probing,
//!   and the external mount command, each behind a trait.
//! - **Coordinator**: idempotent, ordered mounting of a batch of volumes
//!   that yields the bind specs a container runtime needs.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod coordinator;
pub mod error;
pub mod mount;
pub mod registry;

pub use coordinator::MountCoordinator;
pub use error::{MountError, MountExecutionError};
pub use registry::MutexRegistry;
pub use tokio_util::sync::CancellationToken;
