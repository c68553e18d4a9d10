//! Error types for volume mounting.

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;
use volmount_common::error::VolmountError;
use volmount_common::types::VolumeKey;

/// Failure of a single mount command.
#[derive(Debug, Error)]
pub enum MountExecutionError {
    /// The mount program could not be started.
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Waiting on the mount program failed.
    #[error("failed to wait for {program}: {source}")]
    Wait {
        /// Program that was invoked.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The mount program ran and reported failure.
    #[error("{program} failed: {status}{}", stderr_suffix(.stderr))]
    Failed {
        /// Program that was invoked.
        program: String,
        /// Exit status as reported by the OS.
        status: ExitStatus,
        /// Leading part of the program's stderr, trimmed.
        stderr: String,
    },

    /// The mount did not finish within the configured bound.
    #[error("mount timed out after {0:?}")]
    TimedOut(Duration),

    /// The caller cancelled while the mount was running.
    #[error("mount cancelled")]
    Cancelled,

    /// Failure reported by an executor that does not spawn a process.
    #[error("{0}")]
    Backend(String),
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Error returned by [`MountCoordinator::mount_all`](crate::MountCoordinator::mount_all).
///
/// Every variant except [`InvalidVolume`](Self::InvalidVolume) names the
/// volume that stopped the batch and its node mount path.
#[derive(Debug, Error)]
pub enum MountError {
    /// A descriptor was rejected before any volume was touched.
    #[error(transparent)]
    InvalidVolume(#[from] VolmountError),

    /// The node mount directory could not be created.
    #[error("failed to create mount directory {path} for volume {volume}: {source}")]
    DirectoryCreation {
        /// Volume being mounted.
        volume: VolumeKey,
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The mount command failed.
    #[error("failed to mount volume {volume} to {path}: {source}")]
    MountExecution {
        /// Volume being mounted.
        volume: VolumeKey,
        /// Target mount path.
        path: PathBuf,
        /// Underlying command failure.
        source: MountExecutionError,
    },

    /// Cancelled while waiting for another caller to release the volume.
    #[error("cancelled while waiting for volume {volume} at {path}")]
    Cancelled {
        /// Volume whose lock was awaited.
        volume: VolumeKey,
        /// Node mount path of that volume.
        path: PathBuf,
    },
}

impl MountError {
    /// Volume that caused the failure, if the batch got past validation.
    #[must_use]
    pub fn volume(&self) -> Option<&VolumeKey> {
        match self {
            Self::InvalidVolume(_) => None,
            Self::DirectoryCreation { volume, .. }
            | Self::MountExecution { volume, .. }
            | Self::Cancelled { volume, .. } => Some(volume),
        }
    }
}
