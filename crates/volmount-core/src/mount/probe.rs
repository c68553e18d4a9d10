//! Mount point detection.
//!
//! The default probe consults the kernel mount table of the current
//! process and falls back to a device-boundary check when the table is
//! unavailable.

use std::path::{Path, PathBuf};

use volmount_common::constants::MOUNTINFO_PATH;

/// Read-only check for an active mount at a path.
pub trait MountProbe: Send + Sync {
    /// Returns `true` if something is currently mounted on `path`.
    fn is_mount_point(&self, path: &Path) -> bool;
}

/// Probe backed by `/proc/self/mountinfo`.
#[derive(Debug, Clone)]
pub struct MountInfoProbe {
    mountinfo: PathBuf,
}

impl MountInfoProbe {
    /// Creates a probe reading the current process mount table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_mountinfo(MOUNTINFO_PATH)
    }

    /// Creates a probe reading a mountinfo-formatted file at `path`.
    #[must_use]
    pub fn with_mountinfo(path: impl Into<PathBuf>) -> Self {
        Self {
            mountinfo: path.into(),
        }
    }
}

impl Default for MountInfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl MountProbe for MountInfoProbe {
    fn is_mount_point(&self, path: &Path) -> bool {
        // A dead FUSE mount fails canonicalization with ENOTCONN; its raw
        // path still appears in the table.
        let target = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        match std::fs::read_to_string(&self.mountinfo) {
            Ok(table) => mount_points(&table).any(|p| p == target || p == path),
            Err(e) => {
                tracing::debug!(
                    mountinfo = %self.mountinfo.display(),
                    error = %e,
                    "mount table unavailable, comparing devices"
                );
                crosses_device_boundary(&target)
            }
        }
    }
}

/// Iterates the mount point column of a mountinfo table.
fn mount_points(table: &str) -> impl Iterator<Item = PathBuf> + '_ {
    table
        .lines()
        .filter_map(|line| line.split_whitespace().nth(4))
        .map(|field| PathBuf::from(unescape_octal(field)))
}

/// Decodes the `\NNN` escapes the kernel uses for whitespace and
/// backslashes in mountinfo fields.
fn unescape_octal(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal_escape(&bytes[i + 1..i + 4]) {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            out.push(u8::try_from(value).unwrap_or(b'?'));
            i += 4;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn is_octal_escape(digits: &[u8]) -> bool {
    digits.len() == 3 && digits.iter().all(|b| (b'0'..=b'7').contains(b))
}

/// A directory whose device differs from its parent's is a mount point.
#[cfg(target_os = "linux")]
fn crosses_device_boundary(path: &Path) -> bool {
    use nix::sys::stat::stat;

    let Some(parent) = path.parent() else {
        return true;
    };
    match (stat(path), stat(parent)) {
        (Ok(own), Ok(up)) => own.st_dev != up.st_dev,
        _ => false,
    }
}

/// Stub for non-Linux platforms.
#[cfg(not(target_os = "linux"))]
fn crosses_device_boundary(_path: &Path) -> bool {
    false
}
