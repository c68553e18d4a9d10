//! Node-local mount path derivation.

use std::path::PathBuf;

use volmount_common::types::VolumeKey;

/// Maps a volume key to the directory it is mounted on.
///
/// Implementations must be pure: the same key always yields the same path.
pub trait MountPathResolver: Send + Sync {
    /// Returns the node mount path for `key`.
    fn resolve(&self, key: &VolumeKey) -> PathBuf;
}

/// Places every volume directly under a fixed root directory.
#[derive(Debug, Clone)]
pub struct RootedPathResolver {
    root: PathBuf,
}

impl RootedPathResolver {
    /// Creates a resolver rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl MountPathResolver for RootedPathResolver {
    fn resolve(&self, key: &VolumeKey) -> PathBuf {
        self.root.join(key.as_str())
    }
}
