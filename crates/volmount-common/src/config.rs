//! Configuration model for the volmount coordinator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::{Result, VolmountError};

/// Root configuration for volume mounting on this node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolmountConfig {
    /// Directory holding one mount point per volume key.
    pub mount_root: PathBuf,
    /// Namespace prepended to every volume id.
    pub key_prefix: String,
    /// Program that performs the mount.
    pub mount_program: String,
    /// Argument templates; `{key}` and `{path}` are substituted per volume.
    pub mount_args: Vec<String>,
    /// Extra environment passed to the mount program.
    pub mount_env: Vec<(String, String)>,
    /// Upper bound on a single mount command. `None` waits indefinitely.
    pub mount_timeout_secs: Option<u64>,
}

impl Default for VolmountConfig {
    fn default() -> Self {
        Self {
            mount_root: PathBuf::from(constants::DEFAULT_MOUNT_ROOT),
            key_prefix: constants::DEFAULT_KEY_PREFIX.to_owned(),
            mount_program: constants::DEFAULT_MOUNT_PROGRAM.to_owned(),
            mount_args: vec![
                constants::KEY_PLACEHOLDER.to_owned(),
                constants::PATH_PLACEHOLDER.to_owned(),
            ],
            mount_env: Vec::new(),
            mount_timeout_secs: Some(constants::DEFAULT_MOUNT_TIMEOUT_SECS),
        }
    }
}

impl VolmountConfig {
    /// Reads a JSON configuration file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON,
    /// or fails [`validate`](Self::validate).
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| VolmountError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the invariants the coordinator relies on.
    ///
    /// # Errors
    ///
    /// Returns [`VolmountError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if !self.mount_root.is_absolute() {
            return Err(VolmountError::Config {
                message: format!("mount_root must be absolute: {}", self.mount_root.display()),
            });
        }
        if self.mount_root.to_str().is_none() {
            return Err(VolmountError::Config {
                message: format!("mount_root must be valid UTF-8: {}", self.mount_root.display()),
            });
        }
        if self.key_prefix.is_empty() || self.key_prefix.contains('/') {
            return Err(VolmountError::Config {
                message: format!("key_prefix must be a non-empty path component: {:?}", self.key_prefix),
            });
        }
        if self.mount_program.trim().is_empty() {
            return Err(VolmountError::Config {
                message: "mount_program is empty".into(),
            });
        }
        if self.mount_timeout_secs == Some(0) {
            return Err(VolmountError::Config {
                message: "mount_timeout_secs must be positive".into(),
            });
        }
        Ok(())
    }

    /// Mount command timeout as a [`Duration`].
    #[must_use]
    pub fn mount_timeout(&self) -> Option<Duration> {
        self.mount_timeout_secs.map(Duration::from_secs)
    }
}
