//! Domain primitive types used across the volmount workspace.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::error::{Result, VolmountError};

/// A volume requested by a caller together with where it must appear
/// inside the container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDescriptor {
    /// Identifier of the backing volume.
    pub volume_id: String,
    /// Absolute path inside the container.
    pub mount_path: String,
}

impl VolumeDescriptor {
    /// Creates a descriptor from a volume identifier and container path.
    #[must_use]
    pub fn new(volume_id: impl Into<String>, mount_path: impl Into<String>) -> Self {
        Self {
            volume_id: volume_id.into(),
            mount_path: mount_path.into(),
        }
    }

    /// Checks that the descriptor can be turned into a host mount point
    /// and a container bind.
    ///
    /// The identifier becomes a single path component under the mount
    /// root, so separators and relative components are refused.
    ///
    /// # Errors
    ///
    /// Returns [`VolmountError::InvalidVolume`] describing the first
    /// violated rule.
    pub fn validate(&self) -> Result<()> {
        let reject = |reason: &str| {
            Err(VolmountError::InvalidVolume {
                volume_id: self.volume_id.clone(),
                reason: reason.to_owned(),
            })
        };

        if self.volume_id.is_empty() {
            return reject("volume id is empty");
        }
        if self.volume_id.contains('/') || self.volume_id.contains('\0') {
            return reject("volume id must not contain '/' or NUL");
        }
        if self.volume_id == "." || self.volume_id == ".." {
            return reject("volume id must not be a relative path component");
        }
        if self.mount_path.is_empty() {
            return reject("mount path is empty");
        }
        if !Path::new(&self.mount_path).is_absolute() {
            return reject("mount path must be absolute");
        }
        Ok(())
    }
}

/// Parses the `VOLUME_ID:MOUNT_PATH` shorthand used on the command line.
///
/// The split happens at the first `:`.
impl FromStr for VolumeDescriptor {
    type Err = VolmountError;

    fn from_str(s: &str) -> Result<Self> {
        let (volume_id, mount_path) =
            s.split_once(':')
                .ok_or_else(|| VolmountError::InvalidVolume {
                    volume_id: s.to_owned(),
                    reason: "expected VOLUME_ID:MOUNT_PATH".into(),
                })?;
        let descriptor = Self::new(volume_id, mount_path);
        descriptor.validate()?;
        Ok(descriptor)
    }
}

/// Namespaced identifier derived from a volume id.
///
/// Serves as the lock registry key, the last component of the node
/// mount path and the name handed to the mount backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VolumeKey(String);

impl VolumeKey {
    /// Derives the key for `volume_id` under `prefix`.
    #[must_use]
    pub fn new(prefix: &str, volume_id: &str) -> Self {
        Self(format!("{prefix}-{volume_id}"))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VolumeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Host-to-container bind mount, rendered as `"<host>/:<container>/"`.
///
/// Both sides always carry exactly one trailing slash, whatever the
/// caller supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindSpec {
    host_path: PathBuf,
    container_path: String,
}

impl BindSpec {
    /// Pairs a node-local mount path with a container path.
    #[must_use]
    pub fn new(host_path: impl Into<PathBuf>, container_path: impl Into<String>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
        }
    }

    /// Node-local side of the bind.
    #[must_use]
    pub fn host_path(&self) -> &Path {
        &self.host_path
    }

    /// Container side of the bind, as supplied.
    #[must_use]
    pub fn container_path(&self) -> &str {
        &self.container_path
    }
}

impl fmt::Display for BindSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = self.host_path.to_string_lossy();
        write!(
            f,
            "{}/:{}/",
            host.trim_end_matches('/'),
            self.container_path.trim_end_matches('/')
        )
    }
}

impl Serialize for BindSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_spec_appends_single_trailing_slash() {
        let bind = BindSpec::new("/mnt/vol1", "/data");
        assert_eq!(bind.to_string(), "/mnt/vol1/:/data/");
    }

    #[test]
    fn bind_spec_collapses_existing_trailing_slashes() {
        let bind = BindSpec::new("/mnt/vol1/", "/data//");
        assert_eq!(bind.to_string(), "/mnt/vol1/:/data/");
    }

    #[test]
    fn bind_spec_container_root() {
        let bind = BindSpec::new("/mnt/vol1", "/");
        assert_eq!(bind.to_string(), "/mnt/vol1/:/");
    }

    #[test]
    fn bind_spec_serializes_as_string() {
        let json = serde_json::to_string(&BindSpec::new("/mnt/a", "/b")).unwrap();
        assert_eq!(json, "\"/mnt/a/:/b/\"");
    }

    #[test]
    fn volume_key_is_namespaced() {
        let key = VolumeKey::new("volmount-volume", "abc");
        assert_eq!(key.as_str(), "volmount-volume-abc");
        assert_eq!(key, VolumeKey::new("volmount-volume", "abc"));
        assert_ne!(key, VolumeKey::new("other", "abc"));
    }

    #[test]
    fn descriptor_deserializes_camel_case() {
        let d: VolumeDescriptor =
            serde_json::from_str(r#"{"volumeId":"v1","mountPath":"/data"}"#).unwrap();
        assert_eq!(d, VolumeDescriptor::new("v1", "/data"));
    }

    #[test]
    fn validate_accepts_plain_descriptor() {
        assert!(VolumeDescriptor::new("v1", "/data").validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_id() {
        assert!(VolumeDescriptor::new("", "/data").validate().is_err());
    }

    #[test]
    fn validate_rejects_path_traversal_ids() {
        for id in ["..", ".", "a/b", "a\0b"] {
            assert!(
                VolumeDescriptor::new(id, "/data").validate().is_err(),
                "{id:?} should be rejected"
            );
        }
    }

    #[test]
    fn validate_rejects_relative_mount_path() {
        let err = VolumeDescriptor::new("v1", "data").validate().unwrap_err();
        assert!(err.to_string().contains("absolute"));
    }

    #[test]
    fn from_str_splits_at_first_colon() {
        let d: VolumeDescriptor = "v1:/data:ro".parse().unwrap();
        assert_eq!(d.volume_id, "v1");
        assert_eq!(d.mount_path, "/data:ro");
    }

    #[test]
    fn from_str_requires_separator() {
        assert!("v1".parse::<VolumeDescriptor>().is_err());
    }
}
