//! System-wide constants and default paths.

/// Default directory under which every volume gets its node-local mount point.
pub const DEFAULT_MOUNT_ROOT: &str = "/var/lib/volmount/volumes";

/// Default namespace prepended to volume identifiers to form lock and mount keys.
pub const DEFAULT_KEY_PREFIX: &str = "volmount-volume";

/// Default program invoked to perform a volume mount.
pub const DEFAULT_MOUNT_PROGRAM: &str = "mount-s3";

/// Default upper bound on a single mount command, in seconds.
pub const DEFAULT_MOUNT_TIMEOUT_SECS: u64 = 60;

/// Placeholder in mount argument templates replaced by the volume key.
pub const KEY_PLACEHOLDER: &str = "{key}";

/// Placeholder in mount argument templates replaced by the node mount path.
pub const PATH_PLACEHOLDER: &str = "{path}";

/// Kernel mount table of the calling process.
pub const MOUNTINFO_PATH: &str = "/proc/self/mountinfo";

/// Binary name for the CLI.
pub const BIN_NAME: &str = "volmount";
