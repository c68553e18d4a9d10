//! Collaborators the coordinator drives for each volume.
//!
//! Each concern sits behind a trait so the coordinator can be exercised
//! without a real mount subsystem:
//! - [`path::MountPathResolver`]: volume key to node mount path.
//! - [`probe::MountProbe`]: whether a path is an active mount point.
//! - [`executor::MountExecutor`]: runs the external mount.

pub mod executor;
pub mod path;
pub mod probe;

pub use executor::{CommandMountExecutor, MountExecutor};
pub use path::{MountPathResolver, RootedPathResolver};
pub use probe::{MountInfoProbe, MountProbe};
