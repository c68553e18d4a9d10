//! `volmount binds` — Print bind specs without mounting.

use std::sync::Arc;

use clap::Args;
use volmount_common::config::VolmountConfig;
use volmount_common::types::VolumeDescriptor;
use volmount_core::{MountCoordinator, MutexRegistry};

use crate::output;

/// Arguments for the `binds` command.
#[derive(Args, Debug)]
pub struct BindsArgs {
    /// Volumes to resolve, as `VOLUME_ID:MOUNT_PATH`.
    #[arg(required = true)]
    pub volumes: Vec<VolumeDescriptor>,

    /// Print binds as a JSON array.
    #[arg(long)]
    pub json: bool,
}

/// Executes the `binds` command.
///
/// # Errors
///
/// Returns an error if a volume descriptor is invalid.
#[allow(clippy::print_stdout)]
pub fn execute(args: BindsArgs, config: &VolmountConfig) -> anyhow::Result<()> {
    let coordinator = MountCoordinator::from_config(config, Arc::new(MutexRegistry::new()));
    let binds = coordinator.resolve_binds(&args.volumes)?;
    println!("{}", output::render_binds(&binds, args.json)?);
    Ok(())
}
