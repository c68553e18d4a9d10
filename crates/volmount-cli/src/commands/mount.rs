//! `volmount mount` — Mount volumes and print their bind specs.

use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use volmount_common::config::VolmountConfig;
use volmount_common::types::VolumeDescriptor;
use volmount_core::{CancellationToken, MountCoordinator, MutexRegistry};

use crate::output;

/// Arguments for the `mount` command.
#[derive(Args, Debug)]
pub struct MountArgs {
    /// Volumes to mount, as `VOLUME_ID:MOUNT_PATH`.
    #[arg(required = true)]
    pub volumes: Vec<VolumeDescriptor>,

    /// Print binds as a JSON array.
    #[arg(long, conflicts_with = "flags")]
    pub json: bool,

    /// Print binds as `-v` flags for a container runtime command line.
    #[arg(long)]
    pub flags: bool,
}

/// Executes the `mount` command.
///
/// Ctrl+C cancels the batch, including a mount command in progress.
///
/// # Errors
///
/// Returns an error if any volume cannot be mounted.
#[allow(clippy::print_stdout)]
pub fn execute(args: MountArgs, config: &VolmountConfig) -> anyhow::Result<()> {
    let ctx = CancellationToken::new();
    let on_interrupt = ctx.clone();
    ctrlc::set_handler(move || {
        tracing::warn!("interrupted, cancelling mounts");
        on_interrupt.cancel();
    })
    .context("failed to set Ctrl+C handler")?;

    let coordinator = MountCoordinator::from_config(config, Arc::new(MutexRegistry::new()));
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let binds = runtime.block_on(coordinator.mount_all(&ctx, &args.volumes))?;
    tracing::info!(count = binds.len(), "volumes ready");

    let rendered = if args.flags {
        output::render_volume_flags(&binds)
    } else {
        output::render_binds(&binds, args.json)?
    };
    println!("{rendered}");
    Ok(())
}
