//! `volmount config` — Print the effective configuration.

use clap::Args;
use volmount_common::config::VolmountConfig;

/// Arguments for the `config` command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Emit compact JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,
}

/// Executes the `config` command.
///
/// # Errors
///
/// Returns an error if the configuration cannot be serialized.
#[allow(clippy::print_stdout)]
pub fn execute(args: ConfigArgs, config: &VolmountConfig) -> anyhow::Result<()> {
    let rendered = if args.compact {
        serde_json::to_string(config)?
    } else {
        serde_json::to_string_pretty(config)?
    };
    println!("{rendered}");
    Ok(())
}
