//! CLI command definitions and dispatch.

pub mod binds;
pub mod config;
pub mod mount;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use volmount_common::config::VolmountConfig;
use volmount_common::constants::BIN_NAME;

/// volmount — mount each volume once, hand out container binds.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// JSON configuration file.
    #[arg(long, global = true, env = "VOLMOUNT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the directory holding node mount points.
    #[arg(long, global = true, env = "VOLMOUNT_MOUNT_ROOT")]
    pub mount_root: Option<PathBuf>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Mount volumes and print their bind specs.
    Mount(mount::MountArgs),
    /// Print the bind specs for volumes without mounting them.
    Binds(binds::BindsArgs),
    /// Print the effective configuration.
    Config(config::ConfigArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or the command fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let settings = load_config(cli.config.as_deref(), cli.mount_root)?;
    match cli.command {
        Command::Mount(args) => mount::execute(args, &settings),
        Command::Binds(args) => binds::execute(args, &settings),
        Command::Config(args) => config::execute(args, &settings),
    }
}

/// Loads the configuration file, or defaults, and applies overrides.
fn load_config(path: Option<&Path>, mount_root: Option<PathBuf>) -> anyhow::Result<VolmountConfig> {
    let mut config = match path {
        Some(path) => VolmountConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => VolmountConfig::default(),
    };
    if let Some(root) = mount_root {
        config.mount_root = root;
    }
    config.validate()?;
    tracing::debug!(mount_root = %config.mount_root.display(), prefix = %config.key_prefix, "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_is_named_after_binary() {
        use clap::CommandFactory;
        assert_eq!(Cli::command().get_name(), BIN_NAME);
    }

    #[test]
    fn cli_parses_mount_with_volumes() {
        let cli = Cli::try_parse_from(["volmount", "mount", "v1:/data", "v2:/cache"]).unwrap();
        match cli.command {
            Command::Mount(args) => assert_eq!(args.volumes.len(), 2),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_malformed_volume() {
        assert!(Cli::try_parse_from(["volmount", "mount", "no-separator"]).is_err());
    }

    #[test]
    fn load_config_applies_mount_root_override() {
        let config = load_config(None, Some(PathBuf::from("/srv/mounts"))).unwrap();
        assert_eq!(config.mount_root, PathBuf::from("/srv/mounts"));
    }

    #[test]
    fn load_config_rejects_relative_override() {
        assert!(load_config(None, Some(PathBuf::from("relative"))).is_err());
    }
}
