//! External mount command execution.

use std::ffi::{OsStr, OsString};
use std::io::SeekFrom;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use volmount_common::config::VolmountConfig;
use volmount_common::constants::{KEY_PLACEHOLDER, PATH_PLACEHOLDER};
use volmount_common::types::VolumeKey;

use crate::error::MountExecutionError;

/// Most stderr kept from a failed mount command.
const STDERR_CAPTURE_LIMIT: u64 = 4096;

/// Performs the actual mount of a volume onto a node path.
///
/// Implementations must stop promptly once `ctx` is cancelled.
#[async_trait]
pub trait MountExecutor: Send + Sync {
    /// Mounts the volume identified by `key` on `path` and waits for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the mount could not be performed.
    async fn execute(
        &self,
        ctx: &CancellationToken,
        key: &VolumeKey,
        path: &Path,
    ) -> Result<(), MountExecutionError>;
}

/// Runs a configurable program to mount each volume.
///
/// Argument templates may contain `{key}` and `{path}`, substituted with
/// the volume key and the node mount path.
#[derive(Debug, Clone)]
pub struct CommandMountExecutor {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl CommandMountExecutor {
    /// Creates an executor invoking `program {key} {path}`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: vec![KEY_PLACEHOLDER.to_owned(), PATH_PLACEHOLDER.to_owned()],
            env: Vec::new(),
        }
    }

    /// Creates an executor from the mount settings of `config`.
    #[must_use]
    pub fn from_config(config: &VolmountConfig) -> Self {
        Self {
            program: config.mount_program.clone(),
            args: config.mount_args.clone(),
            env: config.mount_env.clone(),
        }
    }

    /// Replaces the argument templates.
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds an environment variable for the mount program.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Builds the ready-to-run command for one volume.
    ///
    /// The path is substituted byte-for-byte, so non-UTF-8 paths reach the
    /// program unchanged. The child is killed if its handle is dropped
    /// before it exits. Stderr is left to the caller.
    #[must_use]
    pub fn build_command(&self, key: &VolumeKey, path: &Path) -> Command {
        let mut command = Command::new(&self.program);
        let _ = command
            .args(
                self.args
                    .iter()
                    .map(|arg| expand_template(arg, key, path.as_os_str())),
            )
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true);
        command
    }

    fn spawn_error(&self, source: std::io::Error) -> MountExecutionError {
        MountExecutionError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

/// Substitutes `{key}` and `{path}` in one argument template.
fn expand_template(template: &str, key: &VolumeKey, path: &OsStr) -> OsString {
    let with_key = template.replace(KEY_PLACEHOLDER, key.as_str());
    let mut expanded = OsString::with_capacity(with_key.len());
    for (i, part) in with_key.split(PATH_PLACEHOLDER).enumerate() {
        if i > 0 {
            expanded.push(path);
        }
        expanded.push(part);
    }
    expanded
}

/// Reads back the head of a stderr capture file.
async fn read_capture(file: std::fs::File) -> String {
    let mut file = tokio::fs::File::from_std(file);
    let mut captured = Vec::new();
    if file.seek(SeekFrom::Start(0)).await.is_ok() {
        let _ = (&mut file)
            .take(STDERR_CAPTURE_LIMIT)
            .read_to_end(&mut captured)
            .await;
    }
    String::from_utf8_lossy(&captured).trim().to_owned()
}

#[async_trait]
impl MountExecutor for CommandMountExecutor {
    async fn execute(
        &self,
        ctx: &CancellationToken,
        key: &VolumeKey,
        path: &Path,
    ) -> Result<(), MountExecutionError> {
        // Stderr goes to an unlinked file rather than a pipe: a helper that
        // daemonizes keeps the descriptor open after the parent exits.
        let capture = tempfile::tempfile().map_err(|e| self.spawn_error(e))?;
        let child_stderr = capture.try_clone().map_err(|e| self.spawn_error(e))?;
        let mut child = self
            .build_command(key, path)
            .stderr(Stdio::from(child_stderr))
            .spawn()
            .map_err(|e| self.spawn_error(e))?;
        tracing::debug!(volume = %key, program = %self.program, pid = ?child.id(), "mount command started");

        // Dropping the wait future drops the child, which kills it.
        let wait = async move { child.wait().await };
        let status = tokio::select! {
            () = ctx.cancelled() => return Err(MountExecutionError::Cancelled),
            status = wait => status.map_err(|source| MountExecutionError::Wait {
                program: self.program.clone(),
                source,
            })?,
        };

        if status.success() {
            Ok(())
        } else {
            Err(MountExecutionError::Failed {
                program: self.program.clone(),
                status,
                stderr: read_capture(capture).await,
            })
        }
    }
}
