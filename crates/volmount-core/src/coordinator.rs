//! Idempotent, per-volume-serialized mounting of volume batches.
//!
//! For every requested volume the coordinator derives its key and node
//! path, takes the volume's lock from the shared [`MutexRegistry`],
//! skips the mount if the path is already a mount point, and otherwise
//! creates the directory and runs the mount executor. The lock is
//! released as soon as that volume is done, so a batch never holds
//! one volume while working on the next.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use volmount_common::config::VolmountConfig;
use volmount_common::constants::DEFAULT_KEY_PREFIX;
use volmount_common::types::{BindSpec, VolumeDescriptor, VolumeKey};

use crate::error::{MountError, MountExecutionError};
use crate::mount::{
    CommandMountExecutor, MountExecutor, MountInfoProbe, MountPathResolver, MountProbe,
    RootedPathResolver,
};
use crate::registry::MutexRegistry;

/// Mounts volumes on this node and returns their container bind specs.
///
/// Cheap to share behind an `Arc`; all state that must outlive a call
/// lives in the registry.
pub struct MountCoordinator {
    registry: Arc<MutexRegistry>,
    resolver: Arc<dyn MountPathResolver>,
    probe: Arc<dyn MountProbe>,
    executor: Arc<dyn MountExecutor>,
    key_prefix: String,
    mount_timeout: Option<Duration>,
}

impl MountCoordinator {
    /// Creates a coordinator from explicit collaborators.
    ///
    /// Uses the default key prefix and no mount timeout.
    #[must_use]
    pub fn new(
        registry: Arc<MutexRegistry>,
        resolver: Arc<dyn MountPathResolver>,
        probe: Arc<dyn MountProbe>,
        executor: Arc<dyn MountExecutor>,
    ) -> Self {
        Self {
            registry,
            resolver,
            probe,
            executor,
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
            mount_timeout: None,
        }
    }

    /// Creates a coordinator using the default collaborators configured
    /// by `config`.
    #[must_use]
    pub fn from_config(config: &VolmountConfig, registry: Arc<MutexRegistry>) -> Self {
        Self::new(
            registry,
            Arc::new(RootedPathResolver::new(&config.mount_root)),
            Arc::new(MountInfoProbe::new()),
            Arc::new(CommandMountExecutor::from_config(config)),
        )
        .with_key_prefix(&config.key_prefix)
        .with_mount_timeout(config.mount_timeout())
    }

    /// Sets the namespace used to derive volume keys.
    #[must_use]
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Bounds each mount command. `None` waits indefinitely.
    #[must_use]
    pub const fn with_mount_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.mount_timeout = timeout;
        self
    }

    /// Derives the namespaced key for `volume_id`.
    #[must_use]
    pub fn volume_key(&self, volume_id: &str) -> VolumeKey {
        VolumeKey::new(&self.key_prefix, volume_id)
    }

    /// Returns the bind specs `mount_all` would produce, without locking,
    /// probing or mounting anything.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::InvalidVolume`] if any descriptor is invalid.
    pub fn resolve_binds(&self, volumes: &[VolumeDescriptor]) -> Result<Vec<BindSpec>, MountError> {
        volumes
            .iter()
            .map(|descriptor| {
                descriptor.validate()?;
                let key = self.volume_key(&descriptor.volume_id);
                Ok(BindSpec::new(self.resolver.resolve(&key), &descriptor.mount_path))
            })
            .collect()
    }

    /// Ensures every volume is mounted and returns one bind spec per
    /// descriptor, in input order.
    ///
    /// Volumes already mounted are reused. The first failure aborts the
    /// batch; volumes mounted earlier in the batch stay mounted.
    ///
    /// # Errors
    ///
    /// Returns [`MountError::InvalidVolume`] before touching anything if a
    /// descriptor is invalid, otherwise the error of the first volume that
    /// could not be mounted or whose lock wait was cancelled.
    pub async fn mount_all(
        &self,
        ctx: &CancellationToken,
        volumes: &[VolumeDescriptor],
    ) -> Result<Vec<BindSpec>, MountError> {
        for descriptor in volumes {
            descriptor.validate()?;
        }

        let mut binds = Vec::with_capacity(volumes.len());
        for descriptor in volumes {
            binds.push(self.mount_one(ctx, descriptor).await?);
        }
        Ok(binds)
    }

    async fn mount_one(
        &self,
        ctx: &CancellationToken,
        descriptor: &VolumeDescriptor,
    ) -> Result<BindSpec, MountError> {
        let key = self.volume_key(&descriptor.volume_id);
        let path = self.resolver.resolve(&key);

        let lock = self.registry.acquire_lock(&key);
        let _guard = tokio::select! {
            biased;
            () = ctx.cancelled() => {
                return Err(MountError::Cancelled { volume: key, path });
            }
            guard = lock.lock() => guard,
        };
        tracing::debug!(volume = %key, "acquired volume lock");

        let already_mounted = match self.probe_mount_point(&path).await {
            Ok(mounted) => mounted,
            Err(_) => return Err(MountError::Cancelled { volume: key, path }),
        };
        if already_mounted {
            tracing::info!(
                volume = %key,
                path = %path.display(),
                mount_path = %descriptor.mount_path,
                "volume already mounted"
            );
            return Ok(BindSpec::new(path, &descriptor.mount_path));
        }

        if let Err(source) = tokio::fs::create_dir_all(&path).await {
            tracing::warn!(volume = %key, path = %path.display(), error = %source, "failed to create mount directory");
            return Err(MountError::DirectoryCreation {
                volume: key,
                path,
                source,
            });
        }

        tracing::info!(volume = %key, path = %path.display(), "mounting volume");
        if let Err(source) = self.execute_mount(ctx, &key, &path).await {
            tracing::warn!(volume = %key, path = %path.display(), error = %source, "mount failed");
            return Err(MountError::MountExecution {
                volume: key,
                path,
                source,
            });
        }
        tracing::info!(
            volume = %key,
            path = %path.display(),
            mount_path = %descriptor.mount_path,
            "mounted volume"
        );

        Ok(BindSpec::new(path, &descriptor.mount_path))
    }

    /// Runs the probe on the blocking pool; a hung FUSE mount can stall
    /// path resolution indefinitely.
    ///
    /// Errors only if the runtime is shutting down.
    async fn probe_mount_point(&self, path: &Path) -> Result<bool, tokio::task::JoinError> {
        let probe = Arc::clone(&self.probe);
        let path = path.to_path_buf();
        match tokio::task::spawn_blocking(move || probe.is_mount_point(&path)).await {
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            other => other,
        }
    }

    async fn execute_mount(
        &self,
        ctx: &CancellationToken,
        key: &VolumeKey,
        path: &Path,
    ) -> Result<(), MountExecutionError> {
        let execution = self.executor.execute(ctx, key, path);
        match self.mount_timeout {
            Some(limit) => tokio::time::timeout(limit, execution)
                .await
                .unwrap_or(Err(MountExecutionError::TimedOut(limit))),
            None => execution.await,
        }
    }
}

impl std::fmt::Debug for MountCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountCoordinator")
            .field("key_prefix", &self.key_prefix)
            .field("mount_timeout", &self.mount_timeout)
            .field("registered_volumes", &self.registry.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;

    /// Records mounts in memory and reports them through the probe.
    #[derive(Default)]
    struct InMemoryMounts {
        mounted: Mutex<HashSet<PathBuf>>,
        calls: Mutex<Vec<(VolumeKey, PathBuf)>>,
    }

    impl MountProbe for InMemoryMounts {
        fn is_mount_point(&self, path: &Path) -> bool {
            self.mounted.lock().contains(path)
        }
    }

    #[async_trait]
    impl MountExecutor for InMemoryMounts {
        async fn execute(
            &self,
            _ctx: &CancellationToken,
            key: &VolumeKey,
            path: &Path,
        ) -> Result<(), MountExecutionError> {
            self.calls.lock().push((key.clone(), path.to_path_buf()));
            let _ = self.mounted.lock().insert(path.to_path_buf());
            Ok(())
        }
    }

    fn coordinator(root: &Path, mounts: &Arc<InMemoryMounts>) -> MountCoordinator {
        MountCoordinator::new(
            Arc::new(MutexRegistry::new()),
            Arc::new(RootedPathResolver::new(root)),
            Arc::clone(mounts) as Arc<dyn MountProbe>,
            Arc::clone(mounts) as Arc<dyn MountExecutor>,
        )
        .with_key_prefix("test-volume")
    }

    #[test]
    fn volume_key_uses_prefix() {
        let mounts = Arc::new(InMemoryMounts::default());
        let coordinator = coordinator(Path::new("/mnt"), &mounts);
        assert_eq!(coordinator.volume_key("abc").as_str(), "test-volume-abc");
    }

    #[test]
    fn resolve_binds_does_not_mount() {
        let mounts = Arc::new(InMemoryMounts::default());
        let coordinator = coordinator(Path::new("/mnt/vol"), &mounts);
        let binds = coordinator
            .resolve_binds(&[VolumeDescriptor::new("a", "/data")])
            .expect("resolve");
        assert_eq!(binds[0].to_string(), "/mnt/vol/test-volume-a/:/data/");
        assert!(mounts.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn mount_all_preserves_input_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mounts = Arc::new(InMemoryMounts::default());
        let coordinator = coordinator(dir.path(), &mounts);
        let volumes = [
            VolumeDescriptor::new("c", "/c"),
            VolumeDescriptor::new("a", "/a"),
            VolumeDescriptor::new("b", "/b"),
        ];

        let binds = coordinator
            .mount_all(&CancellationToken::new(), &volumes)
            .await
            .expect("mount");

        let containers: Vec<_> = binds.iter().map(BindSpec::container_path).collect();
        assert_eq!(containers, vec!["/c", "/a", "/b"]);
        let keys: Vec<_> = mounts.calls.lock().iter().map(|(k, _)| k.to_string()).collect();
        assert_eq!(keys, vec!["test-volume-c", "test-volume-a", "test-volume-b"]);
    }

    #[tokio::test]
    async fn mount_all_creates_node_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mounts = Arc::new(InMemoryMounts::default());
        let coordinator = coordinator(&dir.path().join("nested/root"), &mounts);

        let _ = coordinator
            .mount_all(&CancellationToken::new(), &[VolumeDescriptor::new("v", "/data")])
            .await
            .expect("mount");

        assert!(dir.path().join("nested/root/test-volume-v").is_dir());
    }

    #[tokio::test]
    async fn same_volume_twice_in_one_batch_mounts_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mounts = Arc::new(InMemoryMounts::default());
        let coordinator = coordinator(dir.path(), &mounts);
        let volumes = [
            VolumeDescriptor::new("v", "/first"),
            VolumeDescriptor::new("v", "/second"),
        ];

        let binds = coordinator
            .mount_all(&CancellationToken::new(), &volumes)
            .await
            .expect("mount");

        assert_eq!(binds.len(), 2);
        assert_eq!(binds[0].host_path(), binds[1].host_path());
        assert_eq!(mounts.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn invalid_descriptor_rejects_batch_before_mounting() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mounts = Arc::new(InMemoryMounts::default());
        let coordinator = coordinator(dir.path(), &mounts);
        let volumes = [
            VolumeDescriptor::new("ok", "/data"),
            VolumeDescriptor::new("../escape", "/data"),
        ];

        let err = coordinator
            .mount_all(&CancellationToken::new(), &volumes)
            .await
            .unwrap_err();

        assert!(matches!(err, MountError::InvalidVolume(_)));
        assert!(err.volume().is_none());
        assert!(mounts.calls.lock().is_empty());
    }

    /// Probe that blocks its thread, like a stat on an unresponsive mount.
    struct StallingProbe(Duration);

    impl MountProbe for StallingProbe {
        fn is_mount_point(&self, _path: &Path) -> bool {
            std::thread::sleep(self.0);
            true
        }
    }

    #[tokio::test]
    async fn stalled_mount_check_does_not_block_other_tasks() {
        let mounts = Arc::new(InMemoryMounts::default());
        let coordinator = MountCoordinator::new(
            Arc::new(MutexRegistry::new()),
            Arc::new(RootedPathResolver::new("/unused")),
            Arc::new(StallingProbe(Duration::from_millis(300))),
            Arc::clone(&mounts) as Arc<dyn MountExecutor>,
        );

        let ticker = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            std::time::Instant::now()
        });
        let binds = coordinator
            .mount_all(&CancellationToken::new(), &[VolumeDescriptor::new("v", "/data")])
            .await
            .expect("reuse");
        let finished = std::time::Instant::now();
        let ticked = ticker.await.expect("join");

        assert_eq!(binds.len(), 1);
        assert!(finished.duration_since(ticked) > Duration::from_millis(150));
    }

    #[tokio::test]
    async fn empty_batch_returns_empty_binds() {
        let mounts = Arc::new(InMemoryMounts::default());
        let coordinator = coordinator(Path::new("/unused"), &mounts);
        let binds = coordinator
            .mount_all(&CancellationToken::new(), &[])
            .await
            .expect("mount");
        assert!(binds.is_empty());
    }

    #[tokio::test]
    async fn directory_creation_failure_names_volume_and_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").expect("write");
        let mounts = Arc::new(InMemoryMounts::default());
        let coordinator = coordinator(&blocker, &mounts);

        let err = coordinator
            .mount_all(&CancellationToken::new(), &[VolumeDescriptor::new("v", "/data")])
            .await
            .unwrap_err();

        assert!(matches!(err, MountError::DirectoryCreation { .. }));
        let message = err.to_string();
        assert!(message.contains("test-volume-v"));
        assert!(message.contains(&blocker.display().to_string()));
        assert!(mounts.calls.lock().is_empty());
    }
}
