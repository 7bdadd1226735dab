// ABOUTME: Single-slot backups of a site tree: create, restore, locate and discard.
// ABOUTME: Slots are written via a partial copy and restored via a staged swap.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fs::{FileSystem, FsError};
use crate::host::ServiceRef;
use crate::types::ServiceName;

const PARTIAL_SUFFIX: &str = "partial";
const RESTORE_SUFFIX: &str = "siteswap-restore";
const DISCARD_SUFFIX: &str = "siteswap-discard";

/// Errors from creating or discarding a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("site root {} does not exist", .0.display())]
    SourceMissing(PathBuf),

    #[error("failed to snapshot into {}: {source}", slot.display())]
    Create { slot: PathBuf, source: FsError },

    #[error("failed to discard snapshot {}: {source}", slot.display())]
    Discard { slot: PathBuf, source: FsError },
}

/// Errors from restoring a snapshot over a site root.
#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("snapshot {} is missing", .0.display())]
    SnapshotMissing(PathBuf),

    #[error("site root {} has no parent directory to stage a restore in", .0.display())]
    NoParent(PathBuf),

    #[error("failed to copy snapshot into staging area: {0}")]
    Copy(FsError),

    #[error("failed to swap restored tree into place: {0}")]
    Swap(FsError),
}

/// Handle to a complete snapshot in a service's slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub service: ServiceName,
    pub path: PathBuf,
}

/// Manages snapshot slots under one directory.
#[derive(Clone)]
pub struct SnapshotManager {
    fs: Arc<dyn FileSystem>,
    snapshot_root: PathBuf,
}

impl std::fmt::Debug for SnapshotManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotManager")
            .field("snapshot_root", &self.snapshot_root)
            .finish()
    }
}

impl SnapshotManager {
    pub fn new(fs: Arc<dyn FileSystem>, snapshot_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            snapshot_root: snapshot_root.into(),
        }
    }

    pub fn snapshot_root(&self) -> &Path {
        &self.snapshot_root
    }

    /// Path of the slot for `service`.
    pub fn slot_path(&self, service: &ServiceName) -> PathBuf {
        self.snapshot_root.join(service.snapshot_slot())
    }

    fn partial_path(&self, service: &ServiceName) -> PathBuf {
        self.snapshot_root
            .join(format!("{}.{}", service.snapshot_slot(), PARTIAL_SUFFIX))
    }

    /// Copy the service's tree into its slot, replacing any prior snapshot.
    ///
    /// The copy lands in a partial directory first and is renamed into the
    /// slot only once complete, so the slot never holds a half-written tree.
    pub fn create(&self, service: &ServiceRef) -> Result<Snapshot, SnapshotError> {
        if !self.fs.exists(&service.root) {
            return Err(SnapshotError::SourceMissing(service.root.clone()));
        }

        let slot = self.slot_path(&service.name);
        let partial = self.partial_path(&service.name);
        let create_failed = |source| SnapshotError::Create {
            slot: slot.clone(),
            source,
        };

        self.fs.make_dirs(&self.snapshot_root).map_err(create_failed)?;
        self.remove_if_present(&slot).map_err(create_failed)?;
        self.remove_if_present(&partial).map_err(create_failed)?;

        if let Err(source) = self.fs.copy_tree(&service.root, &partial) {
            let _ = self.remove_if_present(&partial);
            return Err(create_failed(source));
        }
        self.fs.rename(&partial, &slot).map_err(create_failed)?;

        tracing::info!(
            "Snapshot of {} written to {}",
            service.root.display(),
            slot.display()
        );

        Ok(Snapshot {
            service: service.name.clone(),
            path: slot,
        })
    }

    /// Replace the contents of `root` with the snapshot.
    ///
    /// The snapshot is copied into a staging sibling of `root` and swapped in
    /// with renames. Either `root` ends up holding the snapshot or an error is
    /// returned with `root` as it was before the call.
    pub fn restore(&self, snapshot: &Snapshot, root: &Path) -> Result<(), RestoreError> {
        if !self.fs.exists(&snapshot.path) {
            return Err(RestoreError::SnapshotMissing(snapshot.path.clone()));
        }

        let staging = sibling(root, RESTORE_SUFFIX)
            .ok_or_else(|| RestoreError::NoParent(root.to_path_buf()))?;
        let aside = sibling(root, DISCARD_SUFFIX)
            .ok_or_else(|| RestoreError::NoParent(root.to_path_buf()))?;

        self.remove_if_present(&staging).map_err(RestoreError::Copy)?;
        self.remove_if_present(&aside).map_err(RestoreError::Swap)?;

        if let Err(e) = self.fs.copy_tree(&snapshot.path, &staging) {
            let _ = self.remove_if_present(&staging);
            return Err(RestoreError::Copy(e));
        }

        let had_root = self.fs.exists(root);
        if had_root && let Err(e) = self.fs.rename(root, &aside) {
            let _ = self.remove_if_present(&staging);
            return Err(RestoreError::Swap(e));
        }

        if let Err(e) = self.fs.rename(&staging, root) {
            if had_root && let Err(undo) = self.fs.rename(&aside, root) {
                tracing::error!(
                    "Could not move {} back to {}: {}",
                    aside.display(),
                    root.display(),
                    undo
                );
            }
            return Err(RestoreError::Swap(e));
        }

        if had_root && let Err(e) = self.fs.remove_tree(&aside) {
            tracing::warn!("Failed to remove replaced tree {}: {}", aside.display(), e);
        }

        tracing::info!(
            "Restored {} from {}",
            root.display(),
            snapshot.path.display()
        );
        Ok(())
    }

    /// Remove a snapshot. Removing an absent snapshot is not an error.
    pub fn discard(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        self.remove_if_present(&snapshot.path)
            .map_err(|source| SnapshotError::Discard {
                slot: snapshot.path.clone(),
                source,
            })?;
        tracing::debug!("Discarded snapshot {}", snapshot.path.display());
        Ok(())
    }

    /// Remove whatever snapshot is in the service's slot.
    pub fn discard_slot(&self, service: &ServiceName) -> Result<(), SnapshotError> {
        self.discard(&Snapshot {
            service: service.clone(),
            path: self.slot_path(service),
        })
    }

    /// Find a retained snapshot for `service`.
    pub fn locate(&self, service: &ServiceName) -> Option<Snapshot> {
        let path = self.slot_path(service);
        self.fs.exists(&path).then(|| Snapshot {
            service: service.clone(),
            path,
        })
    }

    fn remove_if_present(&self, path: &Path) -> Result<(), FsError> {
        match self.fs.remove_tree(path) {
            Err(e) if !e.is_not_found() => Err(e),
            _ => Ok(()),
        }
    }
}

/// `/srv/app` + `suffix` -> `/srv/app.suffix`.
fn sibling(path: &Path, suffix: &str) -> Option<PathBuf> {
    let name = path.file_name()?;
    let mut sibling_name = name.to_os_string();
    sibling_name.push(".");
    sibling_name.push(suffix);
    Some(path.with_file_name(sibling_name))
}
