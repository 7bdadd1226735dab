// ABOUTME: Overlays bundle entries onto a target directory.
// ABOUTME: Rejects paths escaping the target and never deletes files absent from the bundle.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use crate::fs::{FileSystem, FsError};

use super::bundle::{Bundle, BundleEntry};

/// Errors from applying a bundle.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// An entry path would resolve outside the target root.
    #[error("entry {} escapes the target directory", entry.display())]
    PathTraversal { entry: PathBuf },

    /// A file entry with no usable path.
    #[error("file entry has an empty path")]
    EmptyPath,

    /// The first entry-level write failure.
    #[error("failed to apply {}: {source}", entry.display())]
    Entry { entry: PathBuf, source: FsError },
}

/// What an apply pass wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub dirs_created: usize,
    pub files_written: usize,
}

/// Resolve an entry path against `root`, refusing anything that could leave it.
///
/// `.` components are dropped. `..`, root and drive-prefix components are
/// rejected outright rather than normalized.
pub fn resolve_entry_path(root: &Path, entry: &Path) -> Result<PathBuf, ApplyError> {
    let mut resolved = root.to_path_buf();
    for component in entry.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ApplyError::PathTraversal {
                    entry: entry.to_path_buf(),
                });
            }
        }
    }
    Ok(resolved)
}

/// Writes bundles onto a directory through a [`FileSystem`].
#[derive(Clone)]
pub struct Applier {
    fs: Arc<dyn FileSystem>,
}

impl std::fmt::Debug for Applier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Applier").finish_non_exhaustive()
    }
}

impl Applier {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    /// Fail if any existing path between `target` and the entry is a symlink.
    ///
    /// Writes follow links, so a link already in the tree would carry the
    /// entry outside `target`.
    fn reject_links(&self, target: &Path, entry: &Path) -> Result<(), ApplyError> {
        let mut current = target.to_path_buf();
        for component in entry.components() {
            if let Component::Normal(part) = component {
                current.push(part);
                if self.fs.is_symlink(&current) {
                    return Err(ApplyError::PathTraversal {
                        entry: entry.to_path_buf(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Overlay `bundle` onto `target`.
    ///
    /// Every entry path is validated before anything is written, including
    /// a check for symlinks already in the tree, so a traversal attempt
    /// leaves the target untouched. Writes are then done in
    /// bundle order; on the first failure the error is returned and earlier
    /// writes stay in place.
    pub fn apply(&self, bundle: &Bundle, target: &Path) -> Result<ApplySummary, ApplyError> {
        let mut plan = Vec::with_capacity(bundle.len());
        for entry in bundle.entries() {
            let destination = resolve_entry_path(target, entry.path())?;
            if destination == target && matches!(entry, BundleEntry::File { .. }) {
                return Err(ApplyError::EmptyPath);
            }
            self.reject_links(target, entry.path())?;
            plan.push((entry, destination));
        }

        self.fs.make_dirs(target).map_err(entry_failed(target))?;

        let mut summary = ApplySummary::default();
        for (entry, destination) in plan {
            match entry {
                BundleEntry::Dir(_) => {
                    self.fs
                        .make_dirs(&destination)
                        .map_err(entry_failed(entry.path()))?;
                    summary.dirs_created += 1;
                }
                BundleEntry::File { contents, .. } => {
                    if let Some(parent) = destination.parent() {
                        self.fs.make_dirs(parent).map_err(entry_failed(entry.path()))?;
                    }
                    self.fs
                        .write_file(&destination, contents)
                        .map_err(entry_failed(entry.path()))?;
                    summary.files_written += 1;
                }
            }
        }

        tracing::debug!(
            "Applied {} file(s) and {} director(ies) to {}",
            summary.files_written,
            summary.dirs_created,
            target.display()
        );

        Ok(summary)
    }
}

fn entry_failed(entry: &Path) -> impl FnOnce(FsError) -> ApplyError + use<> {
    let entry = entry.to_path_buf();
    move |source| ApplyError::Entry { entry, source }
}
