// ABOUTME: Filesystem error types with SNAFU context selectors.
// ABOUTME: Classifies I/O failures as permission, not-found, disk-full or other.

use std::io;
use std::path::{Path, PathBuf};

use snafu::Snafu;

/// Failure of a single filesystem operation, tagged with the path involved.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FsError {
    #[snafu(display("failed to copy {} to {}: {source}", from.display(), to.display()))]
    Copy {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },

    #[snafu(display("failed to walk {}: {source}", path.display()))]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },

    #[snafu(display("failed to remove {}: {source}", path.display()))]
    Remove { path: PathBuf, source: io::Error },

    #[snafu(display("failed to write {}: {source}", path.display()))]
    Write { path: PathBuf, source: io::Error },

    #[snafu(display("failed to create directory {}: {source}", path.display()))]
    MakeDirs { path: PathBuf, source: io::Error },

    #[snafu(display("failed to rename {} to {}: {source}", from.display(), to.display()))]
    Rename {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorKind {
    PermissionDenied,
    NotFound,
    DiskFull,
    Other,
}

impl From<io::ErrorKind> for FsErrorKind {
    fn from(kind: io::ErrorKind) -> Self {
        match kind {
            io::ErrorKind::PermissionDenied => FsErrorKind::PermissionDenied,
            io::ErrorKind::NotFound => FsErrorKind::NotFound,
            io::ErrorKind::StorageFull => FsErrorKind::DiskFull,
            _ => FsErrorKind::Other,
        }
    }
}

impl FsError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> FsErrorKind {
        match self {
            FsError::Copy { source, .. }
            | FsError::Remove { source, .. }
            | FsError::Write { source, .. }
            | FsError::MakeDirs { source, .. }
            | FsError::Rename { source, .. } => source.kind().into(),
            FsError::Walk { source, .. } => source
                .io_error()
                .map(|e| e.kind().into())
                .unwrap_or(FsErrorKind::Other),
        }
    }

    /// The path the failed operation was acting on.
    pub fn path(&self) -> &Path {
        match self {
            FsError::Copy { to, .. } | FsError::Rename { to, .. } => to,
            FsError::Walk { path, .. }
            | FsError::Remove { path, .. }
            | FsError::Write { path, .. }
            | FsError::MakeDirs { path, .. } => path,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == FsErrorKind::NotFound
    }
}
