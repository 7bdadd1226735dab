// ABOUTME: Application-wide error types for siteswap.
// ABOUTME: Uses thiserror for ergonomic error handling.

use std::path::PathBuf;
use thiserror::Error;

use crate::host::HostError;
use crate::snapshot::{RestoreError, SnapshotError};
use crate::update::UpdateError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("file already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("configuration file not found in {0}")]
    ConfigNotFound(PathBuf),

    #[error("unknown site: {0}")]
    UnknownSite(String),

    #[error("no artifact configured for site {0}; pass --artifact")]
    NoArtifact(String),

    #[error("no retained snapshot for site {0}")]
    NoSnapshot(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Restore(#[from] RestoreError),

    #[error(transparent)]
    Update(#[from] UpdateError),
}

pub type Result<T> = std::result::Result<T, Error>;
