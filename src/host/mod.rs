// ABOUTME: Hosting controller capability: resolve, stop, start and query a site.
// ABOUTME: CommandHost drives a real host through configured shell commands.

mod command;

pub use command::{CommandHost, CommandOutput};

use std::path::PathBuf;

use async_trait::async_trait;

use crate::types::ServiceName;

/// A hosted application and the directory it serves from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRef {
    pub name: ServiceName,
    pub root: PathBuf,
}

/// Controls the process or web server that serves a site.
#[async_trait]
pub trait HostingController: Send + Sync {
    /// Look up a site and report its root directory.
    async fn resolve(&self, name: &ServiceName) -> Result<ServiceRef, HostError>;

    /// Stop serving the site.
    async fn stop(&self, name: &ServiceName) -> Result<(), HostError>;

    /// Start serving the site.
    async fn start(&self, name: &ServiceName) -> Result<(), HostError>;

    /// Whether the site is currently serving.
    async fn is_running(&self, name: &ServiceName) -> Result<bool, HostError>;
}

/// Errors from hosting controller operations.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("site not found: {0}")]
    NotFound(String),

    #[error("failed to stop {site}: {reason}")]
    StopFailed { site: String, reason: String },

    #[error("failed to start {site}: {reason}")]
    StartFailed { site: String, reason: String },

    #[error("failed to query {site}: {reason}")]
    StatusFailed { site: String, reason: String },
}
