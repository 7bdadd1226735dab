// ABOUTME: Hosting controller command configuration.
// ABOUTME: Shell templates for stopping, starting and querying a site.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    pub stop: String,

    pub start: String,

    /// Exit status 0 means the site is serving.
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default = "default_command_timeout", with = "humantime_serde")]
    pub command_timeout: Duration,
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(60)
}
