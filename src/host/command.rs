// ABOUTME: Hosting controller that shells out to configured stop/start/status commands.
// ABOUTME: Commands get {site} and {root} substituted and a per-command timeout.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::HostConfig;
use crate::types::ServiceName;

use super::{HostError, HostingController, ServiceRef};

/// Captured result of one host command.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    fn failure_reason(&self) -> String {
        let stderr = self.stderr.trim();
        if stderr.is_empty() {
            format!("command exited with code {:?}", self.exit_code)
        } else {
            stderr.to_string()
        }
    }
}

/// Runs `sh -c` commands from the `host` section of the configuration.
#[derive(Debug, Clone)]
pub struct CommandHost {
    stop: String,
    start: String,
    status: Option<String>,
    command_timeout: Duration,
    sites: HashMap<ServiceName, PathBuf>,
}

impl CommandHost {
    pub fn new(host: &HostConfig, sites: impl IntoIterator<Item = (ServiceName, PathBuf)>) -> Self {
        Self {
            stop: host.stop.clone(),
            start: host.start.clone(),
            status: host.status.clone(),
            command_timeout: host.command_timeout,
            sites: sites.into_iter().collect(),
        }
    }

    fn root(&self, name: &ServiceName) -> Result<&PathBuf, HostError> {
        self.sites
            .get(name)
            .ok_or_else(|| HostError::NotFound(name.to_string()))
    }

    /// Substitute placeholders and run a command template for a site.
    pub async fn run(&self, template: &str, name: &ServiceName) -> Result<CommandOutput, String> {
        let root = self.root(name).map_err(|e| e.to_string())?;
        let root = root.display().to_string();
        let command = template.replace("{site}", name.as_str()).replace("{root}", &root);

        tracing::debug!("Running host command for {}: {}", name, command);

        let child = Command::new("sh")
            .arg("-c")
            .arg(&command)
            .env("SITESWAP_SITE", name.as_str())
            .env("SITESWAP_ROOT", &root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.command_timeout, child)
            .await
            .map_err(|_| {
                format!(
                    "command timed out after {}s: {}",
                    self.command_timeout.as_secs(),
                    command
                )
            })?
            .map_err(|e| format!("failed to execute '{}': {}", command, e))?;

        Ok(CommandOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

#[async_trait]
impl HostingController for CommandHost {
    async fn resolve(&self, name: &ServiceName) -> Result<ServiceRef, HostError> {
        let root = self.root(name)?;
        Ok(ServiceRef {
            name: name.clone(),
            root: root.clone(),
        })
    }

    async fn stop(&self, name: &ServiceName) -> Result<(), HostError> {
        let stop_failed = |reason: String| HostError::StopFailed {
            site: name.to_string(),
            reason,
        };
        let output = self.run(&self.stop, name).await.map_err(stop_failed)?;
        if !output.success {
            return Err(stop_failed(output.failure_reason()));
        }
        Ok(())
    }

    async fn start(&self, name: &ServiceName) -> Result<(), HostError> {
        let start_failed = |reason: String| HostError::StartFailed {
            site: name.to_string(),
            reason,
        };
        let output = self.run(&self.start, name).await.map_err(start_failed)?;
        if !output.success {
            return Err(start_failed(output.failure_reason()));
        }
        Ok(())
    }

    /// A zero exit status of the `status` command means running. Without a
    /// status command a site is assumed to be running.
    async fn is_running(&self, name: &ServiceName) -> Result<bool, HostError> {
        let Some(status) = &self.status else {
            self.root(name)?;
            return Ok(true);
        };

        let output = self
            .run(status, name)
            .await
            .map_err(|reason| HostError::StatusFailed {
                site: name.to_string(),
                reason,
            })?;
        Ok(output.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host(stop: &str, start: &str, status: Option<&str>) -> CommandHost {
        let config = HostConfig {
            stop: stop.to_string(),
            start: start.to_string(),
            status: status.map(str::to_string),
            command_timeout: Duration::from_secs(5),
        };
        let name = ServiceName::new("app").unwrap();
        CommandHost::new(&config, [(name, PathBuf::from("/srv/app"))])
    }

    #[tokio::test]
    async fn resolve_unknown_site_is_not_found() {
        let host = host("true", "true", None);
        let err = host
            .resolve(&ServiceName::new("other").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, HostError::NotFound(_)));
    }

    #[tokio::test]
    async fn placeholders_are_substituted() {
        let host = host("true", "true", None);
        let name = ServiceName::new("app").unwrap();
        let output = host.run("echo {site} {root}", &name).await.unwrap();
        assert!(output.success);
        assert_eq!(output.stdout.trim(), "app /srv/app");
    }

    #[tokio::test]
    async fn failing_stop_reports_stderr() {
        let host = host("echo busy >&2; exit 3", "true", None);
        let err = host.stop(&ServiceName::new("app").unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("busy"));
    }

    #[tokio::test]
    async fn status_exit_code_decides_running() {
        let name = ServiceName::new("app").unwrap();
        assert!(host("true", "true", Some("true")).is_running(&name).await.unwrap());
        assert!(!host("true", "true", Some("false")).is_running(&name).await.unwrap());
        assert!(host("true", "true", None).is_running(&name).await.unwrap());
    }
}
