// ABOUTME: Config scaffolding for new hosts.
// ABOUTME: Creates siteswap.yml template files.

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{ArtifactSource, ServiceName};

use super::CONFIG_FILENAME;

pub fn init_config(
    dir: &Path,
    site: Option<&str>,
    root: Option<&Path>,
    artifact: Option<&str>,
    force: bool,
) -> Result<()> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let site = ServiceName::new(site.unwrap_or("my-site"))
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;

    let root = match root {
        Some(root) if !root.is_absolute() => {
            return Err(Error::InvalidConfig(format!(
                "site root must be absolute: {}",
                root.display()
            )));
        }
        Some(root) => root.display().to_string(),
        None => format!("/srv/{}", site),
    };

    let artifact = artifact.unwrap_or("https://releases.example.com/my-site.tar.gz");
    ArtifactSource::parse(artifact).map_err(|e| Error::InvalidConfig(e.to_string()))?;

    let yaml = generate_template_yaml(&site, &root, artifact);
    std::fs::write(&config_path, yaml)?;

    Ok(())
}

fn generate_template_yaml(site: &ServiceName, root: &str, artifact: &str) -> String {
    format!(
        r#"# Where snapshots and run locks are kept (default: next to each site root)
# snapshot_root: /var/backups/siteswap
timeout: 5m
host:
  stop: "systemctl stop {{site}}"
  start: "systemctl start {{site}}"
  status: "systemctl is-active --quiet {{site}}"
  command_timeout: 60s
sites:
  {}:
    root: {}
    artifact: {}
"#,
        site, root, artifact
    )
}
