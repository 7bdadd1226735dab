// ABOUTME: Parsed locator for a release bundle.
// ABOUTME: Distinguishes remote http(s) URLs from local files.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArtifactSourceError {
    #[error("artifact locator cannot be empty")]
    Empty,

    #[error("unsupported artifact scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid artifact URL: {0}")]
    InvalidUrl(String),
}

/// Where a release bundle is fetched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    Http(Url),
    File(PathBuf),
}

impl ArtifactSource {
    /// Parse a locator. `http`/`https` URLs are fetched over the network,
    /// `file://` URLs and anything without a scheme are read from disk.
    pub fn parse(locator: &str) -> Result<Self, ArtifactSourceError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(ArtifactSourceError::Empty);
        }

        if !locator.contains("://") {
            return Ok(ArtifactSource::File(PathBuf::from(locator)));
        }

        let url = Url::parse(locator).map_err(|e| ArtifactSourceError::InvalidUrl(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => Ok(ArtifactSource::Http(url)),
            "file" => url
                .to_file_path()
                .map(ArtifactSource::File)
                .map_err(|_| ArtifactSourceError::InvalidUrl(locator.to_string())),
            other => Err(ArtifactSourceError::UnsupportedScheme(other.to_string())),
        }
    }
}

impl fmt::Display for ArtifactSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactSource::Http(url) => write!(f, "{url}"),
            ArtifactSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl std::str::FromStr for ArtifactSource {
    type Err = ArtifactSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
