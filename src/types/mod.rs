// ABOUTME: Validated domain types shared across the crate.
// ABOUTME: Service names and artifact locators.

mod artifact_source;
mod service_name;

pub use artifact_source::{ArtifactSource, ArtifactSourceError};
pub use service_name::{ServiceName, ServiceNameError};
