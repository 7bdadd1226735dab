// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Validates artifact locators at load time.

use serde::Deserialize;

use crate::types::ArtifactSource;

pub fn deserialize_artifact_option<'de, D>(
    deserializer: D,
) -> Result<Option<ArtifactSource>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    opt.map(|s| ArtifactSource::parse(&s).map_err(serde::de::Error::custom))
        .transpose()
}
