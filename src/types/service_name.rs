// ABOUTME: Validated site name used as the key for hosts, snapshots and locks.
// ABOUTME: Guarantees derived slot and lock names are a single safe path component.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

const MAX_LEN: usize = 128;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ServiceNameError {
    #[error("service name cannot be empty")]
    Empty,

    #[error("service name exceeds maximum length of {MAX_LEN} characters")]
    TooLong,

    #[error("service name cannot start with '{0}'")]
    InvalidStart(char),

    #[error("invalid character in service name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(value: &str) -> Result<Self, ServiceNameError> {
        if value.is_empty() {
            return Err(ServiceNameError::Empty);
        }

        if value.len() > MAX_LEN {
            return Err(ServiceNameError::TooLong);
        }

        if let Some(first @ ('.' | '-')) = value.chars().next() {
            return Err(ServiceNameError::InvalidStart(first));
        }

        for c in value.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '-' | '_' | '.') {
                return Err(ServiceNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name of this service's snapshot slot.
    pub fn snapshot_slot(&self) -> String {
        format!("{}.snapshot", self.0)
    }

    /// File name of this service's run lock.
    pub fn lock_file(&self) -> String {
        format!("{}.lock", self.0)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ServiceName {
    type Err = ServiceNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for ServiceName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServiceName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_and_lock_names_derive_from_name() {
        let name = ServiceName::new("App").unwrap();
        assert_eq!(name.snapshot_slot(), "App.snapshot");
        assert_eq!(name.lock_file(), "App.lock");
    }

    #[test]
    fn path_separators_rejected() {
        assert_eq!(
            ServiceName::new("a/b").unwrap_err(),
            ServiceNameError::InvalidChar('/')
        );
        assert_eq!(
            ServiceName::new("..").unwrap_err(),
            ServiceNameError::InvalidStart('.')
        );
    }
}
