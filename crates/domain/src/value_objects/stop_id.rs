//! Stop identifier value object

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// A validated ANM stop identifier (the provider calls these "palina" IDs)
///
/// Stop IDs are provider-assigned numeric strings such as `"2103"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopId {
    value: String,
}

impl StopId {
    /// Create a new stop ID, validating that it is a non-empty numeric string
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let value = id.into().trim().to_string();

        if value.is_empty() {
            return Err(DomainError::InvalidStopId(
                "stop id must not be empty".to_string(),
            ));
        }

        if !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::InvalidStopId(format!(
                "stop id must be numeric, got '{value}'"
            )));
        }

        Ok(Self { value })
    }

    /// Get the stop ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl TryFrom<String> for StopId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for StopId {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_id_is_accepted() {
        let id = StopId::new("2103").unwrap();
        assert_eq!(id.as_str(), "2103");
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let id = StopId::new("  4012 ").unwrap();
        assert_eq!(id.as_str(), "4012");
    }

    #[test]
    fn empty_id_is_rejected() {
        assert!(StopId::new("").is_err());
        assert!(StopId::new("   ").is_err());
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        assert!(StopId::new("21a3").is_err());
        assert!(StopId::new("stop-1").is_err());
    }

    #[test]
    fn display_matches_value() {
        let id = StopId::new("77").unwrap();
        assert_eq!(id.to_string(), "77");
    }

    #[test]
    fn try_from_str_works() {
        let id: StopId = "2103".try_into().unwrap();
        assert_eq!(id.as_str(), "2103");
    }

    #[test]
    fn serde_is_transparent() {
        let id = StopId::new("2103").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"2103\"");
    }
}
