//! Per-stop monitoring configuration

use serde::{Deserialize, Serialize};

use crate::value_objects::{LineFilter, StopId};

/// Configuration for one monitored stop
///
/// Immutable once created; the update coordinator owns the configured set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopConfig {
    /// Provider-assigned stop identifier
    pub stop_id: StopId,
    /// Display name chosen by the user
    pub stop_name: String,
    /// Optional allow-list of line codes
    pub line_filter: Option<LineFilter>,
}

impl StopConfig {
    /// Create a configuration without a line filter
    pub fn new(stop_id: StopId, stop_name: impl Into<String>) -> Self {
        Self {
            stop_id,
            stop_name: stop_name.into(),
            line_filter: None,
        }
    }

    /// Restrict the stop to the given lines
    #[must_use]
    pub fn with_line_filter(mut self, filter: LineFilter) -> Self {
        self.line_filter = Some(filter);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_no_filter() {
        let config = StopConfig::new(StopId::new("2103").unwrap(), "Piazza Dante");
        assert_eq!(config.stop_name, "Piazza Dante");
        assert!(config.line_filter.is_none());
    }

    #[test]
    fn with_line_filter_sets_filter() {
        let config = StopConfig::new(StopId::new("2103").unwrap(), "Piazza Dante")
            .with_line_filter(LineFilter::parse("151").unwrap());
        assert!(config.line_filter.is_some());
    }
}
