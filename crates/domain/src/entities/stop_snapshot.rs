//! Per-stop snapshot state
//!
//! One snapshot exists per configured stop. A successful cycle replaces the
//! arrivals wholesale; a failed cycle keeps the stale arrivals and records the
//! error, so consumers always read the best-known data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::Arrival;
use crate::value_objects::StopId;

/// Classification of a per-stop fetch failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network failure or timeout; retried on the next cycle
    Transport,
    /// The API key could not be derived from the legacy page
    AuthDerivation,
    /// The service rejected the key even after a refresh
    AuthRejected,
    /// Malformed XML/JSON payload
    Parse,
    /// The configured stop id is unknown to the provider
    StopNotFound,
}

impl ErrorKind {
    /// Get a human-readable label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Transport => "transport error",
            Self::AuthDerivation => "key derivation failed",
            Self::AuthRejected => "key rejected",
            Self::Parse => "parse error",
            Self::StopNotFound => "stop not found",
        }
    }

    /// Whether the condition needs user attention rather than a retry
    ///
    /// An unknown stop id never heals on its own; the configuration has to be
    /// corrected.
    #[must_use]
    pub const fn is_configuration_error(&self) -> bool {
        matches!(self, Self::StopNotFound)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The most recent fetch failure for a stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotError {
    /// Failure classification
    pub kind: ErrorKind,
    /// Human-readable detail
    pub message: String,
    /// When the failure was observed
    pub occurred_at: DateTime<Utc>,
}

impl SnapshotError {
    /// Create a new snapshot error
    pub fn new(kind: ErrorKind, message: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            message: message.into(),
            occurred_at,
        }
    }
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Latest known state for one monitored stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopSnapshot {
    /// Provider-assigned stop identifier
    pub stop_id: StopId,
    /// Display name from the stop configuration
    pub stop_name: String,
    /// Merged arrivals, ascending by arrival time
    pub arrivals: Vec<Arrival>,
    /// Time of the last successful fetch; `None` until the first success
    pub fetched_at: Option<DateTime<Utc>>,
    /// Most recent failure, cleared by the next success
    pub error: Option<SnapshotError>,
}

impl StopSnapshot {
    /// Create the initial snapshot for a configured stop (no data yet)
    pub fn pending(stop_id: StopId, stop_name: impl Into<String>) -> Self {
        Self {
            stop_id,
            stop_name: stop_name.into(),
            arrivals: Vec::new(),
            fetched_at: None,
            error: None,
        }
    }

    /// Whether any cycle has ever succeeded for this stop
    ///
    /// Consumers should present the stop as "unavailable" only while this is
    /// false; afterwards stale data is preferred over no data.
    #[must_use]
    pub const fn has_succeeded(&self) -> bool {
        self.fetched_at.is_some()
    }

    /// The next arrival, if any
    #[must_use]
    pub fn next_arrival(&self) -> Option<&Arrival> {
        self.arrivals.first()
    }

    /// Record a successful fetch, replacing the arrivals and clearing the error
    pub fn record_success(&mut self, arrivals: Vec<Arrival>, fetched_at: DateTime<Utc>) {
        self.arrivals = arrivals;
        self.fetched_at = Some(fetched_at);
        self.error = None;
    }

    /// Record a failed fetch, keeping the stale arrivals
    pub fn record_failure(&mut self, error: SnapshotError) {
        self.error = Some(error);
    }
}
