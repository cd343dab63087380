//! Arrival predictions for a stop

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A raw, time-resolved arrival prediction as reported by the provider
///
/// Produced fresh on every fetch; input to the merge step. The `HH:mm` wire
/// time has already been resolved to an absolute timestamp at this point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    /// Line code (e.g., "151", "R2")
    pub line: String,
    /// Destination / headsign text
    pub destination: String,
    /// Predicted arrival time
    pub arrival_time: DateTime<Utc>,
    /// Per-run identifier from the feed, used for deterministic ordering
    pub vehicle_id: String,
}

/// A merged arrival: a [`Prediction`] with the minutes-until-arrival computed
/// against the cycle's clock
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arrival {
    /// Line code (e.g., "151", "R2")
    pub line: String,
    /// Destination / headsign text
    pub destination: String,
    /// Predicted arrival time
    pub arrival_time: DateTime<Utc>,
    /// Whole minutes until arrival, never negative
    pub time_minutes: i64,
    /// Per-run identifier from the feed
    pub vehicle_id: String,
}

impl Arrival {
    /// Build an arrival from a prediction, computing `time_minutes` relative
    /// to `now`
    ///
    /// Minutes are the integer ceiling of the remaining time, clamped at zero:
    /// a vehicle due within the current minute reads as "0 min", never a
    /// negative count.
    #[must_use]
    pub fn from_prediction(prediction: Prediction, now: DateTime<Utc>) -> Self {
        let seconds = (prediction.arrival_time - now).num_seconds();
        let time_minutes = (seconds + 59).div_euclid(60).max(0);

        Self {
            line: prediction.line,
            destination: prediction.destination,
            arrival_time: prediction.arrival_time,
            time_minutes,
            vehicle_id: prediction.vehicle_id,
        }
    }

    /// Whether the vehicle is due within the current minute
    #[must_use]
    pub const fn is_due(&self) -> bool {
        self.time_minutes == 0
    }
}

impl fmt::Display for Arrival {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} → {} in {}min ({})",
            self.line,
            self.destination,
            self.time_minutes,
            self.arrival_time.format("%H:%M")
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn prediction_at(hour: u32, min: u32) -> Prediction {
        Prediction {
            line: "151".to_string(),
            destination: "GIULIO CESARE".to_string(),
            arrival_time: Utc.with_ymd_and_hms(2026, 3, 14, hour, min, 0).unwrap(),
            vehicle_id: "2103".to_string(),
        }
    }

    #[test]
    fn minutes_are_exact_for_whole_minutes() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 0).unwrap();
        let arrival = Arrival::from_prediction(prediction_at(8, 5), now);
        assert_eq!(arrival.time_minutes, 5);
    }

    #[test]
    fn partial_minutes_round_up() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 30).unwrap();
        let arrival = Arrival::from_prediction(prediction_at(8, 5), now);
        // 4min 30s remaining → 5
        assert_eq!(arrival.time_minutes, 5);
    }

    #[test]
    fn due_within_current_minute_clamps_to_zero() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 30).unwrap();
        let arrival = Arrival::from_prediction(prediction_at(8, 0), now);
        assert_eq!(arrival.time_minutes, 0);
        assert!(arrival.is_due());
    }

    #[test]
    fn past_prediction_clamps_to_zero() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 8, 10, 0).unwrap();
        let arrival = Arrival::from_prediction(prediction_at(8, 5), now);
        assert_eq!(arrival.time_minutes, 0);
    }

    #[test]
    fn display_contains_line_and_minutes() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 0).unwrap();
        let arrival = Arrival::from_prediction(prediction_at(8, 7), now);
        let text = arrival.to_string();
        assert!(text.contains("151"));
        assert!(text.contains("7min"));
        assert!(text.contains("08:07"));
    }
}
