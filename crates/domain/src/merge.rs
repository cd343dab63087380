//! Merge and filter rules for arrival predictions
//!
//! One merge runs per stop per fetch cycle: apply the optional line filter,
//! compute minutes-until-arrival against the cycle clock, and order the result
//! deterministically.

use chrono::{DateTime, Utc};

use crate::entities::{Arrival, Prediction};
use crate::value_objects::LineFilter;

/// Merge raw predictions into the ordered arrival list for one stop
///
/// - With a filter, only predictions whose line code is in the allow-list are
///   kept (exact, case-insensitive match on trimmed codes); without one, all
///   predictions pass through.
/// - `time_minutes` is the integer ceiling of (arrival − `now`), clamped at
///   zero. Predictions are never dropped for being in the past.
/// - Output is ascending by arrival time, ties broken by line code then
///   vehicle id so repeated merges of the same input are identical.
///
/// An empty result is valid: it means no matching arrivals right now.
#[must_use]
pub fn merge_predictions(
    predictions: Vec<Prediction>,
    line_filter: Option<&LineFilter>,
    now: DateTime<Utc>,
) -> Vec<Arrival> {
    let mut arrivals: Vec<Arrival> = predictions
        .into_iter()
        .filter(|prediction| {
            line_filter.is_none_or(|filter| filter.matches(&prediction.line))
        })
        .map(|prediction| Arrival::from_prediction(prediction, now))
        .collect();

    arrivals.sort_by(|a, b| {
        a.arrival_time
            .cmp(&b.arrival_time)
            .then_with(|| a.line.cmp(&b.line))
            .then_with(|| a.vehicle_id.cmp(&b.vehicle_id))
    });

    arrivals
}
