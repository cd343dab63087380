//! Domain entities

mod arrival;
mod stop_info;
mod stop_snapshot;

pub use arrival::{Arrival, Prediction};
pub use stop_info::StopInfo;
pub use stop_snapshot::{ErrorKind, SnapshotError, StopSnapshot};
