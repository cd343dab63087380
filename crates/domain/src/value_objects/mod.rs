//! Value objects with built-in validation

mod line_filter;
mod stop_config;
mod stop_id;

pub use line_filter::LineFilter;
pub use stop_config::StopConfig;
pub use stop_id::StopId;
