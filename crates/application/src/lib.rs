//! Application layer for Fermata
//!
//! Defines the port the update coordinator consumes ([`ports::ArrivalsPort`])
//! and the coordinator service itself: the polling loop that keeps one
//! [`domain::StopSnapshot`] per configured stop fresh, tolerating partial
//! failures and coalescing on-demand refreshes.

pub mod error;
pub mod ports;
pub mod services;

pub use error::ApplicationError;
pub use ports::ArrivalsPort;
pub use services::{CoordinatorConfig, CycleOutcome, UpdateCoordinator};
