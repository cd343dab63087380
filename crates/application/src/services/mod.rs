//! Application services

mod update_coordinator;

pub use update_coordinator::{CoordinatorConfig, CycleOutcome, UpdateCoordinator};
