//! Arrivals port
//!
//! The generic "stop query" capability the update coordinator polls. The ANM
//! adapter implements this against the real service; tests mock it.

use async_trait::async_trait;
use domain::entities::{Prediction, StopInfo};
use domain::value_objects::StopId;
#[cfg(test)]
use mockall::automock;

use crate::error::ApplicationError;

/// Port for querying the transit provider about stops and arrivals
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArrivalsPort: Send + Sync {
    /// Fetch the provider's full stop directory
    async fn fetch_stop_directory(&self) -> Result<Vec<StopInfo>, ApplicationError>;

    /// Fetch the directory entry for a single stop
    ///
    /// Fails with [`ApplicationError::StopNotFound`] when the id is absent
    /// from the directory.
    async fn fetch_stop_metadata(&self, stop_id: &StopId) -> Result<StopInfo, ApplicationError>;

    /// Fetch the current raw arrival predictions for a stop
    ///
    /// An empty list is a valid answer (no vehicles approaching right now).
    async fn fetch_predictions(
        &self,
        stop_id: &StopId,
    ) -> Result<Vec<Prediction>, ApplicationError>;

    /// Check whether the provider is reachable
    async fn is_available(&self) -> bool;
}
