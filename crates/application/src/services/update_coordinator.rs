//! Update coordinator
//!
//! Owns the polling loop: one fetch cycle per period across all configured
//! stops, per-stop fan-out, partial-failure isolation, and a read API over the
//! latest snapshots. On-demand refreshes are coalesced so overlapping triggers
//! never duplicate network traffic for a stop.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use domain::entities::{SnapshotError, StopSnapshot};
use domain::merge_predictions;
use domain::value_objects::{StopConfig, StopId};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::{Notify, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use crate::error::ApplicationError;
use crate::ports::ArrivalsPort;

/// Result of one fetch cycle across all configured stops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// Every stop was fetched successfully
    Success,
    /// Some stops failed; their snapshots keep stale data
    PartialFailure,
    /// Every stop failed; all snapshots keep stale data
    TotalFailure,
}

impl CycleOutcome {
    /// Get a human-readable label
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::PartialFailure => "partial failure",
            Self::TotalFailure => "total failure",
        }
    }
}

impl std::fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Configuration for the update coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Polling period in seconds
    #[serde(default = "default_update_interval_secs")]
    pub update_interval_secs: u64,
}

/// Minimum accepted polling period
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 10;
/// Maximum accepted polling period
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 3600;

const fn default_update_interval_secs() -> u64 {
    60
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            update_interval_secs: default_update_interval_secs(),
        }
    }
}

impl CoordinatorConfig {
    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the polling period is outside the accepted bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.update_interval_secs < MIN_UPDATE_INTERVAL_SECS
            || self.update_interval_secs > MAX_UPDATE_INTERVAL_SECS
        {
            return Err(format!(
                "update_interval_secs must be between {MIN_UPDATE_INTERVAL_SECS} and {MAX_UPDATE_INTERVAL_SECS}, got {}",
                self.update_interval_secs
            ));
        }
        Ok(())
    }
}

/// Coordinates periodic fetches and exposes the latest per-stop snapshots
///
/// Reads ([`Self::get_snapshot`], [`Self::last_updated`]) never block on I/O
/// and never fail: they return the best-known data plus the most recent error.
pub struct UpdateCoordinator {
    inner: Arc<CoordinatorInner>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct CoordinatorInner {
    port: Arc<dyn ArrivalsPort>,
    stops: Vec<StopConfig>,
    interval: Duration,
    snapshots: RwLock<HashMap<StopId, StopSnapshot>>,
    last_updated: RwLock<Option<DateTime<Utc>>>,
    last_outcome: RwLock<Option<CycleOutcome>>,
    refresh: Notify,
    cycle_in_flight: AtomicBool,
}

impl std::fmt::Debug for UpdateCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateCoordinator")
            .field("stops", &self.inner.stops.len())
            .field("interval", &self.inner.interval)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl UpdateCoordinator {
    /// Create a coordinator for the given stop set
    ///
    /// Snapshots are seeded in the pending state; nothing is fetched until
    /// [`Self::start`] is called.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the stop set is
    /// empty, or a stop id appears twice.
    pub fn new(
        port: Arc<dyn ArrivalsPort>,
        stops: Vec<StopConfig>,
        config: &CoordinatorConfig,
    ) -> Result<Self, ApplicationError> {
        config
            .validate()
            .map_err(ApplicationError::Configuration)?;

        if stops.is_empty() {
            return Err(ApplicationError::Configuration(
                "at least one stop must be configured".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for stop in &stops {
            if !seen.insert(stop.stop_id.clone()) {
                return Err(ApplicationError::Configuration(format!(
                    "stop {} is configured twice",
                    stop.stop_id
                )));
            }
        }

        let snapshots = stops
            .iter()
            .map(|stop| {
                (
                    stop.stop_id.clone(),
                    StopSnapshot::pending(stop.stop_id.clone(), stop.stop_name.clone()),
                )
            })
            .collect();

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                port,
                stops,
                interval: Duration::from_secs(config.update_interval_secs),
                snapshots: RwLock::new(snapshots),
                last_updated: RwLock::new(None),
                last_outcome: RwLock::new(None),
                refresh: Notify::new(),
                cycle_in_flight: AtomicBool::new(false),
            }),
            shutdown_tx,
            task: Mutex::new(None),
        })
    }

    /// Start the polling loop
    ///
    /// The first cycle runs immediately, then one cycle per period. Calling
    /// this while already running is a no-op.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            debug!("Update coordinator already running");
            return;
        }

        let _ = self.shutdown_tx.send_replace(false);
        let inner = Arc::clone(&self.inner);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(inner.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {},
                    () = inner.refresh.notified() => {},
                }

                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    () = inner.run_cycle() => {},
                }

                // Consume refresh triggers that raced with the finished cycle
                // so they coalesce into it instead of starting another one.
                let mut pending = std::pin::pin!(inner.refresh.notified());
                if pending.as_mut().enable() {
                    debug!("Coalesced refresh trigger into the completed cycle");
                }
            }

            debug!("Polling loop exited");
        });

        *task = Some(handle);
        info!(
            interval_secs = self.inner.interval.as_secs(),
            stops = self.inner.stops.len(),
            "Update coordinator started"
        );
    }

    /// Stop the polling loop
    ///
    /// An in-flight cycle is cancelled cooperatively; request timeouts bound
    /// the worst-case wait. Snapshots keep their last-known-good state and
    /// remain readable.
    pub async fn stop(&self) {
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            let _ = self.shutdown_tx.send(true);
            let _ = handle.await;
            info!("Update coordinator stopped");
        }
    }

    /// Whether the polling loop is running
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }

    /// Trigger an immediate fetch cycle outside the normal period
    ///
    /// Non-blocking. While a cycle is already in flight this is a no-op: the
    /// caller observes that cycle's results, and concurrent triggers never
    /// duplicate per-stop network traffic.
    pub fn force_refresh(&self) {
        if self.inner.cycle_in_flight.load(Ordering::SeqCst) {
            debug!("Refresh requested while a cycle is in flight; joining it");
            return;
        }
        self.inner.refresh.notify_one();
    }

    /// Whether a fetch cycle is currently in flight
    #[must_use]
    pub fn is_cycle_in_flight(&self) -> bool {
        self.inner.cycle_in_flight.load(Ordering::SeqCst)
    }

    /// Latest snapshot for a configured stop
    ///
    /// Returns `None` only for stop ids that are not part of the
    /// configuration. Never blocks on I/O, never fails.
    #[must_use]
    pub fn get_snapshot(&self, stop_id: &StopId) -> Option<StopSnapshot> {
        self.inner.snapshots.read().get(stop_id).cloned()
    }

    /// All snapshots, in configuration order
    #[must_use]
    pub fn snapshots(&self) -> Vec<StopSnapshot> {
        let snapshots = self.inner.snapshots.read();
        self.inner
            .stops
            .iter()
            .filter_map(|stop| snapshots.get(&stop.stop_id).cloned())
            .collect()
    }

    /// Time of the most recent cycle with at least one successful stop
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_updated.read()
    }

    /// Outcome of the most recent cycle
    #[must_use]
    pub fn last_outcome(&self) -> Option<CycleOutcome> {
        *self.inner.last_outcome.read()
    }

    /// The configured stops
    #[must_use]
    pub fn stops(&self) -> &[StopConfig] {
        &self.inner.stops
    }
}

impl CoordinatorInner {
    /// Run one fetch cycle across all configured stops
    ///
    /// Stops are fetched concurrently; a failure on one stop never aborts the
    /// others. Failed stops keep their stale arrivals with the error recorded.
    #[instrument(skip(self))]
    async fn run_cycle(&self) {
        self.cycle_in_flight.store(true, Ordering::SeqCst);
        debug!(stops = self.stops.len(), "Starting fetch cycle");

        let mut tasks = JoinSet::new();
        for stop in self.stops.iter().cloned() {
            let port = Arc::clone(&self.port);
            tasks.spawn(async move {
                // The directory lookup is how an unknown stop id surfaces as a
                // configuration error instead of an endlessly empty board.
                let result = match port.fetch_stop_metadata(&stop.stop_id).await {
                    Ok(_) => port.fetch_predictions(&stop.stop_id).await,
                    Err(err) => Err(err),
                };
                (stop, result)
            });
        }

        let mut succeeded = 0usize;
        let mut failed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            let Ok((stop, result)) = joined else {
                failed += 1;
                continue;
            };

            let now = Utc::now();
            match result {
                Ok(predictions) => {
                    let arrivals = merge_predictions(predictions, stop.line_filter.as_ref(), now);
                    let mut snapshots = self.snapshots.write();
                    if let Some(snapshot) = snapshots.get_mut(&stop.stop_id) {
                        snapshot.record_success(arrivals, now);
                    }
                    succeeded += 1;
                },
                Err(err) => {
                    warn!(stop = %stop.stop_id, error = %err, "Stop fetch failed; keeping stale snapshot");
                    let mut snapshots = self.snapshots.write();
                    if let Some(snapshot) = snapshots.get_mut(&stop.stop_id) {
                        snapshot.record_failure(SnapshotError::new(
                            err.snapshot_kind(),
                            err.to_string(),
                            now,
                        ));
                    }
                    failed += 1;
                },
            }
        }

        let outcome = if failed == 0 {
            CycleOutcome::Success
        } else if succeeded > 0 {
            CycleOutcome::PartialFailure
        } else {
            CycleOutcome::TotalFailure
        };

        if succeeded > 0 {
            *self.last_updated.write() = Some(Utc::now());
        }
        *self.last_outcome.write() = Some(outcome);
        self.cycle_in_flight.store(false, Ordering::SeqCst);

        match outcome {
            CycleOutcome::Success => debug!(stops = succeeded, "Fetch cycle completed"),
            CycleOutcome::PartialFailure => {
                warn!(succeeded, failed, "Fetch cycle completed with failures");
            },
            CycleOutcome::TotalFailure => warn!(failed, "Fetch cycle failed for every stop"),
        }
    }
}
