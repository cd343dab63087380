//! ANM API client
//!
//! Talks to the two ServiceInfoAnmLinee endpoints: the stop directory (XML)
//! and the per-stop arrival predictions (JSON). Every request carries the
//! browser-identification headers the service insists on, plus the scraped
//! API key; a rejected key is refreshed and the request retried exactly once.

use std::sync::Arc;
use std::time::Duration;

use application::{ApplicationError, ArrivalsPort};
use async_trait::async_trait;
use chrono::Local;
use domain::entities::{Prediction, StopInfo};
use domain::value_objects::StopId;
use moka::future::Cache;
use reqwest::{Client, RequestBuilder, StatusCode, header};
use tracing::{debug, instrument, warn};

use crate::config::AnmConfig;
use crate::credentials::{ApiKeyProvider, ScrapedApiKeyProvider};
use crate::error::AnmError;
use crate::models::{PredictionsPayload, parse_predictions, parse_stop_directory};

/// Path of the arrival predictions endpoint
pub const PREDICTIONS_ENDPOINT: &str = "/ServiceInfoAnmLinee.asmx/CaricaPrevisioniNuova";

/// Path of the stop directory endpoint
pub const STOPS_ENDPOINT: &str = "/ServiceInfoAnmLinee.asmx/CaricaElencoPaline";

/// User agent the service expects (it rejects obviously non-browser clients)
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Client for the ANM ServiceInfoAnmLinee API
pub struct AnmClient {
    client: Client,
    config: AnmConfig,
    keys: Arc<dyn ApiKeyProvider>,
    directory_cache: Cache<(), Arc<Vec<StopInfo>>>,
    directory_lock: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for AnmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnmClient")
            .field("base_url", &self.config.base_url)
            .field("timeout_secs", &self.config.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl AnmClient {
    /// Create a new client with a scraping key provider
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be initialized.
    pub fn new(config: &AnmConfig) -> Result<Self, AnmError> {
        config.validate().map_err(AnmError::ConfigurationError)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnmError::ConnectionFailed(e.to_string()))?;

        let keys = Arc::new(ScrapedApiKeyProvider::new(
            client.clone(),
            config.key_page_url.clone(),
        ));

        Ok(Self::with_key_provider(client, config, keys))
    }

    /// Create a client with a custom key provider
    ///
    /// The scraping strategy is the fragile part of this integration; swapping
    /// the provider leaves the rest of the client untouched.
    #[must_use]
    pub fn with_key_provider(
        client: Client,
        config: &AnmConfig,
        keys: Arc<dyn ApiKeyProvider>,
    ) -> Self {
        let cache_ttl = if config.stops_cache_ttl_minutes > 0 {
            Duration::from_secs(u64::from(config.stops_cache_ttl_minutes) * 60)
        } else {
            Duration::from_secs(1) // Minimal TTL when "disabled"
        };

        let directory_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(cache_ttl)
            .build();

        Self {
            client,
            config: config.clone(),
            keys,
            directory_cache,
            directory_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Apply the headers the service requires on every request
    fn anm_headers(request: RequestBuilder, accept: &'static str) -> RequestBuilder {
        request
            .header(header::ACCEPT, accept)
            .header(header::ACCEPT_LANGUAGE, "it-IT,it;q=0.9,en;q=0.8")
            .header(header::CACHE_CONTROL, "no-cache")
            .header(header::PRAGMA, "no-cache")
            .header(header::ORIGIN, "https://www.anm.it")
            .header(header::REFERER, "https://www.anm.it/")
            .header(header::USER_AGENT, USER_AGENT)
    }

    fn map_transport(&self, err: &reqwest::Error) -> AnmError {
        if err.is_timeout() {
            AnmError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            AnmError::ConnectionFailed(err.to_string())
        }
    }

    /// Fetch the full stop directory, using the cache when enabled
    ///
    /// Concurrent callers on a cold cache share one download.
    #[instrument(skip(self))]
    pub async fn fetch_stop_directory(&self) -> Result<Vec<StopInfo>, AnmError> {
        if self.config.caching_enabled() {
            if let Some(cached) = self.directory_cache.get(&()).await {
                debug!(stops = cached.len(), "Serving stop directory from cache");
                return Ok(cached.as_ref().clone());
            }
        }

        let _guard = self.directory_lock.lock().await;

        // Another caller may have filled the cache while we waited.
        if self.config.caching_enabled() {
            if let Some(cached) = self.directory_cache.get(&()).await {
                return Ok(cached.as_ref().clone());
            }
        }

        let stops = self.request_stop_directory().await?;
        debug!(stops = stops.len(), "Fetched stop directory");

        if self.config.caching_enabled() {
            self.directory_cache
                .insert((), Arc::new(stops.clone()))
                .await;
        }

        Ok(stops)
    }

    /// Look up one stop in the directory
    #[instrument(skip(self))]
    pub async fn fetch_stop_metadata(&self, stop_id: &StopId) -> Result<StopInfo, AnmError> {
        let stops = self.fetch_stop_directory().await?;
        stops
            .into_iter()
            .find(|stop| stop.id == stop_id.as_str())
            .ok_or_else(|| AnmError::StopNotFound {
                stop_id: stop_id.to_string(),
            })
    }

    /// Fetch the current arrival predictions for a stop
    ///
    /// An empty list means the stop has no approaching vehicles right now.
    #[instrument(skip(self))]
    pub async fn fetch_predictions(&self, stop_id: &StopId) -> Result<Vec<Prediction>, AnmError> {
        let key = self.keys.api_key().await?;

        match self.request_predictions(stop_id, &key.token).await? {
            PredictionsPayload::Arrivals(predictions) => Ok(predictions),
            PredictionsPayload::NoInformation => Ok(Vec::new()),
            PredictionsPayload::InvalidKey => {
                debug!(stop = %stop_id, "API key rejected; refreshing and retrying once");
                let key = self.keys.refresh_stale(&key.token).await?;

                match self.request_predictions(stop_id, &key.token).await? {
                    PredictionsPayload::Arrivals(predictions) => Ok(predictions),
                    PredictionsPayload::NoInformation => Ok(Vec::new()),
                    PredictionsPayload::InvalidKey => Err(AnmError::KeyRejected(
                        "service rejected a freshly derived key".to_string(),
                    )),
                }
            },
        }
    }

    /// Check if the service is reachable
    pub async fn is_available(&self) -> bool {
        self.client
            .get(&self.config.base_url)
            .send()
            .await
            .is_ok()
    }

    async fn request_predictions(
        &self,
        stop_id: &StopId,
        token: &str,
    ) -> Result<PredictionsPayload, AnmError> {
        let url = format!("{}{PREDICTIONS_ENDPOINT}", self.config.base_url);
        let payload = serde_json::json!({ "Palina": stop_id.as_str(), "key": token });

        let response = Self::anm_headers(self.client.post(&url), "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.map_transport(&e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(PredictionsPayload::InvalidKey);
        }
        if !status.is_success() {
            return Err(AnmError::RequestFailed(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnmError::ParseError(e.to_string()))?;

        parse_predictions(&body, &Local::now())
    }

    async fn request_stop_directory(&self) -> Result<Vec<StopInfo>, AnmError> {
        let key = self.keys.api_key().await?;

        match self.request_stop_directory_with(&key.token).await? {
            Some(stops) => Ok(stops),
            None => {
                debug!("API key rejected by the stop directory; refreshing and retrying once");
                let key = self.keys.refresh_stale(&key.token).await?;
                match self.request_stop_directory_with(&key.token).await? {
                    Some(stops) => Ok(stops),
                    None => Err(AnmError::KeyRejected(
                        "service rejected a freshly derived key".to_string(),
                    )),
                }
            },
        }
    }

    /// One directory request; `None` signals a rejected key
    async fn request_stop_directory_with(
        &self,
        token: &str,
    ) -> Result<Option<Vec<StopInfo>>, AnmError> {
        let url = format!("{}{STOPS_ENDPOINT}", self.config.base_url);

        let response = Self::anm_headers(self.client.post(&url), "application/xml")
            .form(&[("key", token)])
            .send()
            .await
            .map_err(|e| self.map_transport(&e))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(AnmError::RequestFailed(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnmError::ParseError(e.to_string()))?;

        if body.is_empty() {
            warn!("Stop directory answer was empty");
        }

        parse_stop_directory(&body).map(Some)
    }
}

#[async_trait]
impl ArrivalsPort for AnmClient {
    async fn fetch_stop_directory(&self) -> Result<Vec<StopInfo>, ApplicationError> {
        Ok(Self::fetch_stop_directory(self).await?)
    }

    async fn fetch_stop_metadata(&self, stop_id: &StopId) -> Result<StopInfo, ApplicationError> {
        Ok(Self::fetch_stop_metadata(self, stop_id).await?)
    }

    async fn fetch_predictions(
        &self,
        stop_id: &StopId,
    ) -> Result<Vec<Prediction>, ApplicationError> {
        Ok(Self::fetch_predictions(self, stop_id).await?)
    }

    async fn is_available(&self) -> bool {
        Self::is_available(self).await
    }
}
