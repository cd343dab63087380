//! Scraped-key credential manager
//!
//! ANM does not hand out API keys: the official web app embeds a short-lived
//! key in its legacy InfoClick page, and clients are expected to pick it up
//! from there. The scraping lives behind [`ApiKeyProvider`] so the strategy
//! can be swapped without touching the client or the coordinator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::error::AnmError;

/// Marker preceding the embedded key in the InfoClick page source
const KEY_MARKER: &str = "var key_anm='";

/// A derived ANM API key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey {
    /// The key value sent with every API request
    pub token: String,
    /// When the key was derived
    pub obtained_at: DateTime<Utc>,
}

/// Source of ANM API keys
#[async_trait]
pub trait ApiKeyProvider: Send + Sync {
    /// Get the current key, deriving one if none is cached
    async fn api_key(&self) -> Result<ApiKey, AnmError>;

    /// Replace a key the service has rejected
    ///
    /// Re-derives only if the cached key still equals `stale_token`; when a
    /// concurrent caller already refreshed, the cached key is returned as-is.
    /// Concurrent auth failures therefore cost exactly one derivation.
    async fn refresh_stale(&self, stale_token: &str) -> Result<ApiKey, AnmError>;

    /// Drop the cached key so the next call derives a fresh one
    async fn invalidate(&self);
}

/// Key provider that scrapes the legacy InfoClick page
pub struct ScrapedApiKeyProvider {
    client: Client,
    key_page_url: String,
    cached: Mutex<Option<ApiKey>>,
}

impl std::fmt::Debug for ScrapedApiKeyProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScrapedApiKeyProvider")
            .field("key_page_url", &self.key_page_url)
            .finish_non_exhaustive()
    }
}

impl ScrapedApiKeyProvider {
    /// Create a provider scraping the given page
    pub fn new(client: Client, key_page_url: impl Into<String>) -> Self {
        Self {
            client,
            key_page_url: key_page_url.into(),
            cached: Mutex::new(None),
        }
    }

    /// Fetch the page and extract a fresh key
    #[instrument(skip(self))]
    async fn derive(&self) -> Result<ApiKey, AnmError> {
        let response = self
            .client
            .get(&self.key_page_url)
            .send()
            .await
            .map_err(|e| AnmError::KeyDerivationFailed(format!("key page unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnmError::KeyDerivationFailed(format!(
                "key page returned HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AnmError::KeyDerivationFailed(e.to_string()))?;

        let token = extract_key(&body)?;
        debug!("Derived a fresh ANM API key");

        Ok(ApiKey {
            token,
            obtained_at: Utc::now(),
        })
    }
}

#[async_trait]
impl ApiKeyProvider for ScrapedApiKeyProvider {
    async fn api_key(&self) -> Result<ApiKey, AnmError> {
        let mut cached = self.cached.lock().await;
        if let Some(key) = cached.as_ref() {
            return Ok(key.clone());
        }

        let key = self.derive().await?;
        *cached = Some(key.clone());
        Ok(key)
    }

    async fn refresh_stale(&self, stale_token: &str) -> Result<ApiKey, AnmError> {
        let mut cached = self.cached.lock().await;
        if let Some(key) = cached.as_ref() {
            if key.token != stale_token {
                debug!("Key already refreshed by a concurrent caller; reusing it");
                return Ok(key.clone());
            }
        }

        let key = self.derive().await?;
        *cached = Some(key.clone());
        Ok(key)
    }

    async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}

/// Extract the embedded key from the InfoClick page source
fn extract_key(page: &str) -> Result<String, AnmError> {
    let start = page.find(KEY_MARKER).ok_or_else(|| {
        AnmError::KeyDerivationFailed("key marker not found in page".to_string())
    })? + KEY_MARKER.len();

    let rest = &page[start..];
    let end = rest.find('\'').ok_or_else(|| {
        AnmError::KeyDerivationFailed("unterminated key in page".to_string())
    })?;

    let token = &rest[..end];
    if token.is_empty() || !token.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(AnmError::KeyDerivationFailed(format!(
            "embedded key has unexpected format: '{token}'"
        )));
    }

    Ok(token.to_string())
}
