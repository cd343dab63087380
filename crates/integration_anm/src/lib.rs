//! ANM integration for Fermata
//!
//! Adapter for the public-transport API of ANM (Azienda Napoletana Mobilità,
//! Naples). The service publishes a stop directory as XML and per-stop arrival
//! predictions as JSON, authenticated with a short-lived key that the official
//! web app embeds in its legacy InfoClick page.
//!
//! # Architecture
//!
//! The crate follows the client-trait pattern of the other integration crates.
//! [`AnmClient`] implements the application layer's `ArrivalsPort`;
//! [`ApiKeyProvider`] isolates the scraped-key derivation (implemented by
//! [`ScrapedApiKeyProvider`]) so the fragile scraping strategy can be replaced
//! without touching the client.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain::value_objects::StopId;
//! use integration_anm::{AnmClient, AnmConfig};
//!
//! let client = AnmClient::new(&AnmConfig::default())?;
//! let predictions = client.fetch_predictions(&StopId::new("2103")?).await?;
//! ```

mod client;
mod config;
mod credentials;
mod error;
mod models;

pub use client::{AnmClient, PREDICTIONS_ENDPOINT, STOPS_ENDPOINT};
pub use config::{AnmConfig, MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS};
pub use credentials::{ApiKey, ApiKeyProvider, ScrapedApiKeyProvider};
pub use error::AnmError;
