//! Data sources behind one fetch contract
//!
//! Each external API (Google Places, Weather, Air Quality and the Groq chat
//! model used for narration) is wrapped by a stateless adapter implementing
//! [`SourceAdapter`]. The set of sources is closed: [`Source`] names them and
//! [`Adapters`] holds exactly one adapter per source.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SourceError;
use crate::models::{AirQualityReading, DailyForecast, ResolvedPlace};

pub mod air_quality;
pub mod narrator;
pub mod places;
pub mod weather;

pub use air_quality::AirQualityAdapter;
pub use narrator::{CityDraft, GroqSettings, NarratorAdapter};
pub use places::{PlaceQuery, PlacesAdapter};
pub use weather::WeatherAdapter;

/// The data sources the planner knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Places,
    Weather,
    AirQuality,
    Narrator,
}

impl Source {
    pub const ALL: [Source; 4] = [
        Source::Places,
        Source::Weather,
        Source::AirQuality,
        Source::Narrator,
    ];
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Places => "places",
            Source::Weather => "weather",
            Source::AirQuality => "air quality",
            Source::Narrator => "narrator",
        };
        f.write_str(name)
    }
}

/// Uniform contract for one external data source
///
/// Implementations hold no per-call state and may be called concurrently.
/// The only side effect of `fetch` is the outbound request.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    type Query: Send + Sync;
    type Output: Send;

    async fn fetch(&self, query: &Self::Query) -> Result<Self::Output, SourceError>;
}

pub type PlacesSource = Arc<dyn SourceAdapter<Query = PlaceQuery, Output = ResolvedPlace>>;
pub type WeatherSource = Arc<dyn SourceAdapter<Query = CityWindow, Output = Vec<DailyForecast>>>;
pub type AirQualitySource =
    Arc<dyn SourceAdapter<Query = CityWindow, Output = Vec<AirQualityReading>>>;
pub type NarratorSource = Arc<dyn SourceAdapter<Query = CityDraft, Output = String>>;

/// One adapter per source, injected into the orchestrator
#[derive(Clone)]
pub struct Adapters {
    pub places: PlacesSource,
    pub weather: WeatherSource,
    pub air_quality: AirQualitySource,
    pub narrator: NarratorSource,
}

impl Adapters {
    /// Production adapters backed by Google Maps Platform and Groq
    #[must_use]
    pub fn google(client: Client, google: &GoogleCredentials, groq: &GroqSettings) -> Self {
        let places = PlacesAdapter::new(client.clone(), google);
        Self {
            places: Arc::new(places.clone()),
            weather: Arc::new(WeatherAdapter::new(client.clone(), google, places.clone())),
            air_quality: Arc::new(AirQualityAdapter::new(client.clone(), google, places)),
            narrator: Arc::new(NarratorAdapter::new(client, groq)),
        }
    }
}

/// Already-resolved Google Maps Platform credentials and endpoints
#[derive(Debug, Clone)]
pub struct GoogleCredentials {
    pub api_key: String,
    pub places_base_url: String,
    pub weather_base_url: String,
    pub air_quality_base_url: String,
}

/// A city and the inclusive date range of the stay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CityWindow {
    city: String,
    start: NaiveDate,
    end: NaiveDate,
}

impl CityWindow {
    /// Rejects an empty city name or a range whose start is after its end
    pub fn new<S: Into<String>>(city: S, start: NaiveDate, end: NaiveDate) -> Result<Self, SourceError> {
        let city = city.into();
        if city.trim().is_empty() {
            return Err(SourceError::invalid_query("city name must not be empty"));
        }
        if start > end {
            return Err(SourceError::invalid_query(format!(
                "date range {start}..{end} is reversed"
            )));
        }
        Ok(Self { city, start, end })
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    #[must_use]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Build the shared HTTP client
pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    use anyhow::Context;

    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("itinerai/", env!("CARGO_PKG_VERSION")))
        .build()
        .with_context(|| "Failed to create HTTP client")
}

/// Map a non-success HTTP response onto a source error
pub(crate) fn classify_status(api: &str, status: StatusCode, body: &str) -> SourceError {
    let snippet: String = body.chars().take(200).collect();
    match status.as_u16() {
        401 | 403 => SourceError::unauthorized(format!("{api} API rejected the key ({status})")),
        // Google answers an invalid key with 400 INVALID_ARGUMENT
        400 if body.contains("API_KEY_INVALID") || body.contains("API key not valid") => {
            SourceError::unauthorized(format!("{api} API key is not valid"))
        }
        404 => SourceError::not_found(format!("{api} API returned 404: {snippet}")),
        408 => SourceError::timeout(format!("{api} API request timed out")),
        429 => SourceError::rate_limited(format!("{api} API rate limit exceeded")),
        _ => SourceError::unavailable(format!("{api} API error {status}: {snippet}")),
    }
}

/// Send a prepared request and decode a JSON body, classifying failures
pub(crate) async fn send_json<T: serde::de::DeserializeOwned>(
    api: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, SourceError> {
    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        tracing::debug!(api, %status, "Non-success response");
        return Err(classify_status(api, status, &body));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::unavailable(format!("Failed to parse {api} response: {e}")))
}
