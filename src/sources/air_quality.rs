//! Google Air Quality hourly forecast adapter
//!
//! The provider forecasts hourly AQI for the next four days. Hours are
//! reduced to one reading per date, keeping the worst hour so that the mask
//! advice errs on the safe side.
//!
//! Dates are UTC calendar days: trip dates map to UTC midnights when
//! requesting the period, and hours are grouped by their UTC date. The city's
//! local offset is not known here.

use async_trait::async_trait;
use chrono::{DateTime, DurationRound, NaiveDate, TimeDelta, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use super::{CityWindow, GoogleCredentials, PlacesAdapter, SourceAdapter, send_json};
use crate::error::SourceError;
use crate::models::request::next_day;
use crate::models::{AirQualityReading, Coordinates};

/// How far ahead the provider forecasts
pub const AIR_QUALITY_HORIZON_HOURS: i64 = 96;
const PAGE_SIZE: u32 = 96;
const MAX_PAGES: usize = 8;

#[derive(Debug, Clone)]
pub struct AirQualityAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    places: PlacesAdapter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ForecastRequest<'a> {
    location: LocationBody,
    period: Period,
    universal_aqi: bool,
    page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    page_token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct LocationBody {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Period {
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastResponse {
    #[serde(default)]
    hourly_forecasts: Vec<HourlyForecast>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HourlyForecast {
    date_time: DateTime<Utc>,
    #[serde(default)]
    indexes: Vec<AqiIndex>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AqiIndex {
    aqi: Option<u32>,
    category: Option<String>,
    dominant_pollutant: Option<String>,
}

impl AirQualityAdapter {
    #[must_use]
    pub fn new(client: Client, credentials: &GoogleCredentials, places: PlacesAdapter) -> Self {
        Self {
            client,
            api_key: credentials.api_key.clone(),
            base_url: credentials.air_quality_base_url.trim_end_matches('/').to_string(),
            places,
        }
    }

    async fn hourly(&self, location: Coordinates, period: &Period) -> Result<Vec<HourlyForecast>, SourceError> {
        let url = format!("{}/forecast:lookup", self.base_url);
        let mut hours = Vec::new();
        let mut page_token: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let body = ForecastRequest {
                location: LocationBody {
                    latitude: location.latitude,
                    longitude: location.longitude,
                },
                period: Period {
                    start_time: period.start_time,
                    end_time: period.end_time,
                },
                universal_aqi: true,
                page_size: PAGE_SIZE,
                page_token: page_token.as_deref(),
            };
            let request = self
                .client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body);

            let page: ForecastResponse = send_json("air quality", request).await?;
            hours.extend(page.hourly_forecasts);

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(hours)
    }
}

/// Part of the window the provider can forecast, as seen from `now`
///
/// Window dates are taken as UTC days.
fn forecast_period(window: &CityWindow, now: DateTime<Utc>) -> Option<Period> {
    let window_start = window.start().and_hms_opt(0, 0, 0)?.and_utc();
    let window_end = next_day(window.end()).and_hms_opt(0, 0, 0)?.and_utc();

    let first_hour = now.duration_trunc(TimeDelta::hours(1)).unwrap_or(now) + TimeDelta::hours(1);
    let horizon = now + TimeDelta::hours(AIR_QUALITY_HORIZON_HOURS);

    let start_time = window_start.max(first_hour);
    let end_time = window_end.min(horizon);
    (start_time < end_time).then_some(Period {
        start_time,
        end_time,
    })
}

/// Worst hour of each UTC date inside the window
fn daily_worst(hours: Vec<HourlyForecast>, window: &CityWindow) -> Vec<AirQualityReading> {
    let mut worst: BTreeMap<NaiveDate, (u32, AqiIndex)> = BTreeMap::new();

    for hour in hours {
        let date = hour.date_time.date_naive();
        if !window.contains(date) {
            continue;
        }
        let Some(index) = hour.indexes.into_iter().next() else {
            continue;
        };
        let Some(aqi) = index.aqi else {
            continue;
        };
        match worst.get(&date) {
            Some((current, _)) if *current >= aqi => {}
            _ => {
                worst.insert(date, (aqi, index));
            }
        }
    }

    worst
        .into_iter()
        .map(|(date, (aqi, index))| {
            AirQualityReading::new(
                date,
                window.city(),
                aqi,
                index.category.unwrap_or_else(|| "Unknown".to_string()),
            )
            .with_pollutant(index.dominant_pollutant)
        })
        .collect()
}

#[async_trait]
impl SourceAdapter for AirQualityAdapter {
    type Query = CityWindow;
    type Output = Vec<AirQualityReading>;

    #[instrument(name = "air_quality_fetch", level = "debug", skip(self), fields(city = window.city()))]
    async fn fetch(&self, window: &CityWindow) -> Result<Vec<AirQualityReading>, SourceError> {
        let Some(period) = forecast_period(window, Utc::now()) else {
            return Err(SourceError::not_found(format!(
                "{} to {} is outside the {AIR_QUALITY_HORIZON_HOURS}h air quality forecast",
                window.start(),
                window.end()
            )));
        };

        let location = self.places.locate_city(window.city()).await?;
        let hours = self.hourly(location, &period).await?;
        debug!(hours = hours.len(), "Received hourly air quality");

        let readings = daily_worst(hours, window);
        if readings.is_empty() {
            return Err(SourceError::not_found(format!(
                "No air quality data available for {}",
                window.city()
            )));
        }
        Ok(readings)
    }
}
