//! Google Weather daily forecast adapter

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{CityWindow, GoogleCredentials, PlacesAdapter, SourceAdapter, send_json};
use crate::error::SourceError;
use crate::models::{DailyForecast, TemperatureRange};

/// Longest horizon the daily forecast endpoint serves
pub const MAX_FORECAST_DAYS: u32 = 10;

#[derive(Debug, Clone)]
pub struct WeatherAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    places: PlacesAdapter,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DaysLookupResponse {
    #[serde(default)]
    forecast_days: Vec<ForecastDay>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForecastDay {
    display_date: DisplayDate,
    daytime_forecast: DaytimeForecast,
    max_temperature: Degrees,
    min_temperature: Degrees,
    feels_like_max_temperature: Option<Degrees>,
    feels_like_min_temperature: Option<Degrees>,
}

#[derive(Debug, Deserialize)]
struct DisplayDate {
    year: i32,
    month: u32,
    day: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DaytimeForecast {
    weather_condition: Option<WeatherCondition>,
    precipitation: Option<Precipitation>,
    wind: Option<Wind>,
}

#[derive(Debug, Deserialize)]
struct WeatherCondition {
    description: Option<Text>,
}

#[derive(Debug, Deserialize)]
struct Text {
    text: String,
}

#[derive(Debug, Deserialize)]
struct Precipitation {
    probability: Option<Probability>,
}

#[derive(Debug, Deserialize)]
struct Probability {
    #[serde(default)]
    percent: u8,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: Option<Speed>,
}

#[derive(Debug, Deserialize)]
struct Speed {
    #[serde(default)]
    value: f32,
}

#[derive(Debug, Deserialize)]
struct Degrees {
    degrees: f32,
}

impl WeatherAdapter {
    #[must_use]
    pub fn new(client: Client, credentials: &GoogleCredentials, places: PlacesAdapter) -> Self {
        Self {
            client,
            api_key: credentials.api_key.clone(),
            base_url: credentials.weather_base_url.trim_end_matches('/').to_string(),
            places,
        }
    }
}

impl ForecastDay {
    fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.display_date.year, self.display_date.month, self.display_date.day)
    }

    fn into_forecast(self, date: NaiveDate, city: &str) -> DailyForecast {
        let temperature = TemperatureRange::new(self.min_temperature.degrees, self.max_temperature.degrees);
        let feels_like = match (&self.feels_like_min_temperature, &self.feels_like_max_temperature) {
            (Some(min), Some(max)) => TemperatureRange::new(min.degrees, max.degrees),
            _ => temperature,
        };
        let daytime = self.daytime_forecast;
        let condition = daytime
            .weather_condition
            .and_then(|c| c.description)
            .map_or_else(|| "Unknown".to_string(), |d| d.text);
        let precipitation = daytime
            .precipitation
            .and_then(|p| p.probability)
            .map_or(0, |p| p.percent.min(100));
        let wind_kph = daytime.wind.and_then(|w| w.speed).map_or(0.0, |s| s.value);

        DailyForecast::new(date, city, temperature, feels_like, condition, precipitation, wind_kph)
    }
}

/// Keep only the days inside the window
fn forecasts_in_window(response: DaysLookupResponse, window: &CityWindow) -> Result<Vec<DailyForecast>, SourceError> {
    let mut forecasts: Vec<DailyForecast> = response
        .forecast_days
        .into_iter()
        .filter_map(|day| {
            let date = day.date()?;
            window.contains(date).then(|| day.into_forecast(date, window.city()))
        })
        .collect();

    if forecasts.is_empty() {
        return Err(SourceError::not_found(format!(
            "No forecast for {} between {} and {}. Only the next {MAX_FORECAST_DAYS} days are available.",
            window.city(),
            window.start(),
            window.end()
        )));
    }

    let expected = window.end().signed_duration_since(window.start()).num_days() + 1;
    if (forecasts.len() as i64) < expected {
        warn!(
            city = window.city(),
            covered = forecasts.len(),
            expected,
            "Forecast covers only part of the stay"
        );
    }

    forecasts.sort_by_key(|f| f.date);
    Ok(forecasts)
}

#[async_trait]
impl SourceAdapter for WeatherAdapter {
    type Query = CityWindow;
    type Output = Vec<DailyForecast>;

    #[instrument(name = "weather_fetch", level = "debug", skip(self), fields(city = window.city()))]
    async fn fetch(&self, window: &CityWindow) -> Result<Vec<DailyForecast>, SourceError> {
        let location = self.places.locate_city(window.city()).await?;

        let url = format!("{}/forecast/days:lookup", self.base_url);
        let days = MAX_FORECAST_DAYS.to_string();
        let request = self.client.get(url).query(&[
            ("location.latitude", location.latitude.to_string()),
            ("location.longitude", location.longitude.to_string()),
            ("days", days.clone()),
            ("pageSize", days),
            ("key", self.api_key.clone()),
        ]);

        let response: DaysLookupResponse = send_json("weather", request).await?;
        debug!(days = response.forecast_days.len(), "Received daily forecast");
        forecasts_in_window(response, window)
    }
}
