//! City narrative from an OpenAI-compatible chat model (Groq)
//!
//! The narrator receives everything the other sources produced for a city,
//! plus the list of sources that failed, and returns free text built from a
//! fixed prompt template.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use tracing::instrument;

use super::{Source, SourceAdapter, send_json};
use crate::error::{SourceError, SourceErrorKind};
use crate::models::{AirQualityReading, AttractionRecord, CityStop, DailyForecast};

const SYSTEM_PROMPT: &str = "You are a travel planning assistant. Write a short, practical day plan \
for the city below using only the facts given. Mention the weather, what to wear, whether an \
umbrella or a mask is needed, and list attractions with their addresses. If some data is marked \
unavailable, say so briefly instead of guessing.";

/// Already-resolved Groq settings
#[derive(Debug, Clone)]
pub struct GroqSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
}

/// Everything known about one city once the data sources have settled
#[derive(Debug, Clone, PartialEq)]
pub struct CityDraft {
    pub stop: CityStop,
    pub attractions: Vec<AttractionRecord>,
    pub forecasts: Vec<DailyForecast>,
    pub air_quality: Vec<AirQualityReading>,
    /// Sources that produced nothing, with the reason
    pub unavailable: Vec<(Source, SourceErrorKind)>,
}

impl CityDraft {
    /// Render the draft as the user message
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        let stop = &self.stop;
        if stop.arrival == stop.departure {
            let _ = writeln!(out, "City: {} on {}", stop.name, stop.arrival);
        } else {
            let _ = writeln!(out, "City: {} from {} to {}", stop.name, stop.arrival, stop.departure);
        }

        out.push_str("Attractions:\n");
        for (i, attraction) in self.attractions.iter().enumerate() {
            let window = attraction.visit_window.as_deref().unwrap_or("any time");
            let address = attraction.address().unwrap_or("address unknown");
            let _ = writeln!(out, "{}. {} - {} ({})", i + 1, attraction.name, address, window);
        }

        for day in &self.forecasts {
            let _ = writeln!(
                out,
                "Weather {}: {}, {}, precipitation {}%, clothing: {}",
                day.date,
                day.condition,
                day.format_temperature(),
                day.precipitation_probability,
                day.clothing
            );
        }

        for reading in &self.air_quality {
            let _ = writeln!(
                out,
                "Air quality {}: AQI {} ({}), mask needed: {}",
                reading.date,
                reading.aqi,
                reading.category,
                if reading.mask_required { "yes" } else { "no" }
            );
        }

        for (source, kind) in &self.unavailable {
            let _ = writeln!(out, "Unavailable: {source} data ({kind})");
        }
        out
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NarratorAdapter {
    client: Client,
    settings: GroqSettings,
}

impl NarratorAdapter {
    #[must_use]
    pub fn new(client: Client, settings: &GroqSettings) -> Self {
        let mut settings = settings.clone();
        settings.base_url = settings.base_url.trim_end_matches('/').to_string();
        Self { client, settings }
    }
}

fn first_message(response: ChatResponse) -> Result<String, SourceError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| SourceError::unavailable("Narrator returned no content"))
}

#[async_trait]
impl SourceAdapter for NarratorAdapter {
    type Query = CityDraft;
    type Output = String;

    #[instrument(name = "narrator_fetch", level = "debug", skip_all, fields(city = %draft.stop.name))]
    async fn fetch(&self, draft: &CityDraft) -> Result<String, SourceError> {
        let user = draft.render();
        let body = ChatRequest {
            model: &self.settings.model,
            temperature: self.settings.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
        };
        let request = self
            .client
            .post(format!("{}/chat/completions", self.settings.base_url))
            .bearer_auth(&self.settings.api_key)
            .json(&body);

        let response: ChatResponse = send_json("narrator", request).await?;
        first_message(response)
    }
}
