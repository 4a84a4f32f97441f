//! Production adapters against a local mock of the Google and Groq APIs

use axum::extract::Query;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use itinerai::models::{AttractionStub, CityStop, Coordinates};
use itinerai::sources::{CityDraft, GoogleCredentials, GroqSettings, PlaceQuery, http_client};
use itinerai::{
    Adapters, CallPolicy, CityWindow, ItineraryRequest, OrchestrationError, Orchestrator,
    PlannerError, Source, SourceErrorKind,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const GOOGLE_KEY: &str = "google-test-key";
const GROQ_KEY: &str = "groq-test-key";

async fn text_search(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
    let query = params.get("query").cloned().unwrap_or_default();
    if params.get("key").map(String::as_str) == Some("bad-key") {
        return Json(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "results": []
        }));
    }
    if query.starts_with("Nowhere") {
        return Json(json!({"status": "ZERO_RESULTS", "results": []}));
    }
    Json(json!({
        "status": "OK",
        "results": [{
            "name": query,
            "formatted_address": format!("Address of {query}"),
            "geometry": {"location": {"lat": 48.85, "lng": 2.35}}
        }]
    }))
}

async fn days_lookup(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if params.get("key").map(String::as_str) == Some("limited") {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"error": {"code": 429, "status": "RESOURCE_EXHAUSTED"}})),
        );
    }
    if !params.contains_key("location.latitude") || !params.contains_key("location.longitude") {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": {"status": "INVALID_ARGUMENT"}})));
    }
    let day = |day: u32, text: &str, percent: u8, min: f32, max: f32| {
        json!({
            "displayDate": {"year": 2026, "month": 2, "day": day},
            "daytimeForecast": {
                "weatherCondition": {"description": {"text": text}},
                "precipitation": {"probability": {"percent": percent}},
                "wind": {"speed": {"value": 14}}
            },
            "maxTemperature": {"degrees": max},
            "minTemperature": {"degrees": min}
        })
    };
    (
        StatusCode::OK,
        Json(json!({"forecastDays": [
            day(16, "Light rain", 60, 3.0, 9.0),
            day(17, "Sunny", 0, 18.0, 26.0)
        ]})),
    )
}

async fn air_quality_lookup(Json(body): Json<Value>) -> Json<Value> {
    let start = body["period"]["startTime"].as_str().unwrap_or_default();
    let date = start.get(..10).unwrap_or_default().to_string();

    match body.get("pageToken").and_then(Value::as_str) {
        None => Json(json!({
            "hourlyForecasts": [{
                "dateTime": format!("{date}T12:00:00Z"),
                "indexes": [{"code": "uaqi", "aqi": 120, "category": "Poor air quality", "dominantPollutant": "pm25"}]
            }],
            "nextPageToken": "page-2"
        })),
        Some(_) => Json(json!({
            "hourlyForecasts": [{
                "dateTime": format!("{date}T15:00:00Z"),
                "indexes": [{"code": "uaqi", "aqi": 80, "category": "Moderate air quality"}]
            }]
        })),
    }
}

async fn chat(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    let bearer = format!("Bearer {GROQ_KEY}");
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == bearer);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "Invalid API Key"}})),
        );
    }

    let user = body["messages"][1]["content"].as_str().unwrap_or_default();
    let first_line = user.lines().next().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "choices": [{"message": {"role": "assistant", "content": format!("Plan: {first_line}")}}]
        })),
    )
}

async fn serve() -> String {
    let app = Router::new()
        .route("/places/textsearch/json", get(text_search))
        .route("/weather/forecast/days:lookup", get(days_lookup))
        .route("/aq/forecast:lookup", post(air_quality_lookup))
        .route("/groq/chat/completions", post(chat));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn adapters_with_keys(google_key: &str, groq_key: &str) -> Adapters {
    let base = serve().await;
    let google = GoogleCredentials {
        api_key: google_key.to_string(),
        places_base_url: format!("{base}/places"),
        weather_base_url: format!("{base}/weather/"),
        air_quality_base_url: format!("{base}/aq"),
    };
    let groq = GroqSettings {
        api_key: groq_key.to_string(),
        base_url: format!("{base}/groq"),
        model: "llama-3.1-8b-instant".to_string(),
        temperature: 0.0,
    };
    Adapters::google(http_client(Duration::from_secs(5)).unwrap(), &google, &groq)
}

async fn adapters() -> Adapters {
    adapters_with_keys(GOOGLE_KEY, GROQ_KEY).await
}

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
}

#[tokio::test]
async fn test_places_resolves_attraction() {
    let adapters = adapters().await;
    let place = adapters
        .places
        .fetch(&PlaceQuery::new("Eiffel Tower", "Paris"))
        .await
        .unwrap();

    assert_eq!(place.name, "Eiffel Tower, Paris");
    assert_eq!(place.address, "Address of Eiffel Tower, Paris");
    assert_eq!(place.coordinates, Coordinates::new(48.85, 2.35));
}

#[tokio::test]
async fn test_places_zero_results_is_not_found() {
    let adapters = adapters().await;
    let err = adapters
        .places
        .fetch(&PlaceQuery::new("Nowhere Palace", "Paris"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::NotFound);
}

#[tokio::test]
async fn test_places_rejects_empty_query_without_calling() {
    let adapters = adapters().await;
    let err = adapters
        .places
        .fetch(&PlaceQuery::new("Eiffel Tower", "  "))
        .await
        .unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::InvalidQuery);
}

#[tokio::test]
async fn test_request_denied_is_unauthorized() {
    let adapters = adapters_with_keys("bad-key", GROQ_KEY).await;
    let err = adapters
        .places
        .fetch(&PlaceQuery::new("Eiffel Tower", "Paris"))
        .await
        .unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::Unauthorized);
    assert_eq!(err.api, Some(Source::Places));
    assert!(err.message.contains("invalid"));
}

#[tokio::test]
async fn test_city_lookup_denial_names_places_api() {
    let orchestrator = Orchestrator::new(
        adapters_with_keys("bad-key", GROQ_KEY).await,
        CallPolicy::default(),
    );
    // No attractions: only the weather and air quality city lookups reach places
    let request: ItineraryRequest = "City1: Paris 2026-02-16".parse().unwrap();

    let err = orchestrator
        .plan(&request, &CancellationToken::new())
        .await
        .unwrap_err();

    let OrchestrationError::Unauthorized { api, message } = &err else {
        panic!("expected Unauthorized, got {err:?}");
    };
    assert_eq!(*api, Source::Places);
    assert!(message.contains("Places request denied"));
    assert!(PlannerError::from(err).user_message().contains("places API"));
}

#[tokio::test]
async fn test_weather_forecast_for_window() {
    let adapters = adapters().await;
    let window = CityWindow::new("Paris", date(16), date(16)).unwrap();
    let forecasts = adapters.weather.fetch(&window).await.unwrap();

    assert_eq!(forecasts.len(), 1);
    let day = &forecasts[0];
    assert_eq!(day.date, date(16));
    assert_eq!(day.city, "Paris");
    assert_eq!(day.condition, "Light rain");
    assert_eq!(day.precipitation_probability, 60);
    assert!(day.umbrella_needed);
    assert_eq!(day.clothing, "warm jacket and sweater, waterproof jacket");
}

#[tokio::test]
async fn test_weather_multi_day_window() {
    let adapters = adapters().await;
    let window = CityWindow::new("Paris", date(16), date(17)).unwrap();
    let forecasts = adapters.weather.fetch(&window).await.unwrap();

    assert_eq!(forecasts.len(), 2);
    assert!(!forecasts[1].umbrella_needed);
    assert_eq!(forecasts[1].clothing, "t-shirt and light clothing");
}

#[tokio::test]
async fn test_weather_outside_horizon_is_not_found() {
    let adapters = adapters().await;
    let far = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
    let window = CityWindow::new("Paris", far, far).unwrap();
    let err = adapters.weather.fetch(&window).await.unwrap_err();

    assert_eq!(err.kind, SourceErrorKind::NotFound);
    assert!(err.message.contains("Only the next 10 days are available"));
}

#[tokio::test]
async fn test_weather_rate_limit_is_classified() {
    let adapters = adapters_with_keys("limited", GROQ_KEY).await;
    let window = CityWindow::new("Paris", date(16), date(16)).unwrap();
    let err = adapters.weather.fetch(&window).await.unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::RateLimited);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_air_quality_follows_pages_and_keeps_worst_hour() {
    let adapters = adapters().await;
    let Some(tomorrow) = Utc::now().date_naive().succ_opt() else {
        return;
    };
    let window = CityWindow::new("Paris", tomorrow, tomorrow).unwrap();
    let readings = adapters.air_quality.fetch(&window).await.unwrap();

    assert_eq!(readings.len(), 1);
    assert_eq!(readings[0].date, tomorrow);
    assert_eq!(readings[0].aqi, 120);
    assert!(readings[0].mask_required);
    assert_eq!(readings[0].dominant_pollutant.as_deref(), Some("pm25"));
}

#[tokio::test]
async fn test_air_quality_beyond_horizon_is_not_found() {
    let adapters = adapters().await;
    let far = NaiveDate::from_ymd_opt(2099, 1, 1).unwrap();
    let window = CityWindow::new("Paris", far, far).unwrap();
    let err = adapters.air_quality.fetch(&window).await.unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::NotFound);
}

fn draft() -> CityDraft {
    CityDraft {
        stop: CityStop::new("Paris", date(16))
            .with_attraction(AttractionStub::with_window("Eiffel Tower", "8am-9am")),
        attractions: Vec::new(),
        forecasts: Vec::new(),
        air_quality: Vec::new(),
        unavailable: Vec::new(),
    }
}

#[tokio::test]
async fn test_narrator_returns_model_text() {
    let adapters = adapters().await;
    let text = adapters.narrator.fetch(&draft()).await.unwrap();
    assert_eq!(text, "Plan: City: Paris on 2026-02-16");
}

#[tokio::test]
async fn test_narrator_rejected_key_is_unauthorized() {
    let adapters = adapters_with_keys(GOOGLE_KEY, "wrong-key").await;
    let err = adapters.narrator.fetch(&draft()).await.unwrap_err();
    assert_eq!(err.kind, SourceErrorKind::Unauthorized);
}
