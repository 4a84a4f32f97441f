//! Google Places Text Search adapter
//!
//! Resolves an attraction name within a city to its canonical name,
//! formatted address and coordinates. The same lookup resolves a bare city
//! name to coordinates for the weather and air quality adapters.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{GoogleCredentials, Source, SourceAdapter, send_json};
use crate::error::SourceError;
use crate::models::{Coordinates, ResolvedPlace};

/// An attraction to look up within its city
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceQuery {
    pub attraction: String,
    pub city: String,
}

impl PlaceQuery {
    pub fn new<A: Into<String>, C: Into<String>>(attraction: A, city: C) -> Self {
        Self {
            attraction: attraction.into(),
            city: city.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlacesAdapter {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    #[serde(default)]
    results: Vec<PlaceResult>,
    status: String,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    name: String,
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl PlacesAdapter {
    #[must_use]
    pub fn new(client: Client, credentials: &GoogleCredentials) -> Self {
        Self {
            client,
            api_key: credentials.api_key.clone(),
            base_url: credentials.places_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Best match for a free-text query
    ///
    /// Errors carry [`Source::Places`], including lookups made for other adapters.
    #[instrument(name = "places_text_search", level = "debug", skip(self))]
    pub async fn text_search(&self, query: &str) -> Result<ResolvedPlace, SourceError> {
        self.search(query)
            .await
            .map_err(|err| err.raised_by(Source::Places))
    }

    async fn search(&self, query: &str) -> Result<ResolvedPlace, SourceError> {
        let url = format!("{}/textsearch/json", self.base_url);
        let request = self
            .client
            .get(url)
            .query(&[("query", query), ("key", self.api_key.as_str())]);

        let response: TextSearchResponse = send_json("places", request).await?;
        let place = first_result(query, response)?;
        debug!(name = %place.name, address = %place.address, "Resolved place");
        Ok(place)
    }

    /// Coordinates of a city's best match
    pub async fn locate_city(&self, city: &str) -> Result<Coordinates, SourceError> {
        self.text_search(city).await.map(|place| place.coordinates)
    }
}

fn first_result(query: &str, response: TextSearchResponse) -> Result<ResolvedPlace, SourceError> {
    let detail = response.error_message.unwrap_or_default();
    match response.status.as_str() {
        "OK" => {}
        "ZERO_RESULTS" | "NOT_FOUND" => {
            return Err(SourceError::not_found(format!("No results found for '{query}'")));
        }
        "OVER_QUERY_LIMIT" => {
            return Err(SourceError::rate_limited(format!("Places quota exceeded: {detail}")));
        }
        "REQUEST_DENIED" => {
            return Err(SourceError::unauthorized(format!("Places request denied: {detail}")));
        }
        other => {
            return Err(SourceError::unavailable(format!("Places status {other}: {detail}")));
        }
    }

    response
        .results
        .into_iter()
        .next()
        .map(|result| ResolvedPlace {
            name: result.name,
            address: result.formatted_address,
            coordinates: Coordinates::new(result.geometry.location.lat, result.geometry.location.lng),
        })
        .ok_or_else(|| SourceError::not_found(format!("No results found for '{query}'")))
}

#[async_trait]
impl SourceAdapter for PlacesAdapter {
    type Query = PlaceQuery;
    type Output = ResolvedPlace;

    async fn fetch(&self, query: &PlaceQuery) -> Result<ResolvedPlace, SourceError> {
        if query.city.trim().is_empty() {
            return Err(SourceError::invalid_query("city name must not be empty"));
        }
        if query.attraction.trim().is_empty() {
            return Err(SourceError::invalid_query("attraction name must not be empty"));
        }
        self.text_search(&format!("{}, {}", query.attraction, query.city))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceErrorKind;

    fn parse(json: &str) -> TextSearchResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_first_result() {
        let response = parse(
            r#"{"status":"OK","results":[
                {"name":"Eiffel Tower","formatted_address":"Av. Gustave Eiffel, 75007 Paris, France",
                 "geometry":{"location":{"lat":48.8584,"lng":2.2945}}},
                {"name":"Other","formatted_address":"Elsewhere","geometry":{"location":{"lat":0.0,"lng":0.0}}}]}"#,
        );
        let place = first_result("Eiffel Tower, Paris", response).unwrap();
        assert_eq!(place.name, "Eiffel Tower");
        assert!(place.address.ends_with("France"));
        assert_eq!(place.coordinates, Coordinates::new(48.8584, 2.2945));
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (r#"{"status":"ZERO_RESULTS","results":[]}"#, SourceErrorKind::NotFound),
            (r#"{"status":"OVER_QUERY_LIMIT"}"#, SourceErrorKind::RateLimited),
            (
                r#"{"status":"REQUEST_DENIED","error_message":"The provided API key is invalid."}"#,
                SourceErrorKind::Unauthorized,
            ),
            (r#"{"status":"UNKNOWN_ERROR"}"#, SourceErrorKind::UpstreamUnavailable),
            (r#"{"status":"OK","results":[]}"#, SourceErrorKind::NotFound),
        ];
        for (json, expected) in cases {
            assert_eq!(first_result("q", parse(json)).unwrap_err().kind, expected, "{json}");
        }
    }
}
