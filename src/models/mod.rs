//! Data models for the itinerary planner
//!
//! This module contains the core domain models organized by concern:
//! - Request: the caller's trip (cities, dates, attractions)
//! - Attraction: attraction stubs and their resolved places
//! - Forecast: daily weather with clothing advice
//! - Air quality: daily AQI readings with mask advice
//! - Itinerary: the assembled per-city result and its source status map

pub mod air_quality;
pub mod attraction;
pub mod forecast;
pub mod itinerary;
pub mod request;

// Re-export all public types for convenient access
pub use air_quality::{AirQualityReading, MASK_AQI_THRESHOLD};
pub use attraction::{AttractionRecord, Coordinates, ResolvedPlace};
pub use forecast::{DailyForecast, TemperatureRange};
pub use itinerary::{CityItinerary, Itinerary, SourceStatus};
pub use request::{AttractionStub, CityStop, ItineraryRequest};
