//! `Itinerai` - AI assisted multi-city travel planning
//!
//! This library turns a trip request (cities, dates, attractions) into a
//! per-city itinerary by querying place lookup, weather, air quality and a
//! chat model concurrently, tolerating partial failure of any of them.

pub mod assembler;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod report;
pub mod sources;

// Re-export core types for public API
pub use assembler::{CityOutcome, assemble};
pub use config::PlannerConfig;
pub use error::{OrchestrationError, PlannerError, SourceError, SourceErrorKind};
pub use models::{
    AirQualityReading, AttractionRecord, AttractionStub, CityItinerary, CityStop, DailyForecast,
    Itinerary, ItineraryRequest, SourceStatus,
};
pub use orchestrator::{CallPolicy, Orchestrator};
pub use sources::{Adapters, CityWindow, Source, SourceAdapter};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, PlannerError>;
