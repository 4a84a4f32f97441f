//! Merge per-city outcomes into the final itinerary
//!
//! Pure and synchronous: the orchestrator hands over one outcome per city in
//! whatever order the cities finished, and the assembler restores request
//! order. A mismatch between outcomes and request is an internal bug.

use std::collections::BTreeMap;
use tracing::error;

use crate::error::OrchestrationError;
use crate::models::{
    AirQualityReading, AttractionRecord, CityItinerary, DailyForecast, Itinerary, ItineraryRequest,
    SourceStatus,
};
use crate::sources::Source;

/// Everything the orchestrator gathered for one city
#[derive(Debug, Clone, PartialEq)]
pub struct CityOutcome {
    /// Position of the city in the request
    pub index: usize,
    pub city: String,
    pub attractions: Vec<AttractionRecord>,
    pub forecasts: Vec<DailyForecast>,
    pub air_quality: Vec<AirQualityReading>,
    pub narrative: Option<String>,
    pub status: BTreeMap<Source, SourceStatus>,
}

fn violation(message: String) -> OrchestrationError {
    error!(%message, "Itinerary assembly invariant violated");
    OrchestrationError::AssemblyInvariantViolation(message)
}

/// Build the itinerary, cities in request order
pub fn assemble(
    request: &ItineraryRequest,
    outcomes: Vec<CityOutcome>,
) -> Result<Itinerary, OrchestrationError> {
    if outcomes.len() != request.cities.len() {
        return Err(violation(format!(
            "{} outcomes for {} requested cities",
            outcomes.len(),
            request.cities.len()
        )));
    }

    let mut slots: Vec<Option<CityOutcome>> = vec![None; request.cities.len()];
    for outcome in outcomes {
        let index = outcome.index;
        let Some(slot) = slots.get_mut(index) else {
            return Err(violation(format!("outcome index {index} is out of range")));
        };
        if slot.is_some() {
            return Err(violation(format!("duplicate outcome for city #{index}")));
        }
        *slot = Some(outcome);
    }

    let mut cities = Vec::with_capacity(slots.len());
    for (stop, slot) in request.cities.iter().zip(slots) {
        let Some(outcome) = slot else {
            return Err(violation(format!("no outcome for {}", stop.name)));
        };
        if outcome.city != stop.name {
            return Err(violation(format!(
                "outcome for '{}' landed in the slot of '{}'",
                outcome.city, stop.name
            )));
        }
        cities.push(CityItinerary {
            stop: stop.clone(),
            attractions: outcome.attractions,
            forecasts: outcome.forecasts,
            air_quality: outcome.air_quality,
            narrative: outcome.narrative,
            status: outcome.status,
        });
    }

    Ok(Itinerary { cities })
}
