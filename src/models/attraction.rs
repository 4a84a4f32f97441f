//! Attraction records and their resolved places

use serde::{Deserialize, Serialize};

use super::request::AttractionStub;

/// Geographic coordinates in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A place as resolved by the places lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPlace {
    /// Canonical name returned by the lookup
    pub name: String,
    /// Full formatted address
    pub address: String,
    pub coordinates: Coordinates,
}

/// An attraction in the itinerary
///
/// Starts as the caller's stub; `place` is filled at most once from the
/// places lookup and never touched again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttractionRecord {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_window: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<ResolvedPlace>,
}

impl AttractionRecord {
    /// Record with the lookup result attached, if there is one
    #[must_use]
    pub fn resolved(stub: &AttractionStub, place: Option<ResolvedPlace>) -> Self {
        Self {
            name: stub.name.clone(),
            visit_window: stub.visit_window.clone(),
            place,
        }
    }

    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.place.as_ref().map(|p| p.address.as_str())
    }
}

impl From<&AttractionStub> for AttractionRecord {
    fn from(stub: &AttractionStub) -> Self {
        Self::resolved(stub, None)
    }
}
