//! The assembled itinerary and its per-source status map

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{AirQualityReading, AttractionRecord, CityStop, DailyForecast};
use crate::error::SourceErrorKind;
use crate::sources::Source;

/// Outcome of one source for one city
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// All calls succeeded, possibly after retries
    Succeeded { retries: u32 },
    /// Some attraction lookups succeeded, some failed
    Partial {
        succeeded: usize,
        failed: usize,
        /// Kind of the first failure
        error: SourceErrorKind,
        retries: u32,
    },
    /// Every call for this source failed
    Failed {
        error: SourceErrorKind,
        message: String,
        retries: u32,
    },
    /// Nothing to look up (a city without attractions)
    Skipped,
}

impl SourceStatus {
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether at least one call produced data
    #[must_use]
    pub fn produced_data(&self) -> bool {
        matches!(self, Self::Succeeded { .. } | Self::Partial { .. })
    }

    #[must_use]
    pub fn retries(&self) -> u32 {
        match self {
            Self::Succeeded { retries }
            | Self::Partial { retries, .. }
            | Self::Failed { retries, .. } => *retries,
            Self::Skipped => 0,
        }
    }

    #[must_use]
    pub fn error_kind(&self) -> Option<SourceErrorKind> {
        match self {
            Self::Partial { error, .. } | Self::Failed { error, .. } => Some(*error),
            Self::Succeeded { .. } | Self::Skipped => None,
        }
    }
}

/// One city of the itinerary with everything we learned about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityItinerary {
    pub stop: CityStop,
    pub attractions: Vec<AttractionRecord>,
    pub forecasts: Vec<DailyForecast>,
    pub air_quality: Vec<AirQualityReading>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    pub status: BTreeMap<Source, SourceStatus>,
}

impl CityItinerary {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.stop.name
    }

    /// Sources that produced nothing for this city
    #[must_use]
    pub fn failed_sources(&self) -> Vec<Source> {
        self.status
            .iter()
            .filter(|(_, status)| status.is_failed())
            .map(|(source, _)| *source)
            .collect()
    }

    /// Whether any source produced data for this city
    #[must_use]
    pub fn has_enrichment(&self) -> bool {
        self.status.values().any(SourceStatus::produced_data)
    }

    /// Days in this city that call for a mask
    #[must_use]
    pub fn masks_needed(&self) -> usize {
        self.air_quality.iter().filter(|r| r.mask_required).count()
    }

    /// Days in this city that call for an umbrella
    #[must_use]
    pub fn umbrella_days(&self) -> usize {
        self.forecasts.iter().filter(|f| f.umbrella_needed).count()
    }

    #[must_use]
    pub fn forecast_for(&self, date: chrono::NaiveDate) -> Option<&DailyForecast> {
        self.forecasts.iter().find(|f| f.date == date)
    }

    #[must_use]
    pub fn air_quality_for(&self, date: chrono::NaiveDate) -> Option<&AirQualityReading> {
        self.air_quality.iter().find(|r| r.date == date)
    }
}

/// The planner's result, cities in request order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub cities: Vec<CityItinerary>,
}

impl Itinerary {
    /// Total mask-days across the trip
    #[must_use]
    pub fn masks_needed(&self) -> usize {
        self.cities.iter().map(CityItinerary::masks_needed).sum()
    }

    #[must_use]
    pub fn umbrella_days(&self) -> usize {
        self.cities.iter().map(CityItinerary::umbrella_days).sum()
    }

    /// Whether any call in the whole trip produced data
    #[must_use]
    pub fn has_enrichment(&self) -> bool {
        self.cities.iter().any(CityItinerary::has_enrichment)
    }

    /// Cities with at least one failed source
    #[must_use]
    pub fn degraded_cities(&self) -> Vec<&str> {
        self.cities
            .iter()
            .filter(|c| !c.failed_sources().is_empty())
            .map(CityItinerary::name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn city(status: Vec<(Source, SourceStatus)>, aqi: &[u32]) -> CityItinerary {
        let date = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
        CityItinerary {
            stop: CityStop::new("Paris", date),
            attractions: Vec::new(),
            forecasts: Vec::new(),
            air_quality: aqi
                .iter()
                .map(|v| AirQualityReading::new(date, "Paris", *v, "x".to_string()))
                .collect(),
            narrative: None,
            status: status.into_iter().collect(),
        }
    }

    #[test]
    fn test_failed_sources() {
        let c = city(
            vec![
                (Source::Places, SourceStatus::Succeeded { retries: 0 }),
                (
                    Source::Weather,
                    SourceStatus::Failed {
                        error: SourceErrorKind::Timeout,
                        message: "slow".into(),
                        retries: 2,
                    },
                ),
            ],
            &[],
        );
        assert_eq!(c.failed_sources(), vec![Source::Weather]);
        assert!(c.has_enrichment());
    }

    #[test]
    fn test_masks_needed_sums_cities() {
        let itinerary = Itinerary {
            cities: vec![city(vec![], &[151, 80]), city(vec![], &[101])],
        };
        assert_eq!(itinerary.masks_needed(), 2);
        assert!(!itinerary.has_enrichment());
    }

    #[test]
    fn test_status_serializes_tagged() {
        let json = serde_json::to_value(SourceStatus::Succeeded { retries: 1 }).unwrap();
        assert_eq!(json["status"], "succeeded");
        assert_eq!(json["retries"], 1);
    }
}
