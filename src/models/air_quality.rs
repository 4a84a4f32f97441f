//! Daily air quality readings and the mask rule

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// AQI strictly above this value requires a mask
pub const MASK_AQI_THRESHOLD: u32 = 100;

#[must_use]
pub fn mask_required(aqi: u32) -> bool {
    aqi > MASK_AQI_THRESHOLD
}

/// Worst air quality of one day in one city
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub date: NaiveDate,
    /// City this reading belongs to (lookup key only)
    pub city: String,
    pub aqi: u32,
    /// Category text from the provider (e.g. "Moderate air quality")
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_pollutant: Option<String>,
    pub mask_required: bool,
}

impl AirQualityReading {
    #[must_use]
    pub fn new(date: NaiveDate, city: &str, aqi: u32, category: String) -> Self {
        Self {
            date,
            city: city.to_string(),
            aqi,
            category,
            dominant_pollutant: None,
            mask_required: mask_required(aqi),
        }
    }

    #[must_use]
    pub fn with_pollutant(mut self, pollutant: Option<String>) -> Self {
        self.dominant_pollutant = pollutant;
        self
    }
}
