//! Daily weather forecast and the clothing rule table

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Precipitation probability (%) above which an umbrella is advised
pub const UMBRELLA_PRECIPITATION_PERCENT: u8 = 30;
/// Precipitation probability (%) above which a waterproof jacket is advised
pub const RAINWEAR_PRECIPITATION_PERCENT: u8 = 50;

/// Temperature range for a day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min: f32,
    pub max: f32,
}

impl TemperatureRange {
    #[must_use]
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn average(&self) -> f32 {
        (self.min + self.max) / 2.0
    }
}

/// Weather for one day in one city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    /// City this forecast belongs to (lookup key only)
    pub city: String,
    /// Temperature range in Celsius
    pub temperature: TemperatureRange,
    /// Feels-like range in Celsius
    pub feels_like: TemperatureRange,
    /// Daytime condition (e.g. "Light rain")
    pub condition: String,
    /// Daytime precipitation probability (0-100%)
    pub precipitation_probability: u8,
    /// Daytime wind speed in km/h
    pub wind_kph: f32,
    pub umbrella_needed: bool,
    pub clothing: String,
}

impl DailyForecast {
    /// Build a forecast, deriving umbrella and clothing advice
    #[must_use]
    pub fn new(
        date: NaiveDate,
        city: &str,
        temperature: TemperatureRange,
        feels_like: TemperatureRange,
        condition: String,
        precipitation_probability: u8,
        wind_kph: f32,
    ) -> Self {
        Self {
            date,
            city: city.to_string(),
            temperature,
            feels_like,
            condition,
            precipitation_probability,
            wind_kph,
            umbrella_needed: umbrella_needed(precipitation_probability),
            clothing: clothing_recommendation(temperature, precipitation_probability),
        }
    }

    /// Format temperature range with unit
    #[must_use]
    pub fn format_temperature(&self) -> String {
        format!("{:.0}-{:.0}°C", self.temperature.min, self.temperature.max)
    }
}

#[must_use]
pub fn umbrella_needed(precipitation_probability: u8) -> bool {
    precipitation_probability > UMBRELLA_PRECIPITATION_PERCENT
}

/// Clothing advice from the day's average temperature and rain chance
#[must_use]
pub fn clothing_recommendation(temperature: TemperatureRange, precipitation_probability: u8) -> String {
    let average = temperature.average();
    let base = if average < 0.0 {
        "heavy winter coat, thermal layers, gloves, hat"
    } else if average < 10.0 {
        "warm jacket and sweater"
    } else if average < 20.0 {
        "light jacket or cardigan"
    } else {
        "t-shirt and light clothing"
    };

    if precipitation_probability > RAINWEAR_PRECIPITATION_PERCENT {
        format!("{base}, waterproof jacket")
    } else if umbrella_needed(precipitation_probability) {
        format!("{base}, carry an umbrella")
    } else {
        base.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(-8.0, -2.0, 0, "heavy winter coat, thermal layers, gloves, hat")]
    #[case(-1.0, 1.0, 0, "warm jacket and sweater")]
    #[case(4.0, 12.0, 10, "warm jacket and sweater")]
    #[case(8.0, 12.0, 30, "light jacket or cardigan")]
    #[case(8.0, 12.0, 31, "light jacket or cardigan, carry an umbrella")]
    #[case(8.0, 12.0, 50, "light jacket or cardigan, carry an umbrella")]
    #[case(8.0, 12.0, 51, "light jacket or cardigan, waterproof jacket")]
    #[case(18.0, 26.0, 80, "t-shirt and light clothing, waterproof jacket")]
    fn test_clothing_rule_table(
        #[case] min: f32,
        #[case] max: f32,
        #[case] precipitation: u8,
        #[case] expected: &str,
    ) {
        let advice = clothing_recommendation(TemperatureRange::new(min, max), precipitation);
        assert_eq!(advice, expected);
    }

    #[rstest]
    #[case(0, false)]
    #[case(30, false)]
    #[case(31, true)]
    #[case(100, true)]
    fn test_umbrella_threshold(#[case] precipitation: u8, #[case] expected: bool) {
        assert_eq!(umbrella_needed(precipitation), expected);
    }

    #[test]
    fn test_forecast_derives_advice() {
        let forecast = DailyForecast::new(
            NaiveDate::from_ymd_opt(2026, 2, 16).unwrap(),
            "Paris",
            TemperatureRange::new(3.0, 9.0),
            TemperatureRange::new(0.0, 7.0),
            "Light rain".to_string(),
            65,
            18.0,
        );
        assert!(forecast.umbrella_needed);
        assert_eq!(forecast.clothing, "warm jacket and sweater, waterproof jacket");
        assert_eq!(forecast.format_temperature(), "3-9°C");
    }
}
