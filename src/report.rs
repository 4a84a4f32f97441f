//! Plain-text travel plan

use std::fmt::{self, Display};

use crate::models::{CityItinerary, Itinerary};

const HEADING: &str = "=== Here Is the AI assisted TRAVEL PLAN for you ===";

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn write_city(f: &mut fmt::Formatter<'_>, number: usize, city: &CityItinerary) -> fmt::Result {
    let stop = &city.stop;
    if stop.arrival == stop.departure {
        writeln!(f, "CITY {number}: {} - {}", stop.name, stop.arrival)?;
    } else {
        writeln!(
            f,
            "CITY {number}: {} - {} to {}",
            stop.name, stop.arrival, stop.departure
        )?;
    }

    if !city.attractions.is_empty() {
        writeln!(f, "Attractions:")?;
        for (i, attraction) in city.attractions.iter().enumerate() {
            let address = attraction.address().unwrap_or("address unavailable");
            match &attraction.visit_window {
                Some(window) => writeln!(f, "{}. {} - {} ({})", i + 1, attraction.name, address, window)?,
                None => writeln!(f, "{}. {} - {}", i + 1, attraction.name, address)?,
            }
        }
    }

    for date in stop.dates() {
        let forecast = city.forecast_for(date);
        let reading = city.air_quality_for(date);
        if forecast.is_none() && reading.is_none() {
            continue;
        }

        writeln!(f)?;
        if stop.arrival != stop.departure {
            writeln!(f, "{date}:")?;
        }
        if let Some(day) = forecast {
            writeln!(f, "Weather: {}, {}", day.condition, day.format_temperature())?;
            writeln!(f, "Clothing: {}", day.clothing)?;
            writeln!(f, "Umbrella: {}", yes_no(day.umbrella_needed))?;
        }
        if let Some(reading) = reading {
            writeln!(f, "Air Quality: AQI {} - {}", reading.aqi, reading.category)?;
            writeln!(f, "Mask Needed: {}", yes_no(reading.mask_required))?;
        }
    }

    if let Some(narrative) = &city.narrative {
        writeln!(f)?;
        writeln!(f, "{narrative}")?;
    }

    let failed = city.failed_sources();
    if !failed.is_empty() {
        writeln!(f)?;
        for source in failed {
            let reason = city
                .status
                .get(&source)
                .and_then(|s| s.error_kind())
                .map(|kind| kind.to_string())
                .unwrap_or_default();
            writeln!(f, "Unavailable: {source} ({reason})")?;
        }
    }

    Ok(())
}

impl Display for Itinerary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{HEADING}")?;

        for (i, city) in self.cities.iter().enumerate() {
            writeln!(f)?;
            write_city(f, i + 1, city)?;
        }

        writeln!(f)?;
        writeln!(f, "SUMMARY:")?;
        writeln!(f, "Total Masks Needed: {}", self.masks_needed())?;
        write!(f, "Umbrella Days: {}", self.umbrella_days())
    }
}
