//! Trip request model and the plain-text trip format

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PlannerError;

/// An attraction as given by the caller, before any lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttractionStub {
    /// Free-text attraction name (e.g. "Eiffel Tower")
    pub name: String,
    /// Free-text visit window (e.g. "8am-9am")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visit_window: Option<String>,
}

impl AttractionStub {
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            visit_window: None,
        }
    }

    #[must_use]
    pub fn with_window<S: Into<String>, W: Into<String>>(name: S, window: W) -> Self {
        Self {
            name: name.into(),
            visit_window: Some(window.into()),
        }
    }
}

/// One city of the trip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityStop {
    /// City name (e.g. "Paris")
    pub name: String,
    /// First day in the city
    pub arrival: NaiveDate,
    /// Last day in the city (equal to arrival for a day trip)
    pub departure: NaiveDate,
    /// Attractions to visit, in the caller's order
    #[serde(default)]
    pub attractions: Vec<AttractionStub>,
}

impl CityStop {
    /// Create a single-day stop
    #[must_use]
    pub fn new<S: Into<String>>(name: S, date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            arrival: date,
            departure: date,
            attractions: Vec::new(),
        }
    }

    /// Set the departure date
    #[must_use]
    pub fn until(mut self, departure: NaiveDate) -> Self {
        self.departure = departure;
        self
    }

    /// Add an attraction
    #[must_use]
    pub fn with_attraction(mut self, attraction: AttractionStub) -> Self {
        self.attractions.push(attraction);
        self
    }

    /// Every date of the stay, arrival through departure
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.arrival
            .iter_days()
            .take_while(move |date| *date <= self.departure)
    }

    fn validate(&self, position: usize) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err(format!("city #{position} has an empty name"));
        }
        if self.arrival > self.departure {
            return Err(format!(
                "{}: arrival {} is after departure {}",
                self.name, self.arrival, self.departure
            ));
        }
        if let Some(stub) = self.attractions.iter().find(|a| a.name.trim().is_empty()) {
            return Err(format!(
                "{}: attraction with empty name (window {:?})",
                self.name, stub.visit_window
            ));
        }
        Ok(())
    }
}

/// The caller's trip: an ordered list of city stops
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItineraryRequest {
    pub cities: Vec<CityStop>,
}

impl ItineraryRequest {
    #[must_use]
    pub fn new(cities: Vec<CityStop>) -> Self {
        Self { cities }
    }

    /// Check the request before any call is made
    ///
    /// Rejects an empty trip, empty names and stays whose arrival is after
    /// their departure.
    pub fn validate(&self) -> Result<(), String> {
        if self.cities.is_empty() {
            return Err("the trip has no cities".to_string());
        }
        for (index, city) in self.cities.iter().enumerate() {
            city.validate(index + 1)?;
        }
        Ok(())
    }

    /// Parse a request from JSON
    pub fn from_json(text: &str) -> Result<Self, PlannerError> {
        serde_json::from_str(text)
            .map_err(|e| PlannerError::validation(format!("Malformed trip JSON: {e}")))
    }
}

/// Plain-text trip format:
///
/// ```text
/// City1: Paris 2026-02-16
/// Eiffel Tower;8am-9am
/// Louvre Museum;10am-11am
///
/// City2: Brussels 2026-02-18 2026-02-19
/// Grand Place;12pm-1pm
/// ```
///
/// Lines before the first `City` header are treated as preamble and skipped.
impl FromStr for ItineraryRequest {
    type Err = PlannerError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut cities: Vec<CityStop> = Vec::new();

        for (line_no, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = city_header(line) {
                let stop = parse_city_header(header)
                    .map_err(|e| PlannerError::validation(format!("line {}: {e}", line_no + 1)))?;
                cities.push(stop);
                continue;
            }

            let Some(current) = cities.last_mut() else {
                tracing::debug!(line = line_no + 1, "Skipping preamble line");
                continue;
            };

            let stub = match line.split_once(';') {
                Some((name, window)) if !window.trim().is_empty() => {
                    AttractionStub::with_window(name.trim(), window.trim())
                }
                Some((name, _)) => AttractionStub::new(name.trim()),
                None => AttractionStub::new(line),
            };
            current.attractions.push(stub);
        }

        Ok(Self { cities })
    }
}

/// Returns the text after `City<n>:` if the line is a city header
fn city_header(line: &str) -> Option<&str> {
    let (label, rest) = line.split_once(':')?;
    let label = label.trim();
    let prefix = label.get(..4)?;
    if !prefix.eq_ignore_ascii_case("city") {
        return None;
    }
    if !label[4..].trim().chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(rest.trim())
}

fn parse_city_header(header: &str) -> Result<CityStop, String> {
    let mut tokens: Vec<&str> = header.split_whitespace().collect();

    let mut dates = Vec::new();
    while let Some(last) = tokens.last() {
        match NaiveDate::parse_from_str(last, "%Y-%m-%d") {
            Ok(date) if dates.len() < 2 => {
                dates.push(date);
                tokens.pop();
            }
            _ => break,
        }
    }
    dates.reverse();

    if tokens.is_empty() {
        return Err(format!("missing city name in '{header}'"));
    }
    if tokens
        .iter()
        .any(|token| NaiveDate::parse_from_str(token, "%Y-%m-%d").is_ok())
    {
        return Err(format!("at most two dates (arrival, departure) allowed in '{header}'"));
    }
    let name = tokens.join(" ");

    match dates.as_slice() {
        [date] => Ok(CityStop::new(name, *date)),
        [arrival, departure] => Ok(CityStop::new(name, *arrival).until(*departure)),
        _ => Err(format!("missing date (YYYY-MM-DD) for {name}")),
    }
}

/// Day after `date`, saturating at the calendar's end
#[must_use]
pub fn next_day(date: NaiveDate) -> NaiveDate {
    date.checked_add_days(Days::new(1)).unwrap_or(date)
}
