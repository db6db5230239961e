//! Multi-city search: weather first, then forecast, air quality and UV.
//!
//! A city whose current-weather call fails is skipped entirely. Forecast
//! failures are reported but do not stop AQI/UV, which only need the
//! coordinates from the weather call. AQI and UV failures collapse into
//! absence and are only logged.

use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::{
    error::Condition,
    model::{CityFailure, CitySnapshot, ForecastSeries, SearchResult, Stage},
    provider::{AirQualitySource, UvSource, WeatherSource},
};

/// Splits a comma-separated list of city names.
///
/// Entries are trimmed, empty entries dropped, and repeats (ignoring case)
/// keep only their first occurrence.
pub fn parse_city_list(input: &str) -> Vec<String> {
    let mut cities: Vec<String> = Vec::new();
    for name in input.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !cities.iter().any(|c| c.to_lowercase() == name.to_lowercase()) {
            cities.push(name.to_string());
        }
    }
    cities
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// One call at a time, in input order.
    #[default]
    Sequential,
    /// Cities in parallel, and forecast/AQI/UV in parallel within a city.
    Concurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    /// Nothing to search for; no calls were issued.
    EmptyInput,
    /// Every requested city failed.
    NoResults,
    /// At least one city resolved.
    Success,
}

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Parsed input names, in order.
    pub requested: Vec<String>,
    pub result: SearchResult,
    /// Notifications for the user, in input order.
    pub failures: Vec<CityFailure>,
}

impl SearchOutcome {
    pub fn status(&self) -> SearchStatus {
        if self.requested.is_empty() {
            SearchStatus::EmptyInput
        } else if self.result.is_empty() {
            SearchStatus::NoResults
        } else {
            SearchStatus::Success
        }
    }

    /// The city shown first after a successful search.
    pub fn selected(&self) -> Option<&str> {
        self.result.snapshots.first().map(|s| s.name.as_str())
    }

    /// Resolved names that equal one of the requested names, ignoring case,
    /// in input order.
    pub fn matched_names(&self) -> Vec<String> {
        self.requested
            .iter()
            .filter_map(|input| {
                self.result
                    .snapshots
                    .iter()
                    .find(|s| s.name.to_lowercase() == input.to_lowercase())
                    .map(|s| s.name.clone())
            })
            .collect()
    }
}

/// Everything one city's pipeline produced.
struct CityReport {
    input: String,
    snapshot: Option<CitySnapshot>,
    forecast: Option<ForecastSeries>,
    aqi: Option<u32>,
    uv: Option<f64>,
    failures: Vec<CityFailure>,
}

impl CityReport {
    fn failed(input: &str, condition: Condition) -> Self {
        Self {
            input: input.to_string(),
            snapshot: None,
            forecast: None,
            aqi: None,
            uv: None,
            failures: vec![CityFailure {
                city: input.to_string(),
                stage: Stage::Current,
                condition,
            }],
        }
    }
}

/// Runs searches against one set of providers.
#[derive(Debug)]
pub struct Aggregator {
    weather: Box<dyn WeatherSource>,
    air_quality: Option<Box<dyn AirQualitySource>>,
    uv_source: Box<dyn UvSource>,
    mode: SearchMode,
}

impl Aggregator {
    pub fn new(
        weather: Box<dyn WeatherSource>,
        air_quality: Option<Box<dyn AirQualitySource>>,
        uv: Box<dyn UvSource>,
    ) -> Self {
        Self {
            weather,
            air_quality,
            uv_source: uv,
            mode: SearchMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Searches every city in the comma-separated `input`.
    ///
    /// Names repeated with different casing are searched once, so a city
    /// never costs duplicate provider calls.
    pub async fn search(&self, input: &str) -> SearchOutcome {
        let requested = parse_city_list(input);
        if requested.is_empty() {
            debug!("empty search input");
            return SearchOutcome {
                requested,
                result: SearchResult::default(),
                failures: Vec::new(),
            };
        }

        let reports = match self.mode {
            SearchMode::Sequential => {
                let mut reports = Vec::with_capacity(requested.len());
                for city in &requested {
                    reports.push(self.city_sequential(city).await);
                }
                reports
            }
            SearchMode::Concurrent => {
                join_all(requested.iter().map(|city| self.city_concurrent(city))).await
            }
        };

        let outcome = merge(requested, reports);
        info!(
            requested = outcome.requested.len(),
            resolved = outcome.result.snapshots.len(),
            failed = outcome.failures.len(),
            "search finished"
        );
        outcome
    }

    async fn city_sequential(&self, city: &str) -> CityReport {
        let snapshot = match self.weather.fetch_current(city).await {
            Ok(s) => s,
            Err(condition) => return skip(city, condition),
        };

        let forecast = self.weather.fetch_forecast(city).await;
        let aqi = self.enrich_aqi(&snapshot).await;
        let uv = self.enrich_uv(&snapshot).await;

        report(city, snapshot, forecast, aqi, uv)
    }

    async fn city_concurrent(&self, city: &str) -> CityReport {
        let snapshot = match self.weather.fetch_current(city).await {
            Ok(s) => s,
            Err(condition) => return skip(city, condition),
        };

        let (forecast, aqi, uv) = tokio::join!(
            self.weather.fetch_forecast(city),
            self.enrich_aqi(&snapshot),
            self.enrich_uv(&snapshot),
        );

        report(city, snapshot, forecast, aqi, uv)
    }

    async fn enrich_aqi(&self, snapshot: &CitySnapshot) -> Option<u32> {
        let source = self.air_quality.as_ref()?;
        match source.fetch_aqi(snapshot.coordinates).await {
            Ok(aqi) => Some(aqi),
            Err(condition) => {
                warn!(city = %snapshot.name, %condition, "air quality unavailable");
                None
            }
        }
    }

    async fn enrich_uv(&self, snapshot: &CitySnapshot) -> Option<f64> {
        match self.uv_source.fetch_uv_index(snapshot.coordinates).await {
            Ok(uv) => Some(uv),
            Err(condition) => {
                warn!(city = %snapshot.name, %condition, "UV index unavailable");
                None
            }
        }
    }
}

fn skip(city: &str, condition: Condition) -> CityReport {
    warn!(city, %condition, "skipping city");
    CityReport::failed(city, condition)
}

fn report(
    city: &str,
    snapshot: CitySnapshot,
    forecast: Result<ForecastSeries, Condition>,
    aqi: Option<u32>,
    uv: Option<f64>,
) -> CityReport {
    let mut failures = Vec::new();
    let forecast = match forecast {
        Ok(f) => Some(f),
        Err(condition) => {
            warn!(city, %condition, "forecast unavailable");
            failures.push(CityFailure {
                city: city.to_string(),
                stage: Stage::Forecast,
                condition,
            });
            None
        }
    };

    CityReport {
        input: city.to_string(),
        snapshot: Some(snapshot),
        forecast,
        aqi,
        uv,
        failures,
    }
}

/// Folds per-city reports, in input order, into one result keyed by resolved name.
fn merge(requested: Vec<String>, reports: Vec<CityReport>) -> SearchOutcome {
    let mut result = SearchResult::default();
    let mut failures = Vec::new();

    for report in reports {
        failures.extend(report.failures);

        let Some(snapshot) = report.snapshot else {
            continue;
        };
        let name = snapshot.name.clone();
        if result.contains(&name) {
            debug!(input = %report.input, resolved = %name, "city already in result");
            continue;
        }

        if let Some(forecast) = report.forecast {
            result.forecasts.insert(name.clone(), forecast);
        }
        result.aqi.insert(name.clone(), report.aqi);
        result.uv.insert(name, report.uv);
        result.snapshots.push(snapshot);
    }

    SearchOutcome {
        requested,
        result,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_city_list_trims_and_drops_empties() {
        assert_eq!(
            parse_city_list(" London , ,Paris,, Tokyo "),
            vec!["London", "Paris", "Tokyo"]
        );
        assert!(parse_city_list("").is_empty());
        assert!(parse_city_list(" , ,").is_empty());
    }

    #[test]
    fn parse_city_list_drops_case_insensitive_repeats() {
        assert_eq!(
            parse_city_list("London, london, LONDON, Paris"),
            vec!["London", "Paris"]
        );
    }

    #[test]
    fn status_distinguishes_empty_input_from_no_results() {
        let empty = SearchOutcome {
            requested: vec![],
            result: SearchResult::default(),
            failures: vec![],
        };
        assert_eq!(empty.status(), SearchStatus::EmptyInput);

        let none = SearchOutcome {
            requested: vec!["Atlantis".into()],
            result: SearchResult::default(),
            failures: vec![],
        };
        assert_eq!(none.status(), SearchStatus::NoResults);
        assert_eq!(none.selected(), None);
    }
}
