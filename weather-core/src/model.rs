use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Condition;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Current conditions as reported by the weather provider (metric units).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    /// hPa
    pub pressure: u32,
    /// m/s
    pub wind_speed: f64,
    pub wind_direction_deg: u16,
    pub cloud_cover_pct: u8,
    /// Absent when the station does not report it.
    pub visibility_m: Option<u32>,
    pub weather_main: String,
    pub weather_description: String,
    pub icon_code: String,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
}

/// A single point-in-time weather reading for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySnapshot {
    /// Resolved name, as returned by the provider.
    pub name: String,
    pub country: String,
    pub coordinates: Coordinates,
    pub conditions: CurrentConditions,
    /// Shift from UTC of the city's local time.
    pub timezone_offset_secs: i32,
    pub observed_at: DateTime<Utc>,
}

impl CitySnapshot {
    pub fn local_offset(&self) -> FixedOffset {
        offset_or_utc(self.timezone_offset_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub time: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub weather_main: String,
    pub weather_description: String,
    pub icon_code: String,
    /// Rain plus snow over the 3h window, in mm.
    pub precipitation_mm: f64,
    /// Probability of precipitation, 0.0..=1.0.
    pub precipitation_chance: f64,
}

/// Ordered (by time) forecast for one city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub city: String,
    pub timezone_offset_secs: i32,
    pub points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    pub fn local_offset(&self) -> FixedOffset {
        offset_or_utc(self.timezone_offset_secs)
    }

    /// The first `n` points, i.e. the next `3n` hours.
    pub fn upcoming(&self, n: usize) -> &[ForecastPoint] {
        &self.points[..self.points.len().min(n)]
    }
}

/// Aggregated data for one search. Built fresh on every search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub snapshots: Vec<CitySnapshot>,
    /// Key absent when the forecast could not be fetched.
    pub forecasts: HashMap<String, ForecastSeries>,
    /// One entry per snapshot; `None` when the provider had no data.
    pub aqi: HashMap<String, Option<u32>>,
    /// One entry per snapshot; `None` when the provider had no data.
    pub uv: HashMap<String, Option<f64>>,
}

impl SearchResult {
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshots.iter().any(|s| s.name == name)
    }

    pub fn snapshot(&self, name: &str) -> Option<&CitySnapshot> {
        self.snapshots.iter().find(|s| s.name == name)
    }

    /// Everything known about one city, or `None` if it is not part of this result.
    pub fn city(&self, name: &str) -> Option<CityView<'_>> {
        let snapshot = self.snapshot(name)?;
        Some(CityView {
            snapshot,
            forecast: self.forecasts.get(name),
            aqi: self.aqi.get(name).copied().flatten(),
            uv_index: self.uv.get(name).copied().flatten(),
        })
    }
}

/// Consistent per-city view over a [`SearchResult`].
#[derive(Debug, Clone, Copy)]
pub struct CityView<'a> {
    pub snapshot: &'a CitySnapshot,
    pub forecast: Option<&'a ForecastSeries>,
    pub aqi: Option<u32>,
    pub uv_index: Option<f64>,
}

/// Which step of a city's pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Current,
    Forecast,
}

/// A user-facing notification about one requested city.
#[derive(Debug, Clone, PartialEq)]
pub struct CityFailure {
    /// The name as typed by the user.
    pub city: String,
    pub stage: Stage,
    pub condition: Condition,
}

impl CityFailure {
    pub fn message(&self) -> String {
        match (&self.stage, &self.condition) {
            (Stage::Current, Condition::NotFound(_)) => format!("City \"{}\" not found", self.city),
            (Stage::Forecast, Condition::NotFound(_)) => {
                format!("Forecast for \"{}\" not found", self.city)
            }
            (Stage::Current, Condition::Timeout(_)) => {
                format!("Weather request for {} timed out", self.city)
            }
            (Stage::Forecast, Condition::Timeout(_)) => {
                format!("Forecast request for {} timed out", self.city)
            }
            (Stage::Current, _) => format!("Failed to fetch weather data for {}", self.city),
            (Stage::Forecast, _) => format!("Failed to fetch forecast data for {}", self.city),
        }
    }
}

pub(crate) fn offset_or_utc(secs: i32) -> FixedOffset {
    FixedOffset::east_opt(secs).unwrap_or_else(|| Utc.fix())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn snapshot(name: &str, lat: f64, lon: f64) -> CitySnapshot {
        CitySnapshot {
            name: name.to_string(),
            country: "GB".to_string(),
            coordinates: Coordinates { lat, lon },
            conditions: CurrentConditions {
                temperature: 14.2,
                feels_like: 13.1,
                humidity: 72,
                pressure: 1012,
                wind_speed: 4.6,
                wind_direction_deg: 230,
                cloud_cover_pct: 75,
                visibility_m: Some(10_000),
                weather_main: "Clouds".to_string(),
                weather_description: "broken clouds".to_string(),
                icon_code: "04d".to_string(),
                sunrise: Utc.with_ymd_and_hms(2026, 10, 19, 6, 25, 0).unwrap(),
                sunset: Utc.with_ymd_and_hms(2026, 10, 19, 16, 58, 0).unwrap(),
            },
            timezone_offset_secs: 3600,
            observed_at: Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap(),
        }
    }

    pub fn forecast(name: &str, rain: &[f64]) -> ForecastSeries {
        let start = Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        ForecastSeries {
            city: name.to_string(),
            timezone_offset_secs: 3600,
            points: rain
                .iter()
                .enumerate()
                .map(|(i, mm)| ForecastPoint {
                    time: start + chrono::Duration::hours(3 * i as i64),
                    temperature: 12.0 + i as f64,
                    feels_like: 11.0 + i as f64,
                    humidity: 80,
                    weather_main: "Rain".to_string(),
                    weather_description: "light rain".to_string(),
                    icon_code: "10d".to_string(),
                    precipitation_mm: *mm,
                    precipitation_chance: 0.6,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn city_view_collects_all_maps() {
        let mut result = SearchResult::default();
        result.snapshots.push(snapshot("London", 51.5, -0.12));
        result.forecasts.insert("London".into(), forecast("London", &[0.0, 1.2]));
        result.aqi.insert("London".into(), Some(42));
        result.uv.insert("London".into(), None);

        let view = result.city("London").expect("London is in the result");
        assert_eq!(view.snapshot.name, "London");
        assert_eq!(view.forecast.map(|f| f.points.len()), Some(2));
        assert_eq!(view.aqi, Some(42));
        assert_eq!(view.uv_index, None);
        assert!(result.city("Paris").is_none());
    }

    #[test]
    fn upcoming_is_bounded_by_series_length() {
        let series = forecast("London", &[0.0, 0.5, 1.0]);
        assert_eq!(series.upcoming(8).len(), 3);
        assert_eq!(series.upcoming(2).len(), 2);
    }

    #[test]
    fn failure_messages_name_the_typed_city() {
        let f = CityFailure {
            city: "Atlantis".into(),
            stage: Stage::Current,
            condition: Condition::NotFound("404".into()),
        };
        assert_eq!(f.message(), "City \"Atlantis\" not found");

        let f = CityFailure {
            city: "Paris".into(),
            stage: Stage::Forecast,
            condition: Condition::Transient("502".into()),
        };
        assert_eq!(f.message(), "Failed to fetch forecast data for Paris");
    }
}
