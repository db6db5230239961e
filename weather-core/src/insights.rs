//! Local calculations derived from current conditions; no provider calls.

use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{ForecastPoint, ForecastSeries};

const COMPASS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// Nearest 8-point compass direction for a bearing in degrees.
pub fn wind_direction(degrees: f64) -> &'static str {
    let idx = (degrees.rem_euclid(360.0) / 45.0).round() as usize % COMPASS.len();
    COMPASS[idx]
}

pub fn weather_emoji(weather_main: &str) -> &'static str {
    match weather_main {
        "Clear" => "☀️",
        "Clouds" => "⛅",
        "Rain" => "🌧️",
        "Thunderstorm" => "⛈️",
        "Snow" => "❄️",
        "Mist" | "Haze" => "🌫️",
        "Fog" => "🌁",
        "Tornado" | "Sand" => "🌪️",
        "Drizzle" => "🌦️",
        "Dust" => "💨",
        "Ash" => "🌋",
        "Squall" => "🌬️",
        _ => "⚠️",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TemperatureBand {
    Cold,
    Cool,
    Warm,
    Hot,
}

pub fn temperature_band(celsius: f64) -> TemperatureBand {
    if celsius <= 0.0 {
        TemperatureBand::Cold
    } else if celsius <= 15.0 {
        TemperatureBand::Cool
    } else if celsius <= 25.0 {
        TemperatureBand::Warm
    } else {
        TemperatureBand::Hot
    }
}

pub fn is_daytime(t: DateTime<Utc>, sunrise: DateTime<Utc>, sunset: DateTime<Utc>) -> bool {
    t > sunrise && t < sunset
}

/// Groups consecutive forecast points by calendar day in the city's local time.
pub fn group_by_day(
    points: &[ForecastPoint],
    offset: FixedOffset,
) -> Vec<(NaiveDate, Vec<&ForecastPoint>)> {
    let mut days: Vec<(NaiveDate, Vec<&ForecastPoint>)> = Vec::new();
    for point in points {
        let day = point.time.with_timezone(&offset).date_naive();
        match days.last_mut() {
            Some((d, bucket)) if *d == day => bucket.push(point),
            _ => days.push((day, vec![point])),
        }
    }
    days
}

/// Days covered by the provider's forecast.
pub const FORECAST_DAYS: usize = 5;

/// One local calendar day of a forecast.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub min_temp: f64,
    pub max_temp: f64,
    /// Most frequent condition; ties go to the earliest.
    pub weather_main: String,
    pub precipitation_mm: f64,
}

/// Per-day summary of `series`, at most [`FORECAST_DAYS`] days.
pub fn summarize_days(series: &ForecastSeries) -> Vec<DaySummary> {
    group_by_day(&series.points, series.local_offset())
        .into_iter()
        .take(FORECAST_DAYS)
        .map(|(date, points)| {
            let mut counts: Vec<(&str, usize)> = Vec::new();
            for p in &points {
                match counts.iter_mut().find(|(main, _)| *main == p.weather_main) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((p.weather_main.as_str(), 1)),
                }
            }
            let weather_main = counts
                .iter()
                .fold(None::<(&str, usize)>, |best, &(main, n)| match best {
                    Some((_, m)) if m >= n => best,
                    _ => Some((main, n)),
                })
                .map(|(main, _)| main.to_string())
                .unwrap_or_default();

            DaySummary {
                date,
                min_temp: points.iter().map(|p| p.temperature).fold(f64::INFINITY, f64::min),
                max_temp: points
                    .iter()
                    .map(|p| p.temperature)
                    .fold(f64::NEG_INFINITY, f64::max),
                weather_main,
                precipitation_mm: points.iter().map(|p| p.precipitation_mm).sum(),
            }
        })
        .collect()
}

const CLEAR_TIPS: [&str; 3] = [
    "Perfect day for outdoor activities! Don't forget sun protection.",
    "Stay hydrated today - it's sunny out there!",
    "Great day for a walk or outdoor exercise.",
];
const HOT_TIPS: [&str; 3] = [
    "It's very hot - stay hydrated and seek shade when possible.",
    "Consider rescheduling strenuous activities to cooler hours.",
    "Lightweight, loose-fitting clothing will help you stay cool.",
];
const COLD_TIPS: [&str; 3] = [
    "It's quite cold - dress in layers and cover extremities.",
    "Warm drinks can help maintain body temperature.",
    "Keep moving to generate body heat in these cold conditions.",
];

fn condition_tips(weather_main: &str) -> Option<&'static [&'static str; 3]> {
    let tips = match weather_main.to_lowercase().as_str() {
        "clear" => &CLEAR_TIPS,
        "clouds" => &[
            "Diffused light today - perfect for photography!",
            "A light jacket might be comfortable today.",
            "Good day for a run with less direct sun.",
        ],
        "rain" => &[
            "Don't forget your umbrella today! ☔",
            "Waterproof shoes might be a good idea.",
            "Perfect day to catch up on indoor activities.",
        ],
        "drizzle" => &[
            "Light rain today - a water-resistant jacket should be enough.",
            "Be careful on wet roads if you're driving.",
            "A hat with a brim will keep drizzle off your face.",
        ],
        "thunderstorm" => &[
            "Stay safe - avoid open spaces during thunderstorms!",
            "Good day to stay indoors and listen to the rain.",
            "Charge your devices in case of power outages.",
        ],
        "snow" => &[
            "Bundle up - it's snowy outside! ❄️",
            "Allow extra time for travel today.",
            "Waterproof boots will keep your feet dry today.",
        ],
        "mist" => &[
            "Drive carefully - visibility might be reduced.",
            "Fog lights are helpful in these conditions.",
            "A bright outer layer helps others see you.",
        ],
        "fog" => &[
            "Take care in reduced visibility conditions.",
            "Consider delaying travel if fog is dense.",
            "Keep distances between vehicles if driving.",
        ],
        _ => return None,
    };
    Some(tips)
}

/// Canned tip for the current condition. Conditions without their own tips
/// fall back to heat (above 30°C), cold (below 5°C), then clear-sky tips.
/// `seed` picks among the candidates.
pub fn daily_tip(weather_main: &str, temp_c: f64, seed: usize) -> &'static str {
    let tips = condition_tips(weather_main).unwrap_or(if temp_c > 30.0 {
        &HOT_TIPS
    } else if temp_c < 5.0 {
        &COLD_TIPS
    } else {
        &CLEAR_TIPS
    });
    tips[seed % tips.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ActivityLevel {
    Sedentary,
    #[default]
    Moderate,
    High,
}

impl ActivityLevel {
    fn factor(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.0,
            ActivityLevel::Moderate => 1.2,
            ActivityLevel::High => 1.5,
        }
    }
}

impl FromStr for ActivityLevel {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "sedentary" => Ok(ActivityLevel::Sedentary),
            "moderate" => Ok(ActivityLevel::Moderate),
            "high" => Ok(ActivityLevel::High),
            _ => Err(anyhow::anyhow!(
                "Unknown activity level '{value}'. Supported levels: sedentary, moderate, high."
            )),
        }
    }
}

/// Recommended daily water intake in litres.
pub fn hydration_liters(weight_kg: f64, activity: ActivityLevel, temp_c: f64) -> f64 {
    let base = weight_kg * 0.033;
    let temp_factor = temp_c / 30.0;
    base * (1.0 + temp_factor) * activity.factor()
}

struct PollenSeason {
    name: &'static str,
    months: &'static [u32],
    temp: (f64, f64),
    humidity: (u8, u8),
}

const POLLEN_SEASONS: [PollenSeason; 4] = [
    PollenSeason {
        name: "Tree Pollen",
        months: &[3, 4, 5],
        temp: (5.0, 25.0),
        humidity: (0, 80),
    },
    PollenSeason {
        name: "Grass Pollen",
        months: &[5, 6, 7, 8],
        temp: (10.0, 35.0),
        humidity: (0, 70),
    },
    PollenSeason {
        name: "Weed Pollen",
        months: &[8, 9, 10],
        temp: (15.0, 40.0),
        humidity: (0, 60),
    },
    PollenSeason {
        name: "Mold Spores",
        months: &[6, 7, 8, 9],
        temp: (20.0, 50.0),
        humidity: (70, 100),
    },
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollenRisk {
    /// 0.0..=5.0
    pub level: f64,
    pub recommendation: &'static str,
    pub predominant: Vec<&'static str>,
}

/// Rough pollen estimate: drier and windier means more pollen in the air.
pub fn pollen_risk(humidity: u8, wind_speed: f64, temp_c: f64, month: u32) -> PollenRisk {
    let level = ((100.0 - f64::from(humidity)) / 15.0 + wind_speed / 2.0).clamp(0.0, 5.0);

    let recommendation = if level < 1.0 {
        "Safe for outdoor activities"
    } else if level < 2.0 {
        "Low risk, stay alert"
    } else if level < 3.0 {
        "Consider mask if sensitive"
    } else if level < 4.0 {
        "Avoid dense vegetation areas"
    } else if level < 5.0 {
        "High risk, limit outdoor activities"
    } else {
        "Danger! Allergy sufferers should stay indoors"
    };

    let predominant = POLLEN_SEASONS
        .iter()
        .filter(|s| {
            s.months.contains(&month)
                && (s.temp.0..=s.temp.1).contains(&temp_c)
                && (s.humidity.0..=s.humidity.1).contains(&humidity)
        })
        .map(|s| s.name)
        .collect();

    PollenRisk {
        level,
        recommendation,
        predominant,
    }
}
