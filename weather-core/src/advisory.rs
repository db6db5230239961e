//! Natural-language advice generated from a city's conditions.
//!
//! Advice is cosmetic: [`Advisor::generate`] never fails and falls back to
//! [`FALLBACK_TEXT`] whenever the text provider does.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::{
    model::{CitySnapshot, CityView, ForecastSeries},
    provider::TextGenerator,
};

pub const FALLBACK_TEXT: &str = "Unable to generate recommendation at this time.";

const UNAVAILABLE: &str = "unavailable";

/// Forecast points covering the next 24 hours (3h resolution).
const NEXT_DAY_POINTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptKind {
    ActivitySuggestion,
    GardeningTips,
    FloodRisk,
    WeatherImpact,
    HydrationTips,
    PhotographyTips,
    ClothingAdvice,
    SunscreenAdvice,
    WeatherQuestion,
    AqiAdvice,
    UvAdvice,
}

impl PromptKind {
    pub const fn all() -> &'static [PromptKind] {
        &[
            PromptKind::ActivitySuggestion,
            PromptKind::GardeningTips,
            PromptKind::FloodRisk,
            PromptKind::WeatherImpact,
            PromptKind::HydrationTips,
            PromptKind::PhotographyTips,
            PromptKind::ClothingAdvice,
            PromptKind::SunscreenAdvice,
            PromptKind::WeatherQuestion,
            PromptKind::AqiAdvice,
            PromptKind::UvAdvice,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PromptKind::ActivitySuggestion => "activity",
            PromptKind::GardeningTips => "gardening",
            PromptKind::FloodRisk => "flood-risk",
            PromptKind::WeatherImpact => "impact",
            PromptKind::HydrationTips => "hydration",
            PromptKind::PhotographyTips => "photography",
            PromptKind::ClothingAdvice => "clothing",
            PromptKind::SunscreenAdvice => "sunscreen",
            PromptKind::WeatherQuestion => "question",
            PromptKind::AqiAdvice => "aqi",
            PromptKind::UvAdvice => "uv",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            PromptKind::ActivitySuggestion => "Activity Suggestion",
            PromptKind::GardeningTips => "Smart Gardening Tips",
            PromptKind::FloodRisk => "Flood Risk Analysis",
            PromptKind::WeatherImpact => "Weather Impact",
            PromptKind::HydrationTips => "Hydration Advice",
            PromptKind::PhotographyTips => "Photography Assistant",
            PromptKind::ClothingAdvice => "What to Wear",
            PromptKind::SunscreenAdvice => "Sun Protection Advice",
            PromptKind::WeatherQuestion => "Weather Q&A",
            PromptKind::AqiAdvice => "Air Quality Advice",
            PromptKind::UvAdvice => "UV Advice",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lower = value.trim().to_lowercase();
        PromptKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| {
                let names: Vec<_> = PromptKind::all().iter().map(|k| k.as_str()).collect();
                anyhow::anyhow!(
                    "Unknown advice kind '{value}'. Supported kinds: {}.",
                    names.join(", ")
                )
            })
    }
}

/// Everything a prompt template may draw from.
#[derive(Debug, Clone)]
pub struct AdvisoryContext<'a> {
    pub snapshot: &'a CitySnapshot,
    pub forecast: Option<&'a ForecastSeries>,
    pub uv_index: Option<f64>,
    pub aqi: Option<u32>,
    pub question: Option<&'a str>,
    pub now: DateTime<Utc>,
}

impl<'a> AdvisoryContext<'a> {
    pub fn new(snapshot: &'a CitySnapshot) -> Self {
        Self {
            snapshot,
            forecast: None,
            uv_index: None,
            aqi: None,
            question: None,
            now: Utc::now(),
        }
    }

    pub fn from_view(view: CityView<'a>) -> Self {
        Self {
            forecast: view.forecast,
            uv_index: view.uv_index,
            aqi: view.aqi,
            ..Self::new(view.snapshot)
        }
    }

    pub fn with_question(mut self, question: &'a str) -> Self {
        self.question = Some(question);
        self
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    fn local_time(&self, t: DateTime<Utc>, fmt: &str) -> String {
        t.with_timezone(&self.snapshot.local_offset())
            .format(fmt)
            .to_string()
    }

    fn uv_text(&self) -> String {
        self.uv_index
            .map(|u| format!("{u:.1}"))
            .unwrap_or_else(|| UNAVAILABLE.to_string())
    }

    fn aqi_text(&self) -> String {
        self.aqi
            .map(|a| a.to_string())
            .unwrap_or_else(|| UNAVAILABLE.to_string())
    }

    fn question_text(&self) -> &str {
        self.question
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(UNAVAILABLE)
    }

    /// "3 PM: 0.4mm, 6 PM: 0mm, ..." for the next 24 hours.
    fn precipitation_outlook(&self) -> String {
        match self.forecast {
            Some(series) if !series.points.is_empty() => series
                .upcoming(NEXT_DAY_POINTS)
                .iter()
                .map(|p| {
                    format!(
                        "{}: {}mm",
                        self.local_time(p.time, "%-I %p"),
                        trim_float(p.precipitation_mm)
                    )
                })
                .collect::<Vec<_>>()
                .join(", "),
            _ => UNAVAILABLE.to_string(),
        }
    }

    fn forecast_summary(&self) -> String {
        match self.forecast {
            Some(series) if !series.points.is_empty() => series
                .upcoming(NEXT_DAY_POINTS)
                .iter()
                .map(|p| {
                    format!(
                        "{}: {:.1}°C, {}",
                        self.local_time(p.time, "%a %-I %p"),
                        p.temperature,
                        p.weather_description
                    )
                })
                .collect::<Vec<_>>()
                .join("; "),
            _ => UNAVAILABLE.to_string(),
        }
    }
}

fn trim_float(v: f64) -> String {
    let s = format!("{v:.2}");
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Renders the instruction sent to the text provider. Pure and deterministic.
pub fn render_prompt(kind: PromptKind, ctx: &AdvisoryContext<'_>) -> String {
    let s = ctx.snapshot;
    let c = &s.conditions;

    match kind {
        PromptKind::ClothingAdvice => format!(
            "You are a weather-based clothing advisor.\n\
             Current conditions:\n\n\
             Location: {name}\n\
             Weather: {desc}\n\
             Temperature: {temp}°C\n\
             Feels like: {feels}°C\n\
             Humidity: {hum}%\n\
             Wind: {wind} m/s\n\
             UV index: {uv}\n\n\
             Recommend what to wear today:\n\
             1. Type of clothing\n\
             2. Layering advice if needed\n\
             3. Additional accessories\n\n\
             Keep suggestions practical and specific.",
            name = s.name,
            desc = c.weather_description,
            temp = c.temperature,
            feels = c.feels_like,
            hum = c.humidity,
            wind = c.wind_speed,
            uv = ctx.uv_text(),
        ),
        PromptKind::ActivitySuggestion => format!(
            "Based on the weather below, suggest ONE specific outdoor or indoor activity that suits today.\n\
             Consider temperature, conditions, UV index and time of day, and give a short reason.\n\n\
             Current weather in {name}: {desc}\n\
             Temperature: {temp}°C\n\
             Feels like: {feels}°C\n\
             Humidity: {hum}%\n\
             Wind speed: {wind} m/s\n\
             UV index: {uv}\n\
             Local time: {time}\n\n\
             Answer with one concise paragraph, no introduction and no emojis.",
            name = s.name,
            desc = c.weather_description,
            temp = c.temperature,
            feels = c.feels_like,
            hum = c.humidity,
            wind = c.wind_speed,
            uv = ctx.uv_text(),
            time = ctx.local_time(ctx.now, "%H:%M"),
        ),
        PromptKind::GardeningTips => format!(
            "Based on the weather below, give 3-5 gardening tips for today.\n\
             Cover soil moisture, watering, plant protection and the best time to work outside.\n\n\
             Current weather in {name}: {desc}\n\
             Temperature: {temp}°C\n\
             Humidity: {hum}%\n\
             Wind speed: {wind} m/s\n\
             Rain over the next 24h: {rain}\n\n\
             Answer as a bulleted list, no introduction and no emojis.",
            name = s.name,
            desc = c.weather_description,
            temp = c.temperature,
            hum = c.humidity,
            wind = c.wind_speed,
            rain = ctx.precipitation_outlook(),
        ),
        PromptKind::FloodRisk => format!(
            "You are a weather analysis assistant.\n\
             Assess flood risk from this data:\n\n\
             Location: {name}\n\
             Current: {desc}\n\
             Next 24h precipitation: {rain}\n\n\
             Provide:\n\
             1. Risk level (Low/Moderate/High/Severe)\n\
             2. A brief explanation (1-2 sentences)\n\
             3. Key precautions if needed",
            name = s.name,
            desc = c.weather_description,
            rain = ctx.precipitation_outlook(),
        ),
        PromptKind::WeatherImpact => format!(
            "You are a weather impact analyst.\n\
             Current conditions:\n\n\
             Location: {name}\n\
             Weather: {desc}\n\
             Temperature: {temp}°C\n\
             Humidity: {hum}%\n\
             Wind: {wind} m/s\n\
             Visibility: {vis}\n\
             Air quality (US AQI): {aqi}\n\n\
             Describe the impact on:\n\
             1. Health (respiratory, joint pain, etc.)\n\
             2. Transportation (road conditions, visibility)\n\
             3. Energy consumption\n\n\
             Keep it concise and actionable.",
            name = s.name,
            desc = c.weather_description,
            temp = c.temperature,
            hum = c.humidity,
            wind = c.wind_speed,
            vis = c
                .visibility_m
                .map(|v| format!("{v} m"))
                .unwrap_or_else(|| UNAVAILABLE.to_string()),
            aqi = ctx.aqi_text(),
        ),
        PromptKind::HydrationTips => format!(
            "You are a health-focused weather assistant.\n\
             Assess hydration needs:\n\n\
             Location: {name}\n\
             Weather: {desc}\n\
             Temperature: {temp}°C\n\
             Humidity: {hum}%\n\n\
             Provide:\n\
             1. Base water intake (L/day)\n\
             2. Activity adjustments\n\
             3. Quick hydration tips\n\n\
             Format as bullet points.",
            name = s.name,
            desc = c.weather_description,
            temp = c.temperature,
            hum = c.humidity,
        ),
        PromptKind::PhotographyTips => format!(
            "You are a photography assistant.\n\
             Current conditions:\n\n\
             Location: {name}\n\
             Weather: {desc}\n\
             Cloud cover: {clouds}%\n\
             Sunrise: {sunrise}\n\
             Sunset: {sunset}\n\n\
             Give 3 specific tips on:\n\
             1. Best timing\n\
             2. Camera settings\n\
             3. Subject recommendations\n\n\
             Keep tips practical and specific.",
            name = s.name,
            desc = c.weather_description,
            clouds = c.cloud_cover_pct,
            sunrise = ctx.local_time(c.sunrise, "%H:%M"),
            sunset = ctx.local_time(c.sunset, "%H:%M"),
        ),
        PromptKind::SunscreenAdvice => format!(
            "You are a sun protection advisor.\n\
             Current conditions:\n\n\
             Location: {name}\n\
             Weather: {desc}\n\
             UV index: {uv}\n\
             Cloud cover: {clouds}%\n\n\
             Provide:\n\
             1. Minimum SPF needed\n\
             2. Reapplication timing\n\
             3. Additional protection tips\n\n\
             Format as short, clear bullet points.",
            name = s.name,
            desc = c.weather_description,
            uv = ctx.uv_text(),
            clouds = c.cloud_cover_pct,
        ),
        PromptKind::WeatherQuestion => format!(
            "You are a helpful weather assistant. Answer the user's question using the data below.\n\
             If the data does not cover the question, say so briefly.\n\n\
             Question: {question}\n\n\
             Location: {name}, {country}\n\
             Weather: {desc}\n\
             Temperature: {temp}°C (feels like {feels}°C)\n\
             Humidity: {hum}%\n\
             Wind: {wind} m/s\n\
             UV index: {uv}\n\
             Air quality (US AQI): {aqi}\n\
             Next 24h: {forecast}\n\n\
             Answer in a short paragraph.",
            question = ctx.question_text(),
            name = s.name,
            country = s.country,
            desc = c.weather_description,
            temp = c.temperature,
            feels = c.feels_like,
            hum = c.humidity,
            wind = c.wind_speed,
            uv = ctx.uv_text(),
            aqi = ctx.aqi_text(),
            forecast = ctx.forecast_summary(),
        ),
        PromptKind::AqiAdvice => format!(
            "You are an air quality expert.\n\
             Current AQI data:\n\n\
             Location: {name}\n\
             AQI level: {aqi}\n\
             Temperature: {temp}°C\n\
             Humidity: {hum}%\n\
             Wind speed: {wind} m/s\n\n\
             Provide:\n\
             1. Brief health impact assessment\n\
             2. Recommended precautions\n\
             3. Suggested activity adjustments\n\n\
             Keep it concise, aimed at students and young adults, as a single paragraph.",
            name = s.name,
            aqi = ctx.aqi_text(),
            temp = c.temperature,
            hum = c.humidity,
            wind = c.wind_speed,
        ),
        PromptKind::UvAdvice => format!(
            "As a UV expert, give very brief advice (max 15 words) for:\n\
             UV index: {uv}\n\
             Local time: {time}\n\n\
             Focus on:\n\
             - Protection needed\n\
             - Quick action tips\n\n\
             Keep it extremely concise, casual and student-friendly.",
            uv = ctx.uv_text(),
            time = ctx.local_time(ctx.now, "%H:%M"),
        ),
    }
}

/// Strips markdown emphasis and headers and collapses blank-line runs.
///
/// Applying it to its own output is a no-op.
pub fn clean_markdown(text: &str) -> String {
    let mut current = text.trim().to_string();
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(text: &str) -> String {
    let without_emphasis: String = text.chars().filter(|&c| c != '*').collect();

    let without_headers = without_emphasis
        .split('\n')
        .map(strip_header_markers)
        .collect::<Vec<_>>()
        .join("\n");

    collapse_blank_lines(&without_headers).trim().to_string()
}

/// Turns a markdown header line (`#` to `######` plus text) into its text.
fn strip_header_markers(line: &str) -> String {
    let body = line.trim_start_matches([' ', '\t']);
    let hashes = body.len() - body.trim_start_matches('#').len();
    if hashes == 0 || hashes > 6 {
        return line.to_string();
    }

    let rest = &body[hashes..];
    let text = rest.trim_start_matches([' ', '\t']);
    if text.len() == rest.len() || text.is_empty() {
        return line.to_string();
    }

    text.to_string()
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut newlines = 0;

    for ch in text.chars() {
        if ch == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(ch);
            }
        } else {
            newlines = 0;
            out.push(ch);
        }
    }

    out
}

/// Turns prompt kinds into display-ready advice, degrading to a fixed sentence.
#[derive(Debug)]
pub struct Advisor {
    generator: Box<dyn TextGenerator>,
}

impl Advisor {
    pub fn new(generator: Box<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn generate(&self, kind: PromptKind, ctx: &AdvisoryContext<'_>) -> String {
        let prompt = render_prompt(kind, ctx);
        debug!(%kind, city = %ctx.snapshot.name, "generating advice");

        match self.generator.generate(&prompt).await {
            Ok(text) => {
                let cleaned = clean_markdown(&text);
                if cleaned.is_empty() {
                    warn!(%kind, "text provider returned only markup");
                    FALLBACK_TEXT.to_string()
                } else {
                    cleaned
                }
            }
            Err(condition) => {
                warn!(%kind, city = %ctx.snapshot.name, %condition, "advice generation failed");
                FALLBACK_TEXT.to_string()
            }
        }
    }
}
