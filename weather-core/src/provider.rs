use crate::{
    CitySnapshot, Config, ForecastSeries,
    error::Condition,
    model::Coordinates,
    provider::{
        airvisual::AirVisualClient, gemini::GeminiClient, openmeteo::OpenMeteoClient,
        openweather::OpenWeatherClient,
    },
};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use std::{convert::TryFrom, fmt::Debug, time::Duration};

pub mod airvisual;
pub mod gemini;
pub mod openmeteo;
pub mod openweather;

/// Providers that need credentials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    AirVisual,
    Gemini,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::AirVisual => "airvisual",
            ProviderId::Gemini => "gemini",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::AirVisual, ProviderId::Gemini]
    }

    pub fn purpose(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "current weather and forecast",
            ProviderId::AirVisual => "air quality index",
            ProviderId::Gemini => "AI-generated advice",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "airvisual" | "iqair" => Ok(ProviderId::AirVisual),
            "gemini" => Ok(ProviderId::Gemini),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, airvisual, gemini."
            )),
        }
    }
}

/// Current conditions and forecast, keyed by free-text city name.
///
/// The two operations are independent: no session or cache is shared between them.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn fetch_current(&self, city: &str) -> Result<CitySnapshot, Condition>;

    async fn fetch_forecast(&self, city: &str) -> Result<ForecastSeries, Condition>;
}

/// US EPA AQI from the monitoring station nearest to a point.
#[async_trait]
pub trait AirQualitySource: Send + Sync + Debug {
    async fn fetch_aqi(&self, at: Coordinates) -> Result<u32, Condition>;
}

/// Today's maximum UV index at a point.
#[async_trait]
pub trait UvSource: Send + Sync + Debug {
    async fn fetch_uv_index(&self, at: Coordinates) -> Result<f64, Condition>;
}

/// Free-text completion for a single prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync + Debug {
    async fn generate(&self, prompt: &str) -> Result<String, Condition>;
}

/// Shared HTTP client with the configured per-request timeout.
pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

pub fn weather_source_from_config(
    config: &Config,
    http: &Client,
) -> anyhow::Result<Box<dyn WeatherSource>> {
    let api_key = config.require_api_key(ProviderId::OpenWeather)?;
    let mut client = OpenWeatherClient::new(api_key.to_owned(), http.clone());
    if let Some(url) = &config.endpoints.openweather {
        client = client.with_base_url(url);
    }
    Ok(Box::new(client))
}

/// `None` when no AirVisual key is configured; AQI is then reported as unavailable.
pub fn air_quality_source_from_config(
    config: &Config,
    http: &Client,
) -> Option<Box<dyn AirQualitySource>> {
    let api_key = config.provider_api_key(ProviderId::AirVisual)?;
    let mut client = AirVisualClient::new(api_key.to_owned(), http.clone());
    if let Some(url) = &config.endpoints.airvisual {
        client = client.with_base_url(url);
    }
    Some(Box::new(client))
}

pub fn uv_source_from_config(config: &Config, http: &Client) -> Box<dyn UvSource> {
    let mut client = OpenMeteoClient::new(http.clone());
    if let Some(url) = &config.endpoints.openmeteo {
        client = client.with_base_url(url);
    }
    Box::new(client)
}

pub fn text_generator_from_config(
    config: &Config,
    http: &Client,
) -> anyhow::Result<Box<dyn TextGenerator>> {
    let api_key = config.require_api_key(ProviderId::Gemini)?;
    let mut client =
        GeminiClient::new(api_key.to_owned(), config.generation.clone(), http.clone());
    if let Some(url) = &config.endpoints.gemini {
        client = client.with_base_url(url);
    }
    Ok(Box::new(client))
}

/// Reads the whole body, mapping transport errors to a [`Condition`].
pub(crate) async fn read_body(what: &str, res: Response) -> Result<(StatusCode, String), Condition> {
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| Condition::from_transport(&format!("reading {what} response body"), e))?;
    Ok((status, body))
}

pub(crate) fn unexpected_status(what: &str, status: StatusCode, body: &str) -> Condition {
    Condition::Transient(format!(
        "{what} request failed with status {status}: {}",
        truncate_body(body)
    ))
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    what: &str,
    body: &str,
) -> Result<T, Condition> {
    serde_json::from_str(body)
        .map_err(|e| Condition::Transient(format!("failed to parse {what} JSON: {e}")))
}

pub(crate) fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn iqair_is_an_alias_for_airvisual() {
        assert_eq!(ProviderId::try_from("IQAir").unwrap(), ProviderId::AirVisual);
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn weather_source_errors_when_missing_api_key() {
        let cfg = Config::default();
        let http = Client::new();
        let err = weather_source_from_config(&cfg, &http).unwrap_err();
        assert!(err.to_string().contains("No API key configured for provider"));
    }

    #[test]
    fn air_quality_is_optional() {
        let mut cfg = Config::default();
        let http = Client::new();
        assert!(air_quality_source_from_config(&cfg, &http).is_none());

        cfg.upsert_provider_api_key(ProviderId::AirVisual, "KEY".to_string());
        assert!(air_quality_source_from_config(&cfg, &http).is_some());
    }

    #[test]
    fn sources_build_when_configured() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeather, "KEY".to_string());
        cfg.upsert_provider_api_key(ProviderId::Gemini, "KEY".to_string());
        let http = http_client(cfg.request_timeout()).expect("client");

        assert!(weather_source_from_config(&cfg, &http).is_ok());
        assert!(text_generator_from_config(&cfg, &http).is_ok());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(250);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
