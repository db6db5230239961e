use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{error::Condition, model::Coordinates};

use super::{UvSource, parse_json, read_body, unexpected_status};

pub const DEFAULT_BASE_URL: &str = "https://api.open-meteo.com/v1";

/// Open-Meteo daily UV maximum. No API key.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    base_url: String,
    http: Client,
}

impl OpenMeteoClient {
    pub fn new(http: Client) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    daily: OmDaily,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    #[serde(default)]
    uv_index_max: Vec<Option<f64>>,
}

#[async_trait]
impl UvSource for OpenMeteoClient {
    async fn fetch_uv_index(&self, at: Coordinates) -> Result<f64, Condition> {
        let url = format!("{}/forecast", self.base_url);
        debug!(lat = at.lat, lon = at.lon, "requesting Open-Meteo UV index");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("latitude", at.lat.to_string()),
                ("longitude", at.lon.to_string()),
                ("daily", "uv_index_max".to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await
            .map_err(|e| Condition::from_transport("Open-Meteo forecast", e))?;

        let (status, body) = read_body("Open-Meteo", res).await?;
        if !status.is_success() {
            return Err(unexpected_status("Open-Meteo", status, &body));
        }

        let parsed: OmResponse = parse_json("Open-Meteo", &body)?;

        // First entry is today in the location's own timezone.
        parsed
            .daily
            .uv_index_max
            .first()
            .copied()
            .flatten()
            .ok_or_else(|| Condition::NoData("Open-Meteo returned no UV value for today".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PARIS: Coordinates = Coordinates {
        lat: 48.8534,
        lon: 2.3488,
    };

    fn client(server: &MockServer) -> OpenMeteoClient {
        OpenMeteoClient::new(Client::new()).with_base_url(&server.uri())
    }

    #[tokio::test]
    async fn returns_todays_max() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("latitude", "48.8534"))
            .and(query_param("longitude", "2.3488"))
            .and(query_param("daily", "uv_index_max"))
            .and(query_param("timezone", "auto"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "latitude": 48.86,
                "longitude": 2.34,
                "timezone": "Europe/Paris",
                "daily_units": {"time": "iso8601", "uv_index_max": ""},
                "daily": {
                    "time": ["2026-10-19", "2026-10-20"],
                    "uv_index_max": [3.45, 2.1]
                }
            })))
            .mount(&server)
            .await;

        assert_eq!(client(&server).fetch_uv_index(PARIS).await, Ok(3.45));
    }

    #[tokio::test]
    async fn null_or_empty_series_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "daily": {"time": ["2026-10-19"], "uv_index_max": [null]}
            })))
            .mount(&server)
            .await;

        let err = client(&server).fetch_uv_index(PARIS).await.unwrap_err();
        assert!(matches!(err, Condition::NoData(_)));
    }

    #[tokio::test]
    async fn bad_request_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": true,
                "reason": "Latitude must be in range of -90 to 90°."
            })))
            .mount(&server)
            .await;

        let err = client(&server).fetch_uv_index(PARIS).await.unwrap_err();
        assert!(matches!(err, Condition::Transient(ref m) if m.contains("400")));
    }
}
