use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{error::Condition, model::Coordinates};

use super::{AirQualitySource, parse_json, read_body, unexpected_status};

pub const DEFAULT_BASE_URL: &str = "http://api.airvisual.com/v2";

/// IQAir / AirVisual nearest-station lookup.
#[derive(Debug, Clone)]
pub struct AirVisualClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl AirVisualClient {
    pub fn new(api_key: String, http: Client) -> Self {
        Self {
            api_key,
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
struct AvResponse {
    status: String,
    data: Option<AvData>,
}

#[derive(Debug, Deserialize)]
struct AvData {
    current: Option<AvCurrent>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AvCurrent {
    pollution: AvPollution,
}

#[derive(Debug, Deserialize)]
struct AvPollution {
    aqius: u32,
}

#[async_trait]
impl AirQualitySource for AirVisualClient {
    async fn fetch_aqi(&self, at: Coordinates) -> Result<u32, Condition> {
        let url = format!("{}/nearest_city", self.base_url);
        debug!(lat = at.lat, lon = at.lon, "requesting AirVisual nearest city");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("key", self.api_key.clone()),
            ])
            .send()
            .await
            .map_err(|e| Condition::from_transport("AirVisual nearest_city", e))?;

        let (status, body) = read_body("AirVisual", res).await?;
        if !status.is_success() {
            return Err(unexpected_status("AirVisual", status, &body));
        }

        let parsed: AvResponse = parse_json("AirVisual", &body)?;
        if parsed.status != "success" {
            let message = parsed
                .data
                .and_then(|d| d.message)
                .unwrap_or_else(|| parsed.status.clone());
            return Err(Condition::NoData(format!("AirVisual: {message}")));
        }

        parsed
            .data
            .and_then(|d| d.current)
            .map(|c| c.pollution.aqius)
            .ok_or_else(|| Condition::NoData("AirVisual response had no pollution data".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AirVisualClient {
        AirVisualClient::new("aq_key".into(), Client::new()).with_base_url(&server.uri())
    }

    const LONDON: Coordinates = Coordinates {
        lat: 51.5085,
        lon: -0.1257,
    };

    #[tokio::test]
    async fn returns_us_aqi() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nearest_city"))
            .and(query_param("lat", "51.5085"))
            .and(query_param("lon", "-0.1257"))
            .and(query_param("key", "aq_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "data": {
                    "city": "London",
                    "state": "England",
                    "country": "United Kingdom",
                    "location": {"type": "Point", "coordinates": [-0.1257, 51.5085]},
                    "current": {
                        "pollution": {"ts": "2026-10-19T11:00:00.000Z", "aqius": 37, "mainus": "p2", "aqicn": 13, "maincn": "p2"},
                        "weather": {"ts": "2026-10-19T12:00:00.000Z", "tp": 14, "pr": 1012, "hu": 77, "ws": 4.6, "wd": 240, "ic": "04d"}
                    }
                }
            })))
            .mount(&server)
            .await;

        assert_eq!(client(&server).fetch_aqi(LONDON).await, Ok(37));
    }

    #[tokio::test]
    async fn fail_status_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nearest_city"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "fail",
                "data": {"message": "no_nearest_station"}
            })))
            .mount(&server)
            .await;

        let err = client(&server).fetch_aqi(LONDON).await.unwrap_err();
        assert_eq!(err, Condition::NoData("AirVisual: no_nearest_station".into()));
    }

    #[tokio::test]
    async fn rate_limit_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/nearest_city"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_aqi(LONDON).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
