use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::Condition,
    model::{CitySnapshot, Coordinates, CurrentConditions, ForecastPoint, ForecastSeries},
};

use super::{WeatherSource, parse_json, read_body, unexpected_status, unix_to_utc};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Icon image for an OpenWeather icon code such as `04d`.
pub fn icon_url(icon_code: &str) -> String {
    format!("https://openweathermap.org/img/wn/{icon_code}@2x.png")
}

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
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

    async fn get(&self, endpoint: &str, what: &str, city: &str) -> Result<String, Condition> {
        let url = format!("{}/{endpoint}", self.base_url);
        debug!(city, endpoint, "requesting OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await
            .map_err(|e| Condition::from_transport(&format!("OpenWeather {what} for {city}"), e))?;

        let (status, body) = read_body(&format!("OpenWeather {what}"), res).await?;

        if status == StatusCode::NOT_FOUND {
            return Err(Condition::NotFound(format!("city \"{city}\"")));
        }
        if !status.is_success() {
            return Err(unexpected_status(&format!("OpenWeather {what}"), status, &body));
        }

        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    #[serde(default)]
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: u16,
}

#[derive(Debug, Default, Deserialize)]
struct OwClouds {
    all: u8,
}

#[derive(Debug, Default, Deserialize)]
struct OwVolume {
    #[serde(rename = "3h", default)]
    three_hours: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    #[serde(default)]
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    coord: OwCoord,
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    clouds: OwClouds,
    visibility: Option<u32>,
    sys: OwSys,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    #[serde(default)]
    pop: f64,
    rain: Option<OwVolume>,
    snow: Option<OwVolume>,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

/// Splits the first weather entry into (main, description, icon).
fn describe(weather: &[OwWeather]) -> (String, String, String) {
    weather
        .first()
        .map(|w| (w.main.clone(), w.description.clone(), w.icon.clone()))
        .unwrap_or_else(|| ("Unknown".to_string(), "unknown".to_string(), String::new()))
}

impl From<OwCurrentResponse> for CitySnapshot {
    fn from(parsed: OwCurrentResponse) -> Self {
        let (weather_main, weather_description, icon_code) = describe(&parsed.weather);
        let observed_at = unix_to_utc(parsed.dt).unwrap_or_else(Utc::now);

        CitySnapshot {
            name: parsed.name,
            country: parsed.sys.country,
            coordinates: Coordinates {
                lat: parsed.coord.lat,
                lon: parsed.coord.lon,
            },
            conditions: CurrentConditions {
                temperature: parsed.main.temp,
                feels_like: parsed.main.feels_like,
                humidity: parsed.main.humidity,
                pressure: parsed.main.pressure,
                wind_speed: parsed.wind.speed,
                wind_direction_deg: parsed.wind.deg,
                cloud_cover_pct: parsed.clouds.all,
                visibility_m: parsed.visibility,
                weather_main,
                weather_description,
                icon_code,
                sunrise: unix_to_utc(parsed.sys.sunrise).unwrap_or(observed_at),
                sunset: unix_to_utc(parsed.sys.sunset).unwrap_or(observed_at),
            },
            timezone_offset_secs: parsed.timezone,
            observed_at,
        }
    }
}

impl From<OwForecastResponse> for ForecastSeries {
    fn from(parsed: OwForecastResponse) -> Self {
        let mut points: Vec<ForecastPoint> = parsed
            .list
            .into_iter()
            .filter_map(|entry| {
                let time = unix_to_utc(entry.dt)?;
                let (weather_main, weather_description, icon_code) = describe(&entry.weather);
                let precipitation_mm = entry.rain.map_or(0.0, |v| v.three_hours)
                    + entry.snow.map_or(0.0, |v| v.three_hours);

                Some(ForecastPoint {
                    time,
                    temperature: entry.main.temp,
                    feels_like: entry.main.feels_like,
                    humidity: entry.main.humidity,
                    weather_main,
                    weather_description,
                    icon_code,
                    precipitation_mm,
                    precipitation_chance: entry.pop,
                })
            })
            .collect();
        points.sort_by_key(|p| p.time);

        ForecastSeries {
            city: parsed.city.name,
            timezone_offset_secs: parsed.city.timezone,
            points,
        }
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn fetch_current(&self, city: &str) -> Result<CitySnapshot, Condition> {
        let body = self.get("weather", "current weather", city).await?;
        let parsed: OwCurrentResponse = parse_json("OpenWeather current", &body)?;
        Ok(parsed.into())
    }

    async fn fetch_forecast(&self, city: &str) -> Result<ForecastSeries, Condition> {
        let body = self.get("forecast", "forecast", city).await?;
        let parsed: OwForecastResponse = parse_json("OpenWeather forecast", &body)?;
        if parsed.list.is_empty() {
            return Err(Condition::NoData(format!(
                "OpenWeather forecast for {} contained no entries",
                parsed.city.name
            )));
        }
        Ok(parsed.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn current_json() -> serde_json::Value {
        serde_json::json!({
            "coord": {"lon": -0.1257, "lat": 51.5085},
            "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04d"}],
            "base": "stations",
            "main": {"temp": 14.2, "feels_like": 13.6, "temp_min": 12.9, "temp_max": 15.3, "pressure": 1012, "humidity": 77},
            "visibility": 10000,
            "wind": {"speed": 4.63, "deg": 240},
            "clouds": {"all": 75},
            "dt": 1792400000,
            "sys": {"type": 2, "id": 2075535, "country": "GB", "sunrise": 1792390000, "sunset": 1792428000},
            "timezone": 3600,
            "id": 2643743,
            "name": "London",
            "cod": 200
        })
    }

    fn client(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new("test_key".into(), Client::new()).with_base_url(&server.uri())
    }

    #[tokio::test]
    async fn fetch_current_maps_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .and(query_param("q", "london"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_json()))
            .mount(&server)
            .await;

        let snapshot = client(&server).fetch_current("london").await.unwrap();

        assert_eq!(snapshot.name, "London");
        assert_eq!(snapshot.country, "GB");
        assert_eq!(snapshot.coordinates.lat, 51.5085);
        assert_eq!(snapshot.conditions.humidity, 77);
        assert_eq!(snapshot.conditions.pressure, 1012);
        assert_eq!(snapshot.conditions.wind_direction_deg, 240);
        assert_eq!(snapshot.conditions.cloud_cover_pct, 75);
        assert_eq!(snapshot.conditions.visibility_m, Some(10000));
        assert_eq!(snapshot.conditions.weather_main, "Clouds");
        assert_eq!(snapshot.conditions.icon_code, "04d");
        assert_eq!(snapshot.timezone_offset_secs, 3600);
        assert_eq!(snapshot.conditions.sunrise.timestamp(), 1792390000);
    }

    #[tokio::test]
    async fn fetch_current_404_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).fetch_current("Atlantis").await.unwrap_err();
        assert_eq!(err, Condition::NotFound("city \"Atlantis\"".into()));
    }

    #[tokio::test]
    async fn fetch_current_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_current("London").await.unwrap_err();
        assert!(matches!(err, Condition::Transient(ref m) if m.contains("502")));
    }

    #[tokio::test]
    async fn malformed_json_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_current("London").await.unwrap_err();
        assert!(matches!(err, Condition::Transient(ref m) if m.contains("parse")));
    }

    #[tokio::test]
    async fn slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(current_json())
                    .set_delay(std::time::Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let http = crate::provider::http_client(std::time::Duration::from_millis(50)).unwrap();
        let client = OpenWeatherClient::new("k".into(), http).with_base_url(&server.uri());

        let err = client.fetch_current("London").await.unwrap_err();
        assert!(matches!(err, Condition::Timeout(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn fetch_forecast_sums_precipitation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("q", "Paris"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "cod": "200",
                "cnt": 2,
                "list": [
                    {
                        "dt": 1792411200,
                        "main": {"temp": 11.0, "feels_like": 10.1, "humidity": 90},
                        "weather": [{"main": "Snow", "description": "light snow", "icon": "13d"}],
                        "pop": 0.8,
                        "rain": {"3h": 0.4},
                        "snow": {"3h": 1.1}
                    },
                    {
                        "dt": 1792400400,
                        "main": {"temp": 12.5, "feels_like": 11.9, "humidity": 85},
                        "weather": [{"main": "Clouds", "description": "overcast clouds", "icon": "04d"}],
                        "pop": 0
                    }
                ],
                "city": {"id": 2988507, "name": "Paris", "country": "FR", "timezone": 7200}
            })))
            .mount(&server)
            .await;

        let series = client(&server).fetch_forecast("Paris").await.unwrap();

        assert_eq!(series.city, "Paris");
        assert_eq!(series.timezone_offset_secs, 7200);
        assert_eq!(series.points.len(), 2);
        // sorted by time
        assert_eq!(series.points[0].weather_main, "Clouds");
        assert_eq!(series.points[0].precipitation_mm, 0.0);
        assert!((series.points[1].precipitation_mm - 1.5).abs() < 1e-9);
        assert_eq!(series.points[1].precipitation_chance, 0.8);
    }

    #[tokio::test]
    async fn empty_forecast_is_no_data() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "list": [],
                "city": {"name": "Paris", "country": "FR", "timezone": 7200}
            })))
            .mount(&server)
            .await;

        let err = client(&server).fetch_forecast("Paris").await.unwrap_err();
        assert!(matches!(err, Condition::NoData(_)));
    }

    #[test]
    fn icon_url_uses_2x_asset() {
        assert_eq!(icon_url("10n"), "https://openweathermap.org/img/wn/10n@2x.png");
    }
}
