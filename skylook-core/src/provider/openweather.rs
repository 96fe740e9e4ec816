use async_trait::async_trait;
use chrono::DateTime;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    config::Credential,
    error::{ClientError, ErrorKind, Operation},
    model::{Condition, Coordinate, CredentialCheck, LocationQuery, WeatherResult},
};

use super::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
const CURRENT_WEATHER_PATH: &str = "/data/2.5/weather";
/// Known-good city used to check the credential.
const PROBE_CITY: &str = "London";
const REDACTED: &str = "API_KEY_HIDDEN";

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    credential: Option<Credential>,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(credential: Option<Credential>) -> Self {
        Self {
            credential,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Point the provider at another host (tests, proxies).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, CURRENT_WEATHER_PATH)
    }

    /// One GET against the current-weather endpoint.
    async fn send(&self, params: &[(&str, String)]) -> Result<(StatusCode, String), ClientError> {
        let request = self
            .http
            .get(self.endpoint())
            .query(params)
            .build()
            .map_err(|e| ClientError::Unexpected(e.to_string()))?;

        debug!(url = %redacted_url(request.url()), "making API request");

        let res = self.http.execute(request).await.map_err(ClientError::from_transport)?;

        let status = res.status();
        debug!(%status, "API response received");

        let body = res.text().await.map_err(ClientError::from_transport)?;
        Ok((status, body))
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    icon: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    dt: Option<i64>,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    coord: Option<OwCoord>,
}

/// Error body OpenWeather sends with non-2xx statuses.
#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: String,
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    #[instrument(skip(self))]
    async fn check_credential(&self) -> CredentialCheck {
        let Some(credential) = &self.credential else {
            warn!("no API key configured; skipping validation request");
            return CredentialCheck::Invalid(ClientError::MissingCredential);
        };

        let params = [
            ("q", PROBE_CITY.to_string()),
            ("appid", credential.expose().to_string()),
        ];

        match self.send(&params).await {
            Ok((status, _)) if status.is_success() => CredentialCheck::Valid,
            Ok((StatusCode::UNAUTHORIZED, _)) => {
                CredentialCheck::Invalid(ClientError::InvalidCredential)
            }
            Ok((status, body)) => CredentialCheck::Invalid(ClientError::Upstream {
                operation: Operation::CredentialCheck,
                status: status.as_u16(),
                detail: upstream_detail(status, &body),
            }),
            Err(err) => CredentialCheck::Invalid(err),
        }
    }

    #[instrument(skip(self))]
    async fn fetch_weather(&self, query: &LocationQuery) -> Result<WeatherResult, ClientError> {
        let Some(credential) = &self.credential else {
            error!("API key is missing; cannot fetch weather data");
            return Err(ClientError::MissingCredential);
        };

        let mut params = match query {
            LocationQuery::City(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(ClientError::Unexpected(
                        "either a city or coordinates must be provided".into(),
                    ));
                }
                info!(city = name, "fetching weather data for city");
                vec![("q", name.to_string())]
            }
            LocationQuery::Coordinates(coord) => {
                if !coord.is_finite() {
                    return Err(ClientError::Unexpected(format!(
                        "coordinates {coord} are not valid numbers"
                    )));
                }
                info!(%coord, "fetching weather data for coordinates");
                vec![
                    ("lat", coord.latitude.to_string()),
                    ("lon", coord.longitude.to_string()),
                ]
            }
        };
        params.push(("appid", credential.expose().to_string()));
        params.push(("units", "metric".to_string()));

        let (status, body) = self.send(&params).await?;

        match status {
            s if s.is_success() => parse_current(&body),
            StatusCode::NOT_FOUND => Err(ClientError::LocationNotFound),
            s => Err(ClientError::Upstream {
                operation: Operation::FetchWeather,
                status: s.as_u16(),
                detail: upstream_detail(s, &body),
            }),
        }
    }
}

/// Validate a 2xx body against the expected schema.
fn parse_current(body: &str) -> Result<WeatherResult, ClientError> {
    let parsed: OwCurrentResponse =
        serde_json::from_str(body).map_err(|e| ClientError::MalformedPayload(e.to_string()))?;

    if parsed.weather.is_empty() {
        return Err(ClientError::MalformedPayload(
            "response contained no weather conditions".into(),
        ));
    }

    Ok(WeatherResult {
        name: parsed.name,
        conditions: parsed
            .weather
            .into_iter()
            .map(|w| Condition {
                icon: w.icon,
                description: w.description,
            })
            .collect(),
        temperature_c: parsed.main.temp,
        humidity_pct: parsed.main.humidity,
        wind_speed_mps: parsed.wind.speed,
        coord: parsed.coord.map(|c| Coordinate::new(c.lat, c.lon)),
        observed_at: parsed.dt.and_then(|ts| DateTime::from_timestamp(ts, 0)),
    })
}

/// Short human-readable reason for a non-2xx response.
fn upstream_detail(status: StatusCode, body: &str) -> String {
    if let Ok(err) = serde_json::from_str::<OwErrorBody>(body) {
        return err.message;
    }
    match status.canonical_reason() {
        Some(reason) if body.trim().is_empty() => reason.to_string(),
        _ => truncate_body(body),
    }
}

/// Request URL with the `appid` value replaced, safe to log.
fn redacted_url(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "appid" {
                REDACTED.to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), v)
        })
        .collect();

    let mut shown = url.clone();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenWeatherProvider {
        OpenWeatherProvider::new(Credential::new("test_key")).with_base_url(&server.uri())
    }

    fn london_body() -> serde_json::Value {
        serde_json::json!({
            "coord": {"lon": -0.09, "lat": 51.5},
            "weather": [
                {"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"},
                {"id": 701, "main": "Mist", "description": "mist", "icon": "50d"}
            ],
            "main": {"temp": 11.6, "feels_like": 10.9, "humidity": 81},
            "wind": {"speed": 4.12, "deg": 250},
            "dt": 1700000000,
            "name": "London",
            "cod": 200
        })
    }

    #[tokio::test]
    async fn check_credential_without_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let provider = OpenWeatherProvider::new(None).with_base_url(&server.uri());
        let check = provider.check_credential().await;

        assert!(!check.is_valid());
        assert!(matches!(check, CredentialCheck::Invalid(ClientError::MissingCredential)));
    }

    #[tokio::test]
    async fn check_credential_queries_known_city() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "London"))
            .and(query_param("appid", "test_key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_body()))
            .expect(1)
            .mount(&server)
            .await;

        assert!(provider(&server).check_credential().await.is_valid());
    }

    #[tokio::test]
    async fn check_credential_401_is_invalid_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "cod": 401,
                "message": "Invalid API key. \
                            Please see https://openweathermap.org/faq#error401 for more info."
            })))
            .mount(&server)
            .await;

        let check = provider(&server).check_credential().await;
        assert!(matches!(check, CredentialCheck::Invalid(ClientError::InvalidCredential)));
        assert!(check.message().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn check_credential_other_status_is_generic() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "cod": 500, "message": "Internal error"
            })))
            .mount(&server)
            .await;

        let check = provider(&server).check_credential().await;
        let msg = check.message();
        assert!(msg.contains("API key validation failed (500)"), "{msg}");
        assert!(msg.contains("Internal error"));
    }

    #[tokio::test]
    async fn check_credential_unreachable_host_is_network_error() {
        let provider =
            OpenWeatherProvider::new(Credential::new("k")).with_base_url("http://127.0.0.1:1");

        let check = provider.check_credential().await;
        assert!(matches!(check, CredentialCheck::Invalid(ClientError::Network(_))));
        assert!(check.message().starts_with("Network error"));
    }

    #[tokio::test]
    async fn fetch_unreachable_host_is_network_error() {
        let provider =
            OpenWeatherProvider::new(Credential::new("k")).with_base_url("http://127.0.0.1:1");

        let err = provider.fetch_weather(&LocationQuery::city("London")).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)), "{err:?}");
        assert_eq!(err.kind(), ErrorKind::Connectivity);
        assert!(err.to_string().starts_with("Network error"));
    }

    #[tokio::test]
    async fn fetch_by_city_requests_metric_units() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("q", "London"))
            .and(query_param("appid", "test_key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_body()))
            .expect(1)
            .mount(&server)
            .await;

        let weather = provider(&server)
            .fetch_weather(&LocationQuery::city("  London "))
            .await
            .unwrap();

        assert_eq!(weather.name, "London");
        assert_eq!(weather.conditions.len(), 2);
        assert_eq!(weather.primary_condition().unwrap().icon, "10d");
        assert_eq!(weather.temperature_c, 11.6);
        assert_eq!(weather.humidity_pct, 81);
        assert_eq!(weather.wind_speed_mps, 4.12);
        assert_eq!(weather.coord, Some(Coordinate::new(51.5, -0.09)));
        assert_eq!(weather.observed_at.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[tokio::test]
    async fn fetch_by_coordinates_sends_lat_lon() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .and(query_param("lat", "51.5"))
            .and(query_param("lon", "-0.09"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_body()))
            .expect(1)
            .mount(&server)
            .await;

        let weather = provider(&server)
            .fetch_weather(&LocationQuery::coordinates(51.5, -0.09))
            .await
            .unwrap();

        assert_eq!(weather.coord, Some(Coordinate::new(51.5, -0.09)));
    }

    #[tokio::test]
    async fn fetch_404_is_location_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("q", "Nowhereville"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "cod": "404", "message": "city not found"
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .fetch_weather(&LocationQuery::city("Nowhereville"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::LocationNotFound));
        assert_eq!(err.to_string(), "Location not found. Please try again.");
    }

    #[tokio::test]
    async fn fetch_other_status_carries_code() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let err = provider(&server)
            .fetch_weather(&LocationQuery::city("Paris"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Upstream { status: 429, .. }));
        assert!(err.to_string().contains("(429)"));
    }

    #[tokio::test]
    async fn fetch_401_is_generic_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "cod": 401, "message": "Invalid API key"
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .fetch_weather(&LocationQuery::city("Paris"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::Upstream { status: 401, .. }));
    }

    #[tokio::test]
    async fn fetch_empty_condition_list_is_malformed() {
        let server = MockServer::start().await;
        let mut body = london_body();
        body["weather"] = serde_json::json!([]);
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let err = provider(&server)
            .fetch_weather(&LocationQuery::city("London"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn fetch_body_missing_fields_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "X"})),
            )
            .mount(&server)
            .await;

        let err = provider(&server)
            .fetch_weather(&LocationQuery::city("X"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn fetch_without_coord_is_still_a_result() {
        let server = MockServer::start().await;
        let mut body = london_body();
        body.as_object_mut().unwrap().remove("coord");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let weather = provider(&server)
            .fetch_weather(&LocationQuery::city("London"))
            .await
            .unwrap();

        assert!(weather.coord.is_none());
    }

    #[tokio::test]
    async fn fetch_rejects_bad_input_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let provider = provider(&server);

        let blank = provider.fetch_weather(&LocationQuery::city("   ")).await.unwrap_err();
        assert!(matches!(blank, ClientError::Unexpected(_)));

        let nan = provider
            .fetch_weather(&LocationQuery::coordinates(f64::NAN, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(nan, ClientError::Unexpected(_)));
    }

    #[tokio::test]
    async fn fetch_without_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = OpenWeatherProvider::new(None)
            .with_base_url(&server.uri())
            .fetch_weather(&LocationQuery::city("London"))
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::MissingCredential));
    }

    #[test]
    fn redacted_url_hides_appid() {
        let url = Url::parse(
            "https://api.openweathermap.org/data/2.5/weather?q=Paris&appid=s3cr3t&units=metric",
        )
        .unwrap();

        let shown = redacted_url(&url);
        assert!(!shown.contains("s3cr3t"));
        assert!(shown.contains("appid=API_KEY_HIDDEN"));
        assert!(shown.contains("q=Paris"));
        assert!(shown.contains("units=metric"));
    }

    #[test]
    fn upstream_detail_prefers_api_message() {
        let detail =
            upstream_detail(StatusCode::BAD_GATEWAY, r#"{"cod":502,"message":"upstream down"}"#);
        assert_eq!(detail, "upstream down");

        assert_eq!(upstream_detail(StatusCode::BAD_GATEWAY, ""), "Bad Gateway");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "é".repeat(300);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
    }
}
