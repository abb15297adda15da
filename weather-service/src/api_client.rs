use common::errors::AppError;
use common::http_client::HttpClient;
use common::models::{Location, WeatherKind};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument};

use crate::config::WeatherApiConfig;

/// `GET /realtime` body; only `data.values` is kept
#[derive(Debug, Deserialize)]
struct RealtimeResponse {
    data: Option<RealtimeData>,
}

#[derive(Debug, Deserialize)]
struct RealtimeData {
    values: Option<Value>,
}

/// `GET /forecast?timesteps=1d` body; only `timelines.daily` is kept
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    timelines: Option<Timelines>,
}

#[derive(Debug, Deserialize)]
struct Timelines {
    daily: Option<Value>,
}

/// Client for the third-party weather API.
///
/// A body that does not have the expected shape yields `Value::Null`, which
/// callers treat as "no data" rather than as a failure.
pub struct WeatherFetcher {
    http_client: HttpClient,
    base_url: String,
    api_key: String,
}

impl WeatherFetcher {
    pub fn new(config: &WeatherApiConfig) -> Result<Self, AppError> {
        Ok(Self {
            http_client: HttpClient::new(config.timeout_secs, config.max_retries)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    #[instrument(skip(self, location), fields(city = %location.city, kind = %kind))]
    pub async fn fetch(&self, location: &Location, kind: WeatherKind) -> Result<Value, AppError> {
        info!("Fetching weather from upstream API");

        match kind {
            WeatherKind::Current => {
                let url = format!("{}/realtime", self.base_url);
                let body: Value = self
                    .http_client
                    .get_json(
                        &url,
                        &[
                            ("location", location.city.as_str()),
                            ("apikey", self.api_key.as_str()),
                        ],
                    )
                    .await?;
                Ok(parse_realtime(body))
            }
            WeatherKind::Forecast => {
                let url = format!("{}/forecast", self.base_url);
                let body: Value = self
                    .http_client
                    .get_json(
                        &url,
                        &[
                            ("location", location.city.as_str()),
                            ("apikey", self.api_key.as_str()),
                            ("timesteps", "1d"),
                        ],
                    )
                    .await?;
                Ok(parse_forecast(body))
            }
        }
    }
}

fn parse_realtime(body: Value) -> Value {
    serde_json::from_value::<RealtimeResponse>(body)
        .ok()
        .and_then(|response| response.data)
        .and_then(|data| data.values)
        .unwrap_or(Value::Null)
}

fn parse_forecast(body: Value) -> Value {
    serde_json::from_value::<ForecastResponse>(body)
        .ok()
        .and_then(|response| response.timelines)
        .and_then(|timelines| timelines.daily)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    fn london() -> Location {
        Location {
            id: 1,
            city: "London".to_string(),
            country: "UK".to_string(),
            lat: 51.5074,
            lng: -0.1278,
        }
    }

    fn fetcher(base_url: String) -> WeatherFetcher {
        WeatherFetcher::new(&WeatherApiConfig {
            base_url,
            api_key: "test-key".to_string(),
            timeout_secs: 2,
            max_retries: 0,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_realtime_values() {
        let body = json!({ "data": { "time": "2024-12-30T14:00:00Z", "values": { "temperature": 20 } } });
        assert_eq!(parse_realtime(body), json!({ "temperature": 20 }));
    }

    #[test]
    fn test_parse_forecast_daily() {
        let body = json!({ "timelines": { "daily": [{ "time": "2024-12-30", "values": {} }] } });
        assert_eq!(
            parse_forecast(body),
            json!([{ "time": "2024-12-30", "values": {} }])
        );
    }

    #[test]
    fn test_shape_mismatch_is_empty() {
        assert_eq!(parse_realtime(json!({ "timelines": {} })), Value::Null);
        assert_eq!(parse_realtime(json!({ "data": "oops" })), Value::Null);
        assert_eq!(parse_forecast(json!([1, 2, 3])), Value::Null);
        assert_eq!(parse_forecast(json!({ "timelines": { "hourly": [] } })), Value::Null);
    }

    #[tokio::test]
    async fn test_fetch_current_uses_realtime_endpoint() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/realtime"))
            .and(query_param("location", "London"))
            .and(query_param("apikey", "test-key"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": { "values": { "temperature": 20 } } })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let data = fetcher(mock_server.uri())
            .fetch(&london(), WeatherKind::Current)
            .await
            .unwrap();

        assert_eq!(data, json!({ "temperature": 20 }));
    }

    #[tokio::test]
    async fn test_fetch_forecast_requests_daily_timesteps() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forecast"))
            .and(query_param("timesteps", "1d"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "timelines": { "daily": [{ "forecast": "Sunny" }] } })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let data = fetcher(mock_server.uri())
            .fetch(&london(), WeatherKind::Forecast)
            .await
            .unwrap();

        assert_eq!(data, json!([{ "forecast": "Sunny" }]));
    }

    #[tokio::test]
    async fn test_fetch_non_200_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/realtime"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let result = fetcher(mock_server.uri())
            .fetch(&london(), WeatherKind::Current)
            .await;

        assert!(matches!(result, Err(AppError::HttpError { status: 429, .. })));
    }
}
