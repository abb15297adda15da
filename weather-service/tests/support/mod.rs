#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::Arc;
use weather_service::api_client::WeatherFetcher;
use weather_service::cache::MemoryCacheStore;
use weather_service::config::WeatherApiConfig;
use weather_service::memory::InMemoryRepository;
use weather_service::repository::{LocationRepository, WeatherRepository};
use weather_service::weather::WeatherCache;
use wiremock::MockServer;

pub struct Harness {
    pub repository: Arc<InMemoryRepository>,
    pub store: Arc<MemoryCacheStore>,
    pub weather: Arc<WeatherCache>,
}

pub fn api_config(base_url: String) -> WeatherApiConfig {
    WeatherApiConfig {
        base_url,
        api_key: "test-key".to_string(),
        timeout_secs: 2,
        max_retries: 0,
    }
}

pub fn fetcher(mock_server: &MockServer) -> Arc<WeatherFetcher> {
    Arc::new(WeatherFetcher::new(&api_config(mock_server.uri())).expect("fetcher"))
}

pub async fn harness(mock_server: &MockServer) -> Harness {
    let repository = Arc::new(InMemoryRepository::with_default_locations().await);
    harness_with(mock_server, repository.clone(), repository).await
}

pub async fn harness_with(
    mock_server: &MockServer,
    repository: Arc<InMemoryRepository>,
    records: Arc<dyn WeatherRepository>,
) -> Harness {
    let store = Arc::new(MemoryCacheStore::new());
    let locations: Arc<dyn LocationRepository> = repository.clone();
    let weather = Arc::new(WeatherCache::new(
        locations,
        records,
        store.clone(),
        fetcher(mock_server),
    ));

    Harness {
        repository,
        store,
        weather,
    }
}

pub fn realtime_body(values: Value) -> Value {
    json!({ "data": { "time": "2024-12-30T14:00:00Z", "values": values } })
}

pub fn forecast_body(daily: Value) -> Value {
    json!({ "timelines": { "daily": daily } })
}
