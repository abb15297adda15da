//! Read-through weather cache: cache store, then persisted record, then upstream.
//!
//! Every layer miss falls through to the next one and the result is written
//! back to the layers above it. Concurrent misses on one key share a single
//! upstream call.

use chrono::{DateTime, NaiveDate, Utc};
use common::errors::AppError;
use common::models::{Location, WeatherKind, WeatherResponse, is_empty_payload};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, instrument, warn};

use crate::api_client::WeatherFetcher;
use crate::cache::CacheStore;
use crate::repository::{LocationRepository, WeatherRepository};
use crate::ttl;

/// Cache key for one kind of weather for a resolved location on a UTC calendar day.
///
/// Keyed by city and country since city names alone are not unique.
pub fn cache_key(kind: WeatherKind, location: &Location, date: NaiveDate) -> String {
    format!(
        "weather:{}:{}:{}:{}",
        kind,
        location.city.trim().to_lowercase(),
        location.country.trim().to_lowercase(),
        date.format("%Y-%m-%d")
    )
}

/// Claim on the per-key fetch lock. Dropping it removes the map entry once no
/// other request holds or waits on the same lock, including when the owning
/// future is cancelled mid-wait.
struct InFlight<'a> {
    map: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    lock: Arc<Mutex<()>>,
}

impl<'a> InFlight<'a> {
    fn claim(map: &'a DashMap<String, Arc<Mutex<()>>>, key: &str) -> Self {
        let lock = map
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        Self {
            map,
            key: key.to_string(),
            lock,
        }
    }

    async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        // Held by the map and this claim only
        self.map.remove_if(&self.key, |_, lock| {
            Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2
        });
    }
}

pub struct WeatherCache {
    locations: Arc<dyn LocationRepository>,
    records: Arc<dyn WeatherRepository>,
    store: Arc<dyn CacheStore>,
    fetcher: Arc<WeatherFetcher>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl WeatherCache {
    pub fn new(
        locations: Arc<dyn LocationRepository>,
        records: Arc<dyn WeatherRepository>,
        store: Arc<dyn CacheStore>,
        fetcher: Arc<WeatherFetcher>,
    ) -> Self {
        Self {
            locations,
            records,
            store,
            fetcher,
            in_flight: DashMap::new(),
        }
    }

    pub async fn get_current_weather(&self, city: &str) -> Result<WeatherResponse, AppError> {
        self.get_weather(city, WeatherKind::Current).await
    }

    pub async fn get_weather_forecast(&self, city: &str) -> Result<WeatherResponse, AppError> {
        self.get_weather(city, WeatherKind::Forecast).await
    }

    #[instrument(skip(self), fields(city = %city, kind = %kind))]
    pub async fn get_weather(
        &self,
        city: &str,
        kind: WeatherKind,
    ) -> Result<WeatherResponse, AppError> {
        let location = self
            .locations
            .location_by_city(city)
            .await?
            .ok_or_else(|| AppError::not_found(format!("City not found: {}", city)))?;

        let now = Utc::now();
        let key = cache_key(kind, &location, now.date_naive());

        if let Some(cached) = self.cached(&key).await? {
            info!(key = %key, "Cache hit");
            return Ok(cached);
        }

        let claim = InFlight::claim(&self.in_flight, &key);
        let _guard = claim.acquire().await;

        // Another request may have filled the key while this one waited
        if let Some(cached) = self.cached(&key).await? {
            debug!(key = %key, "Filled by concurrent request");
            return Ok(cached);
        }

        self.load(&location, kind, &key, now).await
    }

    /// Fetch fresh data for `location` and overwrite the record and cache entry,
    /// skipping the cache and record reads. Waits for any fetch already running
    /// on the same key so the refilled value is written last.
    #[instrument(skip(self, location), fields(city = %location.city, kind = %kind))]
    pub async fn refill(
        &self,
        location: &Location,
        kind: WeatherKind,
    ) -> Result<WeatherResponse, AppError> {
        let now = Utc::now();
        let key = cache_key(kind, location, now.date_naive());

        let claim = InFlight::claim(&self.in_flight, &key);
        let _guard = claim.acquire().await;

        self.fetch_and_store(location, kind, &key, now).await
    }

    /// Number of cache keys with a fetch running or waiting.
    pub fn pending_fetches(&self) -> usize {
        self.in_flight.len()
    }

    async fn cached(&self, key: &str) -> Result<Option<WeatherResponse>, AppError> {
        let Some(value) = self.store.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_value::<WeatherResponse>(value) {
            Ok(response) => Ok(Some(response)),
            Err(e) => {
                warn!(key = %key, error = %e, "Discarding malformed cache entry");
                Ok(None)
            }
        }
    }

    async fn load(
        &self,
        location: &Location,
        kind: WeatherKind,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<WeatherResponse, AppError> {
        let record = self
            .records
            .find_weather_record(location.id, kind, now.date_naive())
            .await?;

        match record {
            Some(data) if !is_empty_payload(&data) => {
                info!(city_id = location.id, "Weather record hit");
                self.compose_and_cache(location, kind, key, data, false, now)
                    .await
            }
            _ => self.fetch_and_store(location, kind, key, now).await,
        }
    }

    async fn fetch_and_store(
        &self,
        location: &Location,
        kind: WeatherKind,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<WeatherResponse, AppError> {
        let data = self.fetcher.fetch(location, kind).await.map_err(|e| {
            if e.is_upstream() {
                AppError::upstream(format!("{} weather for {}", kind, location.city), e)
            } else {
                e
            }
        })?;

        if is_empty_payload(&data) {
            return Err(AppError::not_found(format!(
                "No {} weather data for {}",
                kind, location.city
            )));
        }

        self.compose_and_cache(location, kind, key, data, true, now)
            .await
    }

    async fn compose_and_cache(
        &self,
        location: &Location,
        kind: WeatherKind,
        key: &str,
        data: Value,
        save_to_db: bool,
        now: DateTime<Utc>,
    ) -> Result<WeatherResponse, AppError> {
        if save_to_db {
            self.records
                .upsert_weather_record(location.id, kind, now.date_naive(), &data)
                .await?;
        }

        let response = WeatherResponse::new(location, data);
        let ttl_secs = ttl::ttl_for(kind, now);
        self.store
            .set(key, serde_json::to_value(&response)?, ttl_secs)
            .await?;

        info!(key = %key, ttl_secs, saved = save_to_db, "Weather cached");
        Ok(response)
    }
}
