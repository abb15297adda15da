//! Collaborator seams consumed by the weather core.

use async_trait::async_trait;
use chrono::NaiveDate;
use common::errors::AppError;
use common::models::{FavoriteLocation, Location, WeatherKind};
use serde_json::Value;

#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Case-insensitive lookup by city name.
    async fn location_by_city(&self, city: &str) -> Result<Option<Location>, AppError>;

    async fn list_locations(&self) -> Result<Vec<Location>, AppError>;

    /// One page of favorites in a stable order; an empty page means the end.
    async fn list_favorites(
        &self,
        limit: i64,
        skip: i64,
    ) -> Result<Vec<FavoriteLocation>, AppError>;

    /// Fails with `NotFound` for an unknown city and `Conflict` for a duplicate favorite.
    async fn add_favorite(
        &self,
        user_id: i32,
        city_id: i32,
    ) -> Result<FavoriteLocation, AppError>;
}

#[async_trait]
pub trait WeatherRepository: Send + Sync {
    async fn find_weather_record(
        &self,
        city_id: i32,
        kind: WeatherKind,
        date: NaiveDate,
    ) -> Result<Option<Value>, AppError>;

    /// Insert or replace the single record for (city, kind, date).
    async fn upsert_weather_record(
        &self,
        city_id: i32,
        kind: WeatherKind,
        date: NaiveDate,
        data: &Value,
    ) -> Result<(), AppError>;
}
