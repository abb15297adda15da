pub mod migrations;
pub mod queries;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::errors::AppError;
use common::models::{FavoriteLocation, Location, WeatherKind};
use serde_json::Value;
use sqlx::PgPool;

use crate::repository::{LocationRepository, WeatherRepository};
use queries::{Favorite, WeatherRecord};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPool::connect(database_url).await?;

    // Run migrations
    migrations::run_migrations(&pool).await?;

    Ok(pool)
}

/// Postgres-backed locations and weather records
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LocationRepository for PgRepository {
    async fn location_by_city(&self, city: &str) -> Result<Option<Location>, AppError> {
        Ok(queries::find_location_by_city(&self.pool, city).await?)
    }

    async fn list_locations(&self) -> Result<Vec<Location>, AppError> {
        Ok(queries::list_locations(&self.pool).await?)
    }

    async fn list_favorites(
        &self,
        limit: i64,
        skip: i64,
    ) -> Result<Vec<FavoriteLocation>, AppError> {
        let rows = Favorite::list_page(&self.pool, limit, skip).await?;
        Ok(rows.into_iter().map(FavoriteLocation::from).collect())
    }

    async fn add_favorite(
        &self,
        user_id: i32,
        city_id: i32,
    ) -> Result<FavoriteLocation, AppError> {
        let location = queries::find_location_by_id(&self.pool, city_id)
            .await?
            .ok_or_else(|| AppError::not_found("City not found"))?;

        // Unique violations surface as AppError::Conflict
        let id = Favorite::create(&self.pool, user_id, city_id).await?;

        Ok(FavoriteLocation {
            id,
            user_id,
            location,
        })
    }
}

#[async_trait]
impl WeatherRepository for PgRepository {
    async fn find_weather_record(
        &self,
        city_id: i32,
        kind: WeatherKind,
        date: NaiveDate,
    ) -> Result<Option<Value>, AppError> {
        let record = WeatherRecord::find(&self.pool, city_id, kind, date).await?;
        Ok(record.map(|r| r.data))
    }

    async fn upsert_weather_record(
        &self,
        city_id: i32,
        kind: WeatherKind,
        date: NaiveDate,
        data: &Value,
    ) -> Result<(), AppError> {
        WeatherRecord::upsert(&self.pool, city_id, kind, date, data)
            .await
            .map_err(|e| AppError::internal(format!("Failed to save weather record: {}", e)))
    }
}
