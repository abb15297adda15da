//! In-process repository used when no database is configured.

use async_trait::async_trait;
use chrono::NaiveDate;
use common::errors::AppError;
use common::models::{FavoriteLocation, Location, WeatherKind};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::repository::{LocationRepository, WeatherRepository};

/// Locations seeded into a fresh store: (city, country, lat, lng).
pub const DEFAULT_LOCATIONS: [(&str, &str, f64, f64); 3] = [
    ("New York", "USA", 40.7128, -74.0060),
    ("Paris", "France", 48.8566, 2.3522),
    ("London", "UK", 51.5074, -0.1278),
];

#[derive(Default)]
pub struct InMemoryRepository {
    locations: RwLock<Vec<Location>>,
    favorites: RwLock<Vec<FavoriteLocation>>,
    records: RwLock<HashMap<(i32, WeatherKind, NaiveDate), Value>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_default_locations() -> Self {
        let repository = Self::new();
        for (city, country, lat, lng) in DEFAULT_LOCATIONS {
            repository.insert_location(city, country, lat, lng).await;
        }
        repository
    }

    pub async fn insert_location(&self, city: &str, country: &str, lat: f64, lng: f64) -> Location {
        let mut locations = self.locations.write().await;
        let location = Location {
            id: locations.len() as i32 + 1,
            city: city.to_string(),
            country: country.to_string(),
            lat,
            lng,
        };
        locations.push(location.clone());
        location
    }
}

#[async_trait]
impl LocationRepository for InMemoryRepository {
    async fn location_by_city(&self, city: &str) -> Result<Option<Location>, AppError> {
        let wanted = city.trim().to_lowercase();
        let locations = self.locations.read().await;
        Ok(locations
            .iter()
            .find(|l| l.city.to_lowercase() == wanted)
            .cloned())
    }

    async fn list_locations(&self) -> Result<Vec<Location>, AppError> {
        Ok(self.locations.read().await.clone())
    }

    async fn list_favorites(
        &self,
        limit: i64,
        skip: i64,
    ) -> Result<Vec<FavoriteLocation>, AppError> {
        let favorites = self.favorites.read().await;
        Ok(favorites
            .iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn add_favorite(
        &self,
        user_id: i32,
        city_id: i32,
    ) -> Result<FavoriteLocation, AppError> {
        let location = self
            .locations
            .read()
            .await
            .iter()
            .find(|l| l.id == city_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("City not found"))?;

        let mut favorites = self.favorites.write().await;
        if favorites
            .iter()
            .any(|f| f.user_id == user_id && f.location.id == city_id)
        {
            return Err(AppError::conflict(format!(
                "Location already exists for user {}",
                user_id
            )));
        }

        let favorite = FavoriteLocation {
            id: favorites.len() as i32 + 1,
            user_id,
            location,
        };
        favorites.push(favorite.clone());
        Ok(favorite)
    }
}

#[async_trait]
impl WeatherRepository for InMemoryRepository {
    async fn find_weather_record(
        &self,
        city_id: i32,
        kind: WeatherKind,
        date: NaiveDate,
    ) -> Result<Option<Value>, AppError> {
        let records = self.records.read().await;
        Ok(records.get(&(city_id, kind, date)).cloned())
    }

    async fn upsert_weather_record(
        &self,
        city_id: i32,
        kind: WeatherKind,
        date: NaiveDate,
        data: &Value,
    ) -> Result<(), AppError> {
        let mut records = self.records.write().await;
        records.insert((city_id, kind, date), data.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let repository = InMemoryRepository::with_default_locations().await;

        let location = repository.location_by_city("lONDON").await.unwrap().unwrap();
        assert_eq!(location.city, "London");
        assert_eq!(location.lat, 51.5074);
        assert!(repository.location_by_city("Atlantis").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_favorite_is_conflict() {
        let repository = InMemoryRepository::with_default_locations().await;

        repository.add_favorite(7, 1).await.unwrap();
        let err = repository.add_favorite(7, 1).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // another user may favorite the same city
        repository.add_favorite(8, 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_favorite_for_unknown_city_is_not_found() {
        let repository = InMemoryRepository::with_default_locations().await;

        let err = repository.add_favorite(7, 99).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_favorites_paginate() {
        let repository = InMemoryRepository::with_default_locations().await;
        for user_id in 1..=4 {
            repository.add_favorite(user_id, 2).await.unwrap();
        }

        assert_eq!(repository.list_favorites(3, 0).await.unwrap().len(), 3);
        assert_eq!(repository.list_favorites(3, 3).await.unwrap().len(), 1);
        assert!(repository.list_favorites(3, 6).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_record_for_same_day() {
        let repository = InMemoryRepository::new();
        let date = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();

        repository
            .upsert_weather_record(1, WeatherKind::Current, date, &json!({ "temperature": 18 }))
            .await
            .unwrap();
        repository
            .upsert_weather_record(1, WeatherKind::Current, date, &json!({ "temperature": 20 }))
            .await
            .unwrap();

        assert_eq!(
            repository
                .find_weather_record(1, WeatherKind::Current, date)
                .await
                .unwrap(),
            Some(json!({ "temperature": 20 }))
        );
        assert!(
            repository
                .find_weather_record(1, WeatherKind::Forecast, date)
                .await
                .unwrap()
                .is_none()
        );
    }
}
