use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Which flavour of weather data a request is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WeatherKind {
    Current,
    Forecast,
}

impl WeatherKind {
    pub const ALL: [WeatherKind; 2] = [WeatherKind::Current, WeatherKind::Forecast];

    pub fn as_str(&self) -> &'static str {
        match self {
            WeatherKind::Current => "current",
            WeatherKind::Forecast => "forecast",
        }
    }
}

impl fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A city known to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Location {
    pub id: i32,
    pub city: String,
    pub country: String,
    pub lat: f64,
    pub lng: f64,
}

/// A location a user has marked as favorite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteLocation {
    pub id: i32,
    pub user_id: i32,
    pub location: Location,
}

/// Weather envelope returned to clients and stored in the cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeatherResponse {
    pub city: String,
    pub lat: f64,
    pub lng: f64,
    #[schema(value_type = Object)]
    pub weather_data: serde_json::Value,
}

impl WeatherResponse {
    pub fn new(location: &Location, weather_data: serde_json::Value) -> Self {
        Self {
            city: location.city.clone(),
            lat: location.lat,
            lng: location.lng,
            weather_data,
        }
    }
}

/// True when an upstream or persisted payload carries no data.
pub fn is_empty_payload(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
