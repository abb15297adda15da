use axum::{
    extract::{Path, State},
    response::Json,
};
use common::errors::AppError;
use common::models::{Location, WeatherResponse};
use std::sync::Arc;
use tracing::info;

use crate::repository::LocationRepository;
use crate::weather::WeatherCache;

#[derive(Clone)]
pub struct AppState {
    pub weather: Arc<WeatherCache>,
    pub locations: Arc<dyn LocationRepository>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health check")
    )
)]
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "weather-service" }))
}

#[utoipa::path(
    get,
    path = "/api/weather/{city}",
    params(
        ("city" = String, Path, description = "City name", example = "London")
    ),
    responses(
        (status = 200, description = "Current weather for the city", body = WeatherResponse),
        (status = 404, description = "City not found or no weather data"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Upstream or internal error")
    ),
    tag = "weather"
)]
pub async fn get_current_weather(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<WeatherResponse>, AppError> {
    info!(city = %city, "Current weather request received");

    let weather = state.weather.get_current_weather(&city).await?;

    Ok(Json(weather))
}

#[utoipa::path(
    get,
    path = "/api/weather/forecast/{city}",
    params(
        ("city" = String, Path, description = "City name", example = "London")
    ),
    responses(
        (status = 200, description = "Daily forecast for the city", body = WeatherResponse),
        (status = 404, description = "City not found or no forecast data"),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Upstream or internal error")
    ),
    tag = "weather"
)]
pub async fn get_weather_forecast(
    State(state): State<AppState>,
    Path(city): Path<String>,
) -> Result<Json<WeatherResponse>, AppError> {
    info!(city = %city, "Forecast request received");

    let forecast = state.weather.get_weather_forecast(&city).await?;

    Ok(Json(forecast))
}

#[utoipa::path(
    get,
    path = "/api/locations",
    responses(
        (status = 200, description = "All known locations", body = Vec<Location>),
        (status = 429, description = "Rate limit exceeded")
    ),
    tag = "locations"
)]
pub async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Location>>, AppError> {
    let locations = state.locations.list_locations().await?;

    Ok(Json(locations))
}
