pub mod api_client;
pub mod cache;
pub mod config;
pub mod db;
pub mod handlers;
pub mod memory;
pub mod openapi;
pub mod rate_limit;
pub mod refresh;
pub mod repository;
pub mod ttl;
pub mod weather;

use axum::{Router, middleware, routing::get};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use rate_limit::{RateLimitGuard, RateLimitPolicy, RateLimiter};

pub const CURRENT_WEATHER_POLICY: RateLimitPolicy = RateLimitPolicy::new(5, 30);
pub const WEATHER_FORECAST_POLICY: RateLimitPolicy = RateLimitPolicy::new(3, 30);

pub fn create_router(
    state: handlers::AppState,
    limiter: Arc<RateLimiter>,
    default_policy: RateLimitPolicy,
) -> Router {
    let current = RateLimitGuard::per_operation(
        limiter.clone(),
        "current_weather",
        CURRENT_WEATHER_POLICY,
    );
    let forecast = RateLimitGuard::per_operation(
        limiter.clone(),
        "weather_forecast",
        WEATHER_FORECAST_POLICY,
    );
    let default = RateLimitGuard::per_client(limiter, default_policy);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/weather/{city}",
            get(handlers::get_current_weather)
                .layer(middleware::from_fn_with_state(current, rate_limit::enforce)),
        )
        .route(
            "/api/weather/forecast/{city}",
            get(handlers::get_weather_forecast)
                .layer(middleware::from_fn_with_state(forecast, rate_limit::enforce)),
        )
        .route(
            "/api/locations",
            get(handlers::list_locations)
                .layer(middleware::from_fn_with_state(default, rate_limit::enforce)),
        )
        .merge(openapi::swagger_ui())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
