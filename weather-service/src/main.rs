use common::tracing::init_tracing_for;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use weather_service::api_client::WeatherFetcher;
use weather_service::cache::{CacheStore, MemoryCacheStore};
use weather_service::config::Config;
use weather_service::db;
use weather_service::handlers::AppState;
use weather_service::memory::InMemoryRepository;
use weather_service::rate_limit::RateLimiter;
use weather_service::refresh::RefreshScheduler;
use weather_service::repository::{LocationRepository, WeatherRepository};
use weather_service::weather::WeatherCache;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    init_tracing_for(&config.log_format);

    let cancellation_token = CancellationToken::new();

    let (locations, records): (Arc<dyn LocationRepository>, Arc<dyn WeatherRepository>) =
        match &config.database_url {
            Some(url) => {
                let pool = db::create_pool(url).await?;
                let repository = Arc::new(db::PgRepository::new(pool));
                (
                    repository.clone() as Arc<dyn LocationRepository>,
                    repository as Arc<dyn WeatherRepository>,
                )
            }
            None => {
                warn!("DATABASE_URL not set, using in-memory repository");
                let repository = Arc::new(InMemoryRepository::with_default_locations().await);
                (
                    repository.clone() as Arc<dyn LocationRepository>,
                    repository as Arc<dyn WeatherRepository>,
                )
            }
        };

    if config.weather_api.api_key.is_empty() {
        warn!("WEATHER_API_KEY not set, upstream requests will be rejected");
    }

    let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
    let fetcher = Arc::new(WeatherFetcher::new(&config.weather_api)?);
    let weather = Arc::new(WeatherCache::new(
        locations.clone(),
        records,
        store.clone(),
        fetcher,
    ));
    let limiter = Arc::new(RateLimiter::new(store));

    if config.refresh_interval_secs > 0 {
        let scheduler = Arc::new(RefreshScheduler::new(locations.clone(), weather.clone()));
        scheduler.spawn_periodic(
            Duration::from_secs(config.refresh_interval_secs),
            cancellation_token.clone(),
        );
        info!(
            interval_secs = config.refresh_interval_secs,
            "Favorites refresh scheduled"
        );
    }

    let state = AppState { weather, locations };
    let app = weather_service::create_router(state, limiter, config.default_rate_limit);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Weather service starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(cancellation_token))
    .await?;

    info!("Weather service stopped");
    Ok(())
}

async fn shutdown_signal(cancellation_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown...");
        },
    }

    // Stop the background refresh task
    cancellation_token.cancel();
    warn!("Cancelled background tasks, shutting down gracefully...");
}
