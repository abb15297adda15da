use common::errors::AppError;
use common::models::WeatherKind;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::repository::LocationRepository;
use crate::weather::WeatherCache;

pub const FAVORITES_PAGE_SIZE: i64 = 10;

/// Outcome of one pass over the favorite locations
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub attempted: usize,
    pub refreshed: usize,
    pub failed: usize,
}

/// Batch job that re-fetches weather for every favorited location.
///
/// Pages and (location, kind) pairs are processed one at a time. A failing
/// item is logged and skipped; a failure to list a page aborts the run.
pub struct RefreshScheduler {
    locations: Arc<dyn LocationRepository>,
    weather: Arc<WeatherCache>,
    page_size: i64,
}

impl RefreshScheduler {
    pub fn new(locations: Arc<dyn LocationRepository>, weather: Arc<WeatherCache>) -> Self {
        Self {
            locations,
            weather,
            page_size: FAVORITES_PAGE_SIZE,
        }
    }

    #[instrument(skip(self))]
    pub async fn refresh_favorites(&self) -> Result<RefreshReport, AppError> {
        info!("Starting favorites refresh");

        let mut report = RefreshReport::default();
        let mut skip = 0;

        loop {
            let page = self.locations.list_favorites(self.page_size, skip).await?;
            if page.is_empty() {
                break;
            }

            for favorite in &page {
                for kind in WeatherKind::ALL {
                    report.attempted += 1;
                    match self.weather.refill(&favorite.location, kind).await {
                        Ok(_) => report.refreshed += 1,
                        Err(e) => {
                            report.failed += 1;
                            warn!(
                                city = %favorite.location.city,
                                kind = %kind,
                                error = %e,
                                "Failed to refresh favorite location"
                            );
                        }
                    }
                }
            }

            skip += page.len() as i64;
        }

        info!(
            attempted = report.attempted,
            refreshed = report.refreshed,
            failed = report.failed,
            "Favorites refresh completed"
        );
        Ok(report)
    }

    /// Run [`refresh_favorites`](Self::refresh_favorites) every `interval` until cancelled.
    pub fn spawn_periodic(
        self: Arc<Self>,
        interval: Duration,
        cancellation_token: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = self.refresh_favorites().await {
                            error!(error = %e, "Favorites refresh aborted");
                        }
                    }
                    _ = cancellation_token.cancelled() => {
                        info!("Favorites refresh task stopped");
                        return;
                    }
                }
            }
        })
    }
}
