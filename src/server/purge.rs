use crate::domain_port::*;
use crate::logger::*;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Periodically deletes refresh token rows that expired more than
/// `retention` ago. Revoked rows go once they are past expiry too.
pub struct ExpiredTokenPurger {
    store: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    retention: chrono::Duration,
    cancellation_token: CancellationToken,
}

impl ExpiredTokenPurger {
    pub fn new(
        store: Arc<dyn RefreshTokenStore>,
        clock: Arc<dyn Clock>,
        interval: Duration,
        retention: chrono::Duration,
        cancellation_token: CancellationToken,
    ) -> Self {
        Self {
            store,
            clock,
            interval,
            retention,
            cancellation_token,
        }
    }

    pub async fn tick_once(&self) -> Result<u64, StoreError> {
        let before = self.clock.now() - self.retention;
        self.store.purge_expired(before).await
    }

    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancellation_token.cancelled() => {
                    info!("purger shutting down...");
                    break;
                }
                _ = ticker.tick() => {
                    match self.tick_once().await {
                        Ok(0) => {}
                        Ok(purged) => info!(purged, "purged expired refresh tokens"),
                        Err(e) => error!("purger error: {}", e),
                    }
                }
            }
        }
    }
}
