use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// The server refused the refresh token; the caller has to log in again.
    #[error("refresh token rejected")]
    Unauthorized,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshedAccess {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}

#[async_trait::async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, ClientError>;
}

type InFlight = Shared<BoxFuture<'static, Result<RefreshedAccess, ClientError>>>;

#[derive(Default)]
struct Slot {
    generation: u64,
    in_flight: Option<InFlight>,
}

/// Collapses concurrent refresh attempts into a single request.
///
/// The first caller starts the request and parks it in a single slot; callers
/// arriving while it runs await the same future and receive the same result.
/// The slot is cleared once that request settles, whether it succeeded or not.
pub struct RefreshCoalescer {
    refresher: Arc<dyn TokenRefresher>,
    slot: Mutex<Slot>,
}

impl RefreshCoalescer {
    pub fn new(refresher: Arc<dyn TokenRefresher>) -> Self {
        Self {
            refresher,
            slot: Mutex::new(Slot::default()),
        }
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<RefreshedAccess, ClientError> {
        let (generation, in_flight) = {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            match &slot.in_flight {
                Some(in_flight) => {
                    debug!("joining in-flight refresh");
                    (slot.generation, in_flight.clone())
                }
                None => {
                    let refresher = self.refresher.clone();
                    let token = refresh_token.to_owned();
                    let in_flight = async move { refresher.refresh(&token).await }
                        .boxed()
                        .shared();
                    slot.generation += 1;
                    slot.in_flight = Some(in_flight.clone());
                    (slot.generation, in_flight)
                }
            }
        };

        let result = in_flight.await;

        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.generation == generation {
            slot.in_flight = None;
        }
        result
    }

    pub fn is_idle(&self) -> bool {
        self.slot
            .lock()
            .map(|slot| slot.in_flight.is_none())
            .unwrap_or(false)
    }
}
