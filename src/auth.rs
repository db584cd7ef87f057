use std::future::Future;

use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::error::FlightError;

#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub expires_in: Duration,
}

#[derive(Debug)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Provider access token with its expiry. Owned by whoever talks to the
/// provider and passed in, never global.
#[derive(Debug, Default)]
pub struct CredentialCache {
    slot: Mutex<Option<CachedToken>>,
}

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached token while it is valid, otherwise runs `refresh`
    /// and caches its result. Concurrent callers wait on the same refresh
    /// instead of issuing their own.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, FlightError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<AccessToken, FlightError>>,
    {
        let mut slot = self.slot.lock().await;
        let now = Instant::now();

        if let Some(token) = slot.as_ref() {
            if now < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = refresh().await?;
        tracing::debug!(expires_in = ?fresh.expires_in, "refreshed provider access token");
        *slot = Some(CachedToken {
            value: fresh.value.clone(),
            expires_at: now + fresh.expires_in,
        });
        Ok(fresh.value)
    }

    pub async fn invalidate(&self) {
        self.slot.lock().await.take();
    }
}
