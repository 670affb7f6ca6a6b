use crate::{
    model::{Error, PersistedQuote},
    repository::{InsertGuard, QuoteRepository},
};
use chrono::Utc;
use serde::Deserialize;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::{self, JoinError},
    time::timeout,
};
use tracing::warn;

#[derive(Clone, Debug, Deserialize)]
pub struct StoreConf {
    pub timeout_ms: u64,
}

impl StoreConf {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Best-effort quote persistence with a tight deadline.
#[derive(Clone)]
pub struct RateStore {
    repo: QuoteRepository,
    timeout: Duration,
}

impl RateStore {
    pub fn new(repo: QuoteRepository, conf: &StoreConf) -> RateStore {
        RateStore {
            repo: repo,
            timeout: conf.timeout(),
        }
    }

    /// A write still in flight when the deadline passes is interrupted and
    /// rolled back. If it already reached its commit, that outcome is
    /// returned instead.
    pub async fn save(&self, value: &str) -> Result<PersistedQuote, Error> {
        let guard = Arc::new(InsertGuard::new());
        let mut insert = {
            let repo = self.repo.clone();
            let guard = guard.clone();
            let value = value.to_string();
            task::spawn_blocking(move || repo.insert(&value, Utc::now(), &guard))
        };

        match timeout(self.timeout, &mut insert).await {
            Ok(joined) => flatten(joined),
            Err(_) if guard.cancel() => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "Quote write cancelled");
                Err(Error::StorageWriteFailed(format!(
                    "no confirmation within {}ms",
                    self.timeout.as_millis()
                )))
            }
            Err(_) => flatten(insert.await),
        }
    }
}

fn flatten(
    joined: Result<Result<PersistedQuote, Error>, JoinError>,
) -> Result<PersistedQuote, Error> {
    joined.map_err(|e| Error::StorageWriteFailed(e.to_string()))?
}
