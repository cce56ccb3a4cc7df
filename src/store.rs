use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::models::Session;
use crate::momence::{MomenceClient, MomenceError};

/// The last successfully fetched session list.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub sessions: Arc<Vec<Session>>,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Set when the most recent refresh failed; `sessions` is then stale.
    pub last_error: Option<String>,
}

impl Snapshot {
    pub fn is_loaded(&self) -> bool {
        self.fetched_at.is_some()
    }
}

/// Holds the session list between requests.
///
/// A failed refresh never clears what was loaded before.
#[derive(Default)]
pub struct SessionStore {
    inner: RwLock<Snapshot>,
    /// Held while the first load runs so concurrent callers share it.
    first_load: Mutex<()>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, sessions: Vec<Session>, now: DateTime<Utc>) -> usize {
        let mut inner = self.inner.write().await;
        let count = sessions.len();
        *inner = Snapshot {
            sessions: Arc::new(sessions),
            fetched_at: Some(now),
            last_error: None,
        };
        count
    }

    pub async fn record_failure(&self, err: &MomenceError) {
        warn!(error = %err, "session refresh failed, keeping last snapshot");
        self.inner.write().await.last_error = Some(err.to_string());
    }

    pub async fn refresh(
        &self,
        client: &MomenceClient,
        now: DateTime<Utc>,
    ) -> Result<usize, MomenceError> {
        match client.list_sessions(now).await {
            Ok(sessions) => {
                let count = self.replace(sessions, now).await;
                info!(count, "session list refreshed");
                Ok(count)
            }
            Err(err) => {
                self.record_failure(&err).await;
                Err(err)
            }
        }
    }

    /// Loads on first use, afterwards serves the stored snapshot.
    pub async fn current(
        &self,
        client: &MomenceClient,
        now: DateTime<Utc>,
    ) -> Result<Snapshot, MomenceError> {
        let snapshot = self.snapshot().await;
        if snapshot.is_loaded() {
            return Ok(snapshot);
        }

        let _loading = self.first_load.lock().await;
        let snapshot = self.snapshot().await;
        if snapshot.is_loaded() {
            return Ok(snapshot);
        }
        self.refresh(client, now).await?;
        Ok(self.snapshot().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{at, session};

    #[tokio::test]
    async fn test_failure_keeps_previous_sessions() {
        let store = SessionStore::new();
        assert!(!store.snapshot().await.is_loaded());

        let now = at("2025-01-10T09:30:00Z");
        store
            .replace(
                vec![session(1, "Yoga Flow", "2025-01-10T09:00:00Z", "2025-01-10T10:00:00Z")],
                now,
            )
            .await;
        store
            .record_failure(&MomenceError::UnexpectedContent("text/html".to_string()))
            .await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.sessions.len(), 1);
        assert_eq!(snapshot.fetched_at, Some(now));
        assert_eq!(
            snapshot.last_error.as_deref(),
            Some("Expected JSON but got text/html")
        );
    }

    #[tokio::test]
    async fn test_successful_replace_clears_error() {
        let store = SessionStore::new();
        store
            .record_failure(&MomenceError::UnexpectedContent("text/html".to_string()))
            .await;
        store.replace(Vec::new(), at("2025-01-10T09:30:00Z")).await;
        let snapshot = store.snapshot().await;
        assert!(snapshot.is_loaded());
        assert!(snapshot.last_error.is_none());
    }
}
