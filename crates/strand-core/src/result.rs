//! # Future-Backed Results
//!
//! A repository call run on a background task, observed through a bounded
//! wait. A waiter either receives the computed outcome or
//! `StrandError::ResultTimeout`; it never sees a default value.

use crate::repository::Outcome;
use crate::types::StrandError;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;

type Slot = Option<Result<Outcome, StrandError>>;

/// Handle to a result computed in the background.
#[derive(Debug, Clone)]
pub struct PendingResult {
    rx: watch::Receiver<Slot>,
}

impl PendingResult {
    /// Run `task` on the current tokio runtime's blocking pool.
    pub(crate) fn spawn<F>(task: F) -> Result<Self, StrandError>
    where
        F: FnOnce() -> Result<Outcome, StrandError> + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|e| StrandError::Runtime(e.to_string()))?;
        let (tx, rx) = watch::channel(None);
        handle.spawn_blocking(move || {
            if tx.send(Some(task())).is_err() {
                tracing::debug!("result dropped before completion");
            }
        });
        Ok(Self { rx })
    }

    /// Check if the background task has finished.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_some()
    }

    /// Wait at most `timeout` for the outcome.
    pub async fn wait(&self, timeout: Duration) -> Result<Outcome, StrandError> {
        let mut rx = self.rx.clone();
        let waited = tokio::time::timeout(timeout, rx.wait_for(Option::is_some)).await;
        match waited {
            Err(_) => Err(StrandError::ResultTimeout {
                waited_ms: timeout.as_millis() as u64,
            }),
            Ok(Err(_)) => Err(StrandError::ResultUnavailable(
                "background task ended without a result".to_string(),
            )),
            Ok(Ok(slot)) => match &*slot {
                Some(result) => result.clone(),
                None => Err(StrandError::ResultUnavailable("empty result".to_string())),
            },
        }
    }
}
