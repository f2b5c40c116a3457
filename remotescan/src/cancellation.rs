//! Cancellation token for cooperative cancellation.
//!
//! The orchestration blocks in exactly two places: the inter-retry wait and
//! the inter-poll wait. Both go through
//! [`CancelToken::sleep_unless_cancelled`], and every remote call is guarded
//! by a token check, so a cancellation terminates the whole operation rather
//! than just the current wait.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::errors::AdapterError;

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
    notify: Notify,
}

/// A token for cooperative cancellation.
///
/// Cancellation is idempotent - only the first cancellation reason is kept.
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    /// Creates a new token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation with a reason.
    ///
    /// This is idempotent - only the first reason is kept. All pending and
    /// future sleeps on this token return immediately.
    pub fn cancel(&self, reason: impl Into<String>) {
        if self
            .inner
            .cancelled
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            *self.inner.reason.write() = Some(reason.into());
            self.inner.notify.notify_waiters();
        }
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.inner.reason.read().clone()
    }

    /// Sleeps for `duration`, waking early on cancellation.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the token was
    /// cancelled before or during the sleep.
    pub async fn sleep_unless_cancelled(&self, duration: Duration) -> bool {
        // Register the waiter before the flag check so a concurrent cancel
        // cannot slip between check and await.
        let notified = self.inner.notify.notified();
        if self.is_cancelled() {
            return false;
        }
        tokio::select! {
            () = notified => false,
            () = tokio::time::sleep(duration) => !self.is_cancelled(),
        }
    }

    /// Builds the error describing this token's cancellation.
    #[must_use]
    pub fn interruption_error(&self) -> AdapterError {
        AdapterError::Interrupted {
            reason: self
                .reason()
                .unwrap_or_else(|| "cancellation requested".to_string()),
        }
    }
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn token_default_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.reason().is_none());
    }

    #[test]
    fn cancel_is_idempotent_first_reason_wins() {
        let token = CancelToken::new();
        token.cancel("first reason");
        token.cancel("second reason");

        assert!(token.is_cancelled());
        assert_eq!(token.reason(), Some("first reason".to_string()));
    }

    #[test]
    fn clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel("shutdown");
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn sleep_completes_when_not_cancelled() {
        let token = CancelToken::new();
        assert!(token.sleep_unless_cancelled(Duration::from_millis(5)).await);
    }

    #[tokio::test]
    async fn sleep_returns_immediately_when_already_cancelled() {
        let token = CancelToken::new();
        token.cancel("stop");

        let started = Instant::now();
        let completed = token.sleep_unless_cancelled(Duration::from_secs(60)).await;

        assert!(!completed);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn sleep_wakes_early_on_cancellation() {
        let token = CancelToken::new();
        let sleeper = token.clone();

        let handle = tokio::spawn(async move {
            sleeper.sleep_unless_cancelled(Duration::from_secs(60)).await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        let started = Instant::now();
        token.cancel("user abort");

        let completed = handle.await.unwrap();
        assert!(!completed);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn interruption_error_carries_reason() {
        let token = CancelToken::new();
        token.cancel("shutdown requested");

        let error = token.interruption_error();
        assert!(error.to_string().contains("shutdown requested"));
    }
}
