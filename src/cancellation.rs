use crate::error::StaleSession;
use std::future::Future;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::Notify;

/// Per-session cancellation flag that async work can also await.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    inner: Arc<TokenState>,
}

#[derive(Debug, Default)]
struct TokenState {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            self.inner.notify.notify_waiters();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    pub fn check_cancelled(&self, stage: &'static str) -> Result<(), StaleSession> {
        if self.is_cancelled() {
            return Err(StaleSession { stage });
        }
        Ok(())
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before reading the flag so a concurrent cancel cannot slip between.
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }

    /// Drive `fut` to completion unless the token fires first, in which case
    /// the future is dropped (aborting any request it owns) and `None` is
    /// returned.
    pub async fn run_until_cancelled<F>(&self, fut: F) -> Option<F::Output>
    where
        F: Future,
    {
        if self.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => None,
            out = fut => Some(out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_cancelled_reports_stage() {
        let token = CancellationToken::new();
        assert!(token.check_cancelled("resolve").is_ok());
        token.cancel();
        assert_eq!(
            token.check_cancelled("resolve"),
            Err(StaleSession { stage: "resolve" })
        );
    }

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn run_until_cancelled_drops_pending_future() {
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move {
                token
                    .run_until_cancelled(std::future::pending::<()>())
                    .await
            })
        };
        tokio::task::yield_now().await;
        token.cancel();
        let out = waiter.await.expect("waiter task should not panic");
        assert_eq!(out, None);
    }

    #[tokio::test]
    async fn run_until_cancelled_passes_through_ready_output() {
        let token = CancellationToken::new();
        let out = token.run_until_cancelled(async { 7 }).await;
        assert_eq!(out, Some(7));
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_work() {
        let token = CancellationToken::new();
        token.cancel();
        let out = token.run_until_cancelled(async { 7 }).await;
        assert_eq!(out, None);
    }
}
