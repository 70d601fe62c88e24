//! Debounced background cleanup
//!
//! Appends send a signal on a capacity-1 channel; a burst of appends
//! collapses into a single pending signal. Each received signal re-arms the
//! timer to `now + debounce`, and the policy only runs once the timer fires
//! without being pushed back again.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::cleanup::CleanupPolicy;
use crate::record::Record;

/// Stand-in deadline for a debounce too large to add to the clock
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

fn deadline_after(debounce: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(debounce).unwrap_or_else(|| now + FAR_FUTURE)
}

pub(crate) struct CleanupWorker {
    pub(crate) records: Arc<RwLock<Vec<Record>>>,
    pub(crate) policy: CleanupPolicy,
    pub(crate) debounce: Duration,
    pub(crate) signals: mpsc::Receiver<()>,
    pub(crate) cancellation: CancellationToken,
}

impl CleanupWorker {
    pub(crate) async fn run(mut self) {
        tracing::debug!(
            policy = %self.policy.name(),
            debounce = ?self.debounce,
            "Cleanup worker started"
        );

        let timer = tokio::time::sleep(self.debounce);
        tokio::pin!(timer);
        let mut armed = false;

        loop {
            tokio::select! {
                biased;

                _ = self.cancellation.cancelled() => {
                    tracing::debug!("Cleanup worker cancelled");
                    break;
                }

                _ = &mut timer, if armed => {
                    armed = false;
                    self.cleanup().await;
                }

                signal = self.signals.recv() => match signal {
                    Some(()) => {
                        timer.as_mut().reset(deadline_after(self.debounce));
                        armed = true;
                    }
                    None => {
                        tracing::debug!("Record store dropped, cleanup worker exiting");
                        break;
                    }
                },
            }
        }
    }

    /// Run the policy once, containing a panic so later signals still clean up
    async fn cleanup(&self) {
        let mut records = self.records.write().await;
        if records.is_empty() {
            return;
        }

        let before = records.len();
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.policy.apply(&mut records);
        }));

        match outcome {
            Ok(()) => tracing::debug!(
                policy = %self.policy.name(),
                before,
                after = records.len(),
                "Debounced cleanup completed"
            ),
            Err(_) => tracing::error!(
                policy = %self.policy.name(),
                records = records.len(),
                "Cleanup policy panicked; records left as the policy left them"
            ),
        }
    }
}
