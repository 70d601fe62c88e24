//! Replaying captured records
//!
//! [`replay`] pushes stored records through an arbitrary [`Handler`]. For
//! every record it rebuilds the handler chain the record was captured under
//! by applying its journal to the target (`Attrs` becomes `with_attrs`,
//! `Group` becomes `with_group`), then hands that derived handler an event
//! rebuilt from the record.
//!
//! Replay is forward-only: records already handed to the target stay
//! handed over when a later record fails or the context is cancelled.

use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{LogLaterError, Result};
use crate::handler::Handler;
use crate::journal::Operation;
use crate::record::Record;

/// Cancellation and deadline for a replay
#[derive(Debug, Clone, Default)]
pub struct ReplayContext {
    /// Cancellation token, checked before each record
    pub cancellation: Option<CancellationToken>,

    /// Deadline, checked before each record
    pub deadline: Option<Instant>,
}

impl ReplayContext {
    /// Create a context that never cancels
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Set an absolute deadline
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Set a deadline relative to now
    ///
    /// A timeout too large to represent leaves the context without a deadline.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// Check if cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(|t| t.is_cancelled())
            .unwrap_or(false)
    }

    /// The error replay should stop with, if any
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(LogLaterError::Canceled);
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(LogLaterError::DeadlineExceeded);
        }
        Ok(())
    }
}

/// Rebuild the handler chain described by `record`'s journal on top of `target`
pub fn derive_for(target: &Arc<dyn Handler>, record: &Record) -> Arc<dyn Handler> {
    record
        .journal
        .iter()
        .fold(Arc::clone(target), |handler, op| match op {
            Operation::Attrs { attrs } => handler.with_attrs(attrs.clone()),
            Operation::Group { name } => handler.with_group(name),
            Operation::Unknown => handler,
        })
}

/// Replay `records` in order to `target`
///
/// Returns the number of records handed to the target.
///
/// # Errors
///
/// - [`LogLaterError::HandlerRequired`] if `target` is `None`
/// - [`LogLaterError::Canceled`] / [`LogLaterError::DeadlineExceeded`] if `ctx`
///   stops the replay before a record
/// - whatever the target's `handle` returns, unchanged
pub async fn replay(
    records: &[Record],
    target: Option<Arc<dyn Handler>>,
    ctx: &ReplayContext,
) -> Result<usize> {
    let target = target.ok_or(LogLaterError::HandlerRequired)?;

    for (index, record) in records.iter().enumerate() {
        if let Err(e) = ctx.check() {
            tracing::debug!(
                forwarded = index,
                remaining = records.len() - index,
                reason = %e,
                "Replay stopped"
            );
            return Err(e);
        }

        let handler = derive_for(&target, record);
        handler.handle(&record.to_event()).await?;
    }

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Attr;
    use crate::event::{Event, Level};
    use crate::journal::Journal;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the derivation path each handled event went through
    struct PathHandler {
        path: Vec<String>,
        out: Arc<Mutex<Vec<(Vec<String>, String)>>>,
        fail_on: Option<String>,
    }

    impl PathHandler {
        fn root(fail_on: Option<&str>) -> (Arc<dyn Handler>, Arc<Mutex<Vec<(Vec<String>, String)>>>) {
            let out = Arc::new(Mutex::new(Vec::new()));
            let handler: Arc<dyn Handler> = Arc::new(PathHandler {
                path: Vec::new(),
                out: out.clone(),
                fail_on: fail_on.map(str::to_string),
            });
            (handler, out)
        }

        fn extend(&self, step: String) -> Arc<dyn Handler> {
            let mut path = self.path.clone();
            path.push(step);
            Arc::new(PathHandler {
                path,
                out: self.out.clone(),
                fail_on: self.fail_on.clone(),
            })
        }
    }

    #[async_trait]
    impl Handler for PathHandler {
        fn enabled(&self, _level: Level) -> bool {
            true
        }

        async fn handle(&self, event: &Event) -> Result<()> {
            if self.fail_on.as_deref() == Some(event.message.as_str()) {
                return Err(LogLaterError::handler(format!("refused {}", event.message)));
            }
            self.out
                .lock()
                .unwrap()
                .push((self.path.clone(), event.message.clone()));
            Ok(())
        }

        fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler> {
            let keys: Vec<_> = attrs.iter().map(|a| a.key.as_str()).collect();
            self.extend(format!("attrs:{}", keys.join(",")))
        }

        fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
            self.extend(format!("group:{}", name))
        }
    }

    fn record(message: &str, journal: Journal) -> Record {
        Record::from_event(&Event::new(Level::INFO, message), journal).unwrap()
    }

    #[tokio::test]
    async fn test_requires_handler() {
        let err = replay(&[], None, &ReplayContext::new()).await.unwrap_err();
        assert!(matches!(err, LogLaterError::HandlerRequired));
    }

    #[tokio::test]
    async fn test_empty_records() {
        let (handler, out) = PathHandler::root(None);
        let count = replay(&[], Some(handler), &ReplayContext::new()).await.unwrap();
        assert_eq!(count, 0);
        assert!(out.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rebuilds_each_journal() {
        let grouped = Journal::new()
            .push(Operation::attrs(vec![Attr::new("a", 1)]))
            .push(Operation::group("g"));
        let records = vec![
            record("plain", Journal::new()),
            record("grouped", grouped.clone()),
            record("unknown", grouped.push(Operation::Unknown)),
        ];
        let (handler, out) = PathHandler::root(None);

        let count = replay(&records, Some(handler), &ReplayContext::new()).await.unwrap();

        assert_eq!(count, 3);
        let out = out.lock().unwrap();
        assert_eq!(out[0], (vec![], "plain".to_string()));
        assert_eq!(
            out[1],
            (vec!["attrs:a".to_string(), "group:g".to_string()], "grouped".to_string())
        );
        assert_eq!(out[2].0, out[1].0);
    }

    #[tokio::test]
    async fn test_handler_error_stops_replay() {
        let records = vec![
            record("one", Journal::new()),
            record("two", Journal::new()),
            record("three", Journal::new()),
        ];
        let (handler, out) = PathHandler::root(Some("two"));

        let err = replay(&records, Some(handler), &ReplayContext::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Handler error: refused two");
        let messages: Vec<_> = out.lock().unwrap().iter().map(|(_, m)| m.clone()).collect();
        assert_eq!(messages, vec!["one"]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = ReplayContext::new().with_cancellation(token);
        let (handler, out) = PathHandler::root(None);

        let err = replay(&[record("never", Journal::new())], Some(handler), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, LogLaterError::Canceled));
        assert!(out.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_exceeded() {
        let ctx = ReplayContext::new().with_timeout(std::time::Duration::from_millis(10));
        tokio::time::advance(std::time::Duration::from_millis(20)).await;
        let (handler, _out) = PathHandler::root(None);

        let err = replay(&[record("late", Journal::new())], Some(handler), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, LogLaterError::DeadlineExceeded));
        assert!(err.is_cancellation());
    }

    #[tokio::test]
    async fn test_unbounded_timeout_means_no_deadline() {
        let ctx = ReplayContext::new().with_timeout(std::time::Duration::MAX);
        assert!(ctx.deadline.is_none());

        let (handler, out) = PathHandler::root(None);
        let count = replay(&[record("kept", Journal::new())], Some(handler), &ctx)
            .await
            .unwrap();

        assert_eq!(count, 1);
        assert_eq!(out.lock().unwrap().len(), 1);
    }

    /// Cancels its token from inside the first `handle` call
    struct CancellingHandler {
        token: CancellationToken,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Handler for CancellingHandler {
        fn enabled(&self, _level: Level) -> bool {
            true
        }

        async fn handle(&self, event: &Event) -> Result<()> {
            self.seen.lock().unwrap().push(event.message.clone());
            self.token.cancel();
            Ok(())
        }

        fn with_attrs(self: Arc<Self>, _attrs: Vec<Attr>) -> Arc<dyn Handler> {
            self
        }

        fn with_group(self: Arc<Self>, _name: &str) -> Arc<dyn Handler> {
            self
        }
    }

    #[tokio::test]
    async fn test_cancelled_mid_replay_stops_at_next_record() {
        let token = CancellationToken::new();
        let handler = Arc::new(CancellingHandler {
            token: token.clone(),
            seen: Mutex::new(Vec::new()),
        });
        let records = vec![
            record("1", Journal::new()),
            record("2", Journal::new()),
            record("3", Journal::new()),
        ];
        let ctx = ReplayContext::new().with_cancellation(token);

        let err = replay(&records, Some(handler.clone()), &ctx)
            .await
            .unwrap_err();

        assert!(matches!(err, LogLaterError::Canceled));
        assert_eq!(*handler.seen.lock().unwrap(), vec!["1".to_string()]);
    }
}
