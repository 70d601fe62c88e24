//! Log collection
//!
//! [`LogCollector`] is a [`Handler`] that stores every event it sees as a
//! [`Record`] and optionally forwards the event live to a downstream handler.
//! Each `with_attrs` / `with_group` call returns a new collector that shares
//! the same store and extends a copy of the parent's [`Journal`], so the
//! exact derivation chain can be replayed later.
//!
//! # Example
//!
//! ```rust,no_run
//! use loglater_core::prelude::*;
//!
//! # async fn run() -> loglater_core::error::Result<()> {
//! let collector = LogCollector::new(None);
//! let logger = Logger::new(collector.clone())
//!     .with(vec![Attr::new("service", "billing")])
//!     .with_group("request");
//!
//! logger.info("charged", vec![Attr::new("amount", 42)]).await?;
//!
//! // Decide later where the logs go
//! let sink: std::sync::Arc<dyn Handler> = std::sync::Arc::new(TracingHandler::new());
//! collector.play_logs(Some(sink)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use crate::attr::Attr;
use crate::error::Result;
use crate::event::{Event, Level};
use crate::handler::Handler;
use crate::journal::{Journal, Operation};
use crate::record::Record;
use crate::replay::{ReplayContext, replay};
use crate::storage::{RecordStore, Storage};

/// Captures events for later replay
pub struct LogCollector {
    store: Arc<dyn Storage>,
    handler: Option<Arc<dyn Handler>>,
    journal: Journal,
}

impl LogCollector {
    /// Create a collector over a fresh unbounded [`RecordStore`]
    ///
    /// With `handler` set, every event is also forwarded to it as it happens.
    pub fn new(handler: Option<Arc<dyn Handler>>) -> Arc<Self> {
        Self::builder().handler_opt(handler).build()
    }

    /// Start configuring a collector
    pub fn builder() -> LogCollectorBuilder {
        LogCollectorBuilder::default()
    }

    /// The store shared by this collector and everything derived from it
    pub fn store(&self) -> &Arc<dyn Storage> {
        &self.store
    }

    /// The operations that produced this collector
    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Stored records with their journals applied
    ///
    /// Each record carries every attribute it would have when replayed,
    /// nested under the groups that were open when it was captured.
    pub async fn get_logs(&self) -> Vec<Record> {
        self.store
            .get_all()
            .await
            .iter()
            .map(Record::realize)
            .collect()
    }

    /// Replay every stored record to `handler`
    ///
    /// # Errors
    ///
    /// Returns [`LogLaterError::HandlerRequired`](crate::error::LogLaterError::HandlerRequired)
    /// without a handler, or the first error the handler returns.
    pub async fn play_logs(&self, handler: Option<Arc<dyn Handler>>) -> Result<()> {
        self.play_logs_with(handler, &ReplayContext::default()).await
    }

    /// Replay every stored record to `handler`, stopping early when `ctx` is
    /// cancelled or its deadline passes
    pub async fn play_logs_with(
        &self,
        handler: Option<Arc<dyn Handler>>,
        ctx: &ReplayContext,
    ) -> Result<()> {
        let records = self.store.get_all().await;
        replay(&records, handler, ctx).await.map(|_| ())
    }

    fn derive(&self, op: Operation, handler: Option<Arc<dyn Handler>>) -> Arc<LogCollector> {
        Arc::new(LogCollector {
            store: Arc::clone(&self.store),
            handler,
            journal: self.journal.push(op),
        })
    }
}

#[async_trait]
impl Handler for LogCollector {
    fn enabled(&self, level: Level) -> bool {
        match &self.handler {
            Some(handler) => handler.enabled(level),
            None => true,
        }
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        let record = Record::from_event(event, self.journal.clone()).inspect_err(|e| {
            tracing::warn!(error = %e, message = %event.message, "Dropping malformed event");
        })?;
        self.store.append(record).await;

        match &self.handler {
            Some(handler) => handler.handle(event).await,
            None => Ok(()),
        }
    }

    fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        if attrs.is_empty() {
            return self;
        }
        let handler = self
            .handler
            .as_ref()
            .map(|handler| Arc::clone(handler).with_attrs(attrs.clone()));
        self.derive(Operation::attrs(attrs), handler)
    }

    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
        if name.is_empty() {
            return self;
        }
        let handler = self
            .handler
            .as_ref()
            .map(|handler| Arc::clone(handler).with_group(name));
        self.derive(Operation::group(name), handler)
    }
}

/// Builder for [`LogCollector`]
#[derive(Default)]
pub struct LogCollectorBuilder {
    store: Option<Arc<dyn Storage>>,
    handler: Option<Arc<dyn Handler>>,
}

impl LogCollectorBuilder {
    /// Forward events live to `handler`
    pub fn handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    fn handler_opt(mut self, handler: Option<Arc<dyn Handler>>) -> Self {
        self.handler = handler;
        self
    }

    /// Store records in `store` instead of a fresh [`RecordStore`]
    pub fn storage(mut self, store: Arc<dyn Storage>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Arc<LogCollector> {
        Arc::new(LogCollector {
            store: self
                .store
                .unwrap_or_else(|| Arc::new(RecordStore::new()) as Arc<dyn Storage>),
            handler: self.handler,
            journal: Journal::new(),
        })
    }
}
