//! The handler capability set
//!
//! Anything implementing [`Handler`] can sit downstream of a
//! [`LogCollector`](crate::collector::LogCollector), receive replayed records,
//! or be driven directly by a [`Logger`](crate::logger::Logger).

use async_trait::async_trait;
use std::sync::Arc;

use crate::attr::Attr;
use crate::error::Result;
use crate::event::{Event, Level};

/// A structured log handler
///
/// Derivation (`with_attrs` / `with_group`) returns a new handler and must
/// leave the receiver untouched, since other branches may still be using it.
/// Implementations that have nothing to add may return `self`.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Whether events at `level` would be handled
    fn enabled(&self, level: Level) -> bool;

    /// Handle one event
    async fn handle(&self, event: &Event) -> Result<()>;

    /// A handler whose output carries `attrs` in addition to each event's own
    fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler>;

    /// A handler that nests all subsequent attributes under `name`
    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler>;
}
