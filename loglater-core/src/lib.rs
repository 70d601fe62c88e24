//! # LogLater - Capture Now, Decide Later
//!
//! LogLater captures structured log events in memory so they can be
//! inspected or replayed to any handler at a later point:
//! - Capture events together with the exact attribute/group derivation chain
//! - Bound memory with count-based, age-based or custom cleanup policies
//! - Run cleanup inline or on a debounced background worker
//! - Replay captured records into any [`Handler`](handler::Handler)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use loglater_core::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Capture without forwarding anywhere yet
//!     let collector = LogCollector::new(None);
//!     let logger = Logger::new(collector.clone()).with_group("job");
//!
//!     logger.info("started", vec![Attr::new("id", 7)]).await?;
//!
//!     // Inspect what was captured
//!     for record in collector.get_logs().await {
//!         println!("{} {:?}", record.message, record.attrs);
//!     }
//!
//!     // Then replay it as JSON
//!     let sink: Arc<dyn Handler> = Arc::new(JsonHandler::stdout());
//!     collector.play_logs(Some(sink)).await?;
//!     Ok(())
//! }
//! ```

pub mod attr;
pub mod collector;
pub mod config;
pub mod error;
pub mod event;
pub mod handler;
pub mod handlers;
pub mod journal;
pub mod logger;
pub mod record;
pub mod replay;
pub mod storage;

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Re-export commonly used types
pub mod prelude {
    pub use crate::attr::{Attr, Value};
    pub use crate::collector::{LogCollector, LogCollectorBuilder};
    pub use crate::config::StoreConfig;
    pub use crate::error::{LogLaterError, Result};
    pub use crate::event::{CallSite, Event, Level};
    pub use crate::handler::Handler;
    pub use crate::handlers::{JsonHandler, TracingHandler};
    pub use crate::journal::{Journal, Operation};
    pub use crate::logger::Logger;
    pub use crate::record::Record;
    pub use crate::replay::{ReplayContext, replay};
    pub use crate::storage::{CleanupPolicy, RecordStore, RecordStoreBuilder, Storage};
}
