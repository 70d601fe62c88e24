//! Built-in handlers
//!
//! - [`JsonHandler`]: one JSON object per line to any writer
//! - [`TracingHandler`]: re-emits events through `tracing`

mod json;
mod trace;

pub use json::JsonHandler;
pub use trace::TracingHandler;
