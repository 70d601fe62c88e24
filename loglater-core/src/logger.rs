//! A small front-end for emitting events through a handler chain

use futures::future::BoxFuture;
use std::sync::Arc;

use crate::attr::Attr;
use crate::error::Result;
use crate::event::{CallSite, Event, Level};
use crate::handler::Handler;

/// Emits events to a [`Handler`], recording the call site of each log call
#[derive(Clone)]
pub struct Logger {
    handler: Arc<dyn Handler>,
}

impl Logger {
    pub fn new(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    /// The handler this logger writes to
    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// A logger whose events carry `attrs`
    pub fn with(&self, attrs: Vec<Attr>) -> Logger {
        Logger::new(Arc::clone(&self.handler).with_attrs(attrs))
    }

    /// A logger whose subsequent attributes nest under `name`
    pub fn with_group(&self, name: &str) -> Logger {
        Logger::new(Arc::clone(&self.handler).with_group(name))
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.handler.enabled(level)
    }

    /// Emit an event at `level`
    ///
    /// The call site is taken from the caller. Nothing is emitted when the
    /// handler is not enabled for `level`.
    #[track_caller]
    pub fn log(
        &self,
        level: Level,
        message: impl Into<String>,
        attrs: Vec<Attr>,
    ) -> BoxFuture<'static, Result<()>> {
        let call_site = CallSite::caller();
        let handler = Arc::clone(&self.handler);
        let message = message.into();

        Box::pin(async move {
            if !handler.enabled(level) {
                return Ok(());
            }
            let event = Event::new(level, message)
                .with_call_site(call_site)
                .with_attrs(attrs);
            handler.handle(&event).await
        })
    }

    #[track_caller]
    pub fn debug(
        &self,
        message: impl Into<String>,
        attrs: Vec<Attr>,
    ) -> BoxFuture<'static, Result<()>> {
        self.log(Level::DEBUG, message, attrs)
    }

    #[track_caller]
    pub fn info(
        &self,
        message: impl Into<String>,
        attrs: Vec<Attr>,
    ) -> BoxFuture<'static, Result<()>> {
        self.log(Level::INFO, message, attrs)
    }

    #[track_caller]
    pub fn warn(
        &self,
        message: impl Into<String>,
        attrs: Vec<Attr>,
    ) -> BoxFuture<'static, Result<()>> {
        self.log(Level::WARN, message, attrs)
    }

    #[track_caller]
    pub fn error(
        &self,
        message: impl Into<String>,
        attrs: Vec<Attr>,
    ) -> BoxFuture<'static, Result<()>> {
        self.log(Level::ERROR, message, attrs)
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger").finish_non_exhaustive()
    }
}
