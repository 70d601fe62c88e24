//! Handler that forwards events to `tracing`

use async_trait::async_trait;
use std::sync::Arc;

use crate::attr::{Attr, Value};
use crate::error::Result;
use crate::event::{Event, Level};
use crate::handler::Handler;

/// Re-emits events as `tracing` events under the `loglater` target
///
/// Attributes are flattened into a single `attrs` field of `key=value`
/// pairs, with group keys joined by dots (`request.id=7`).
#[derive(Debug, Clone, Default)]
pub struct TracingHandler {
    groups: Vec<String>,
    bound: Vec<String>,
}

impl TracingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn prefix(&self) -> String {
        self.groups.iter().map(|g| format!("{}.", g)).collect()
    }

    /// A copy with `attrs` bound under the currently open groups
    pub fn bind(&self, attrs: &[Attr]) -> Self {
        let mut derived = self.clone();
        let prefix = self.prefix();
        for attr in attrs {
            flatten_into(&mut derived.bound, &prefix, attr);
        }
        derived
    }

    /// A copy with `name` opened as the innermost group
    pub fn group(&self, name: &str) -> Self {
        let mut derived = self.clone();
        derived.groups.push(name.to_string());
        derived
    }

    /// The flattened `key=value` pairs an event would be emitted with
    pub fn flatten(&self, event: &Event) -> Vec<String> {
        let mut pairs = self.bound.clone();
        let prefix = self.prefix();
        for attr in &event.attrs {
            flatten_into(&mut pairs, &prefix, attr);
        }
        pairs
    }
}

fn flatten_into(out: &mut Vec<String>, prefix: &str, attr: &Attr) {
    match &attr.value {
        Value::Group(nested) => {
            let inner = if attr.key.is_empty() {
                prefix.to_string()
            } else {
                format!("{}{}.", prefix, attr.key)
            };
            for attr in nested {
                flatten_into(out, &inner, attr);
            }
        }
        value => out.push(format!("{}{}={}", prefix, attr.key, value)),
    }
}

macro_rules! emit {
    ($level:expr, $site:ident, $attrs:ident, $message:ident) => {
        match $site {
            Some(site) => tracing::event!(
                target: "loglater",
                $level,
                source = %site,
                attrs = %$attrs,
                "{}",
                $message
            ),
            None => tracing::event!(target: "loglater", $level, attrs = %$attrs, "{}", $message),
        }
    };
}

#[async_trait]
impl Handler for TracingHandler {
    fn enabled(&self, level: Level) -> bool {
        if level >= Level::ERROR {
            tracing::enabled!(target: "loglater", tracing::Level::ERROR)
        } else if level >= Level::WARN {
            tracing::enabled!(target: "loglater", tracing::Level::WARN)
        } else if level >= Level::INFO {
            tracing::enabled!(target: "loglater", tracing::Level::INFO)
        } else if level >= Level::DEBUG {
            tracing::enabled!(target: "loglater", tracing::Level::DEBUG)
        } else {
            tracing::enabled!(target: "loglater", tracing::Level::TRACE)
        }
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        let attrs = self.flatten(event).join(" ");
        let message = &event.message;
        let site = event.call_site.as_ref();
        let level = event.level;

        if level >= Level::ERROR {
            emit!(tracing::Level::ERROR, site, attrs, message);
        } else if level >= Level::WARN {
            emit!(tracing::Level::WARN, site, attrs, message);
        } else if level >= Level::INFO {
            emit!(tracing::Level::INFO, site, attrs, message);
        } else if level >= Level::DEBUG {
            emit!(tracing::Level::DEBUG, site, attrs, message);
        } else {
            emit!(tracing::Level::TRACE, site, attrs, message);
        }
        Ok(())
    }

    fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        if attrs.is_empty() {
            return self;
        }
        Arc::new(self.bind(&attrs))
    }

    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
        if name.is_empty() {
            return self;
        }
        Arc::new(self.group(name))
    }
}
