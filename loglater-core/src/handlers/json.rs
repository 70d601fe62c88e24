//! JSON-lines handler

use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::attr::{Attr, Value};
use crate::error::{LogLaterError, Result};
use crate::event::{Event, Level};
use crate::handler::Handler;

/// Writes each event as one JSON object per line
///
/// The object starts with `time`, `level`, `msg` and (when known) `source`,
/// followed by bound attributes and the event's own attributes. Keys keep
/// the order they were added in. Groups become nested objects; a group that
/// ends up with no attributes is left out.
pub struct JsonHandler<W> {
    writer: Arc<Mutex<W>>,
    min_level: Level,
    groups: Vec<String>,
    bound: Map<String, JsonValue>,
}

impl JsonHandler<std::io::Stdout> {
    /// Handler writing to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> JsonHandler<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Arc::new(Mutex::new(writer)),
            min_level: Level::INFO,
            groups: Vec::new(),
            bound: Map::new(),
        }
    }

    /// Only handle events at or above `level`
    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }

    fn derive(&self) -> Self {
        Self {
            writer: Arc::clone(&self.writer),
            min_level: self.min_level,
            groups: self.groups.clone(),
            bound: self.bound.clone(),
        }
    }

    fn render(&self, event: &Event) -> Map<String, JsonValue> {
        let mut object = Map::new();
        object.insert("time".to_string(), JsonValue::String(event.time.to_rfc3339()));
        object.insert("level".to_string(), JsonValue::String(event.level.to_string()));
        object.insert("msg".to_string(), JsonValue::String(event.message.clone()));
        if let Some(site) = &event.call_site {
            object.insert("source".to_string(), JsonValue::String(site.to_string()));
        }
        for (key, value) in &self.bound {
            object.insert(key.clone(), value.clone());
        }
        insert_at(&mut object, &self.groups, &event.attrs);
        object
    }

    fn write_line(&self, object: &Map<String, JsonValue>) -> Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| LogLaterError::handler("JSON writer lock poisoned"))?;
        serde_json::to_writer(&mut *writer, object)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

#[async_trait]
impl<W: Write + Send + 'static> Handler for JsonHandler<W> {
    fn enabled(&self, level: Level) -> bool {
        level >= self.min_level
    }

    async fn handle(&self, event: &Event) -> Result<()> {
        let object = self.render(event);
        self.write_line(&object)
    }

    fn with_attrs(self: Arc<Self>, attrs: Vec<Attr>) -> Arc<dyn Handler> {
        if attrs.is_empty() {
            return self;
        }
        let mut derived = self.derive();
        insert_at(&mut derived.bound, &self.groups, &attrs);
        Arc::new(derived)
    }

    fn with_group(self: Arc<Self>, name: &str) -> Arc<dyn Handler> {
        if name.is_empty() {
            return self;
        }
        let mut derived = self.derive();
        derived.groups.push(name.to_string());
        Arc::new(derived)
    }
}

/// Insert `attrs` into `object` under the nested `groups` path
fn insert_at(object: &mut Map<String, JsonValue>, groups: &[String], attrs: &[Attr]) {
    if attrs.is_empty() {
        return;
    }
    let Some((first, rest)) = groups.split_first() else {
        for attr in attrs {
            insert_attr(object, attr);
        }
        return;
    };

    let entry = object
        .entry(first.clone())
        .or_insert_with(|| JsonValue::Object(Map::new()));
    if !entry.is_object() {
        *entry = JsonValue::Object(Map::new());
    }
    if let JsonValue::Object(inner) = entry {
        insert_at(inner, rest, attrs);
    }
}

fn insert_attr(object: &mut Map<String, JsonValue>, attr: &Attr) {
    match &attr.value {
        Value::Group(nested) if nested.is_empty() => {}
        Value::Group(nested) if attr.key.is_empty() => {
            for inner in nested {
                insert_attr(object, inner);
            }
        }
        Value::Group(nested) => {
            insert_at(object, std::slice::from_ref(&attr.key), nested);
        }
        value => {
            object.insert(attr.key.clone(), value.to_json());
        }
    }
}
