//! Captured log records
//!
//! A [`Record`] is an immutable copy of an [`Event`] together with a snapshot
//! of the [`Journal`] of the collector that captured it. [`Record::realize`]
//! replays the journal without any live handler and produces the attribute
//! view a handler chain built from the same operations would have emitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attr::{Attr, Value};
use crate::error::{LogLaterError, Result};
use crate::event::{CallSite, Event, Level};
use crate::journal::{Journal, Operation};

/// A captured log event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// When the event was emitted
    pub time: DateTime<Utc>,

    /// Severity
    pub level: Level,

    /// Log message
    pub message: String,

    /// Where the event was emitted from, preserved through replay
    pub call_site: Option<CallSite>,

    /// Attributes attached directly at the log call
    pub attrs: Vec<Attr>,

    /// Derivation operations in effect when the event was captured
    #[serde(default)]
    pub journal: Journal,
}

impl Record {
    /// Capture `event` under `journal`
    ///
    /// # Errors
    ///
    /// Returns [`LogLaterError::RecordCreationFailed`] if any attribute, at
    /// any depth, has an empty key without being a group.
    pub fn from_event(event: &Event, journal: Journal) -> Result<Self> {
        if let Some(path) = find_empty_key(&event.attrs, "") {
            return Err(LogLaterError::RecordCreationFailed(format!(
                "attribute at {} has an empty key",
                path
            )));
        }

        let mut attrs = Vec::with_capacity(event.attrs.len());
        attrs.extend(event.attrs.iter().cloned());

        Ok(Self {
            time: event.time,
            level: event.level,
            message: event.message.clone(),
            call_site: event.call_site.clone(),
            attrs,
            journal,
        })
    }

    /// Rebuild the event this record was captured from, without journal effects
    pub fn to_event(&self) -> Event {
        Event {
            time: self.time,
            level: self.level,
            message: self.message.clone(),
            call_site: self.call_site.clone(),
            attrs: self.attrs.clone(),
        }
    }

    /// Apply the journal and return a record with the fully nested attributes
    ///
    /// Journal-bound attributes come first in the order they were bound,
    /// followed by the record's own attributes nested under whatever groups
    /// the journal left open. The result has an empty journal, so realizing
    /// it again returns an equal record.
    pub fn realize(&self) -> Record {
        let mut groups: Vec<&str> = Vec::new();
        let mut attrs = Vec::new();

        for op in &self.journal {
            match op {
                Operation::Attrs { attrs: bound } => {
                    attrs.extend(bound.iter().map(|attr| apply_groups(attr.clone(), &groups)));
                }
                Operation::Group { name } => groups.push(name),
                Operation::Unknown => {}
            }
        }

        attrs.extend(self.attrs.iter().map(|attr| apply_groups(attr.clone(), &groups)));

        Record {
            time: self.time,
            level: self.level,
            message: self.message.clone(),
            call_site: self.call_site.clone(),
            attrs,
            journal: Journal::new(),
        }
    }
}

/// Wrap `attr` in one group per entry of `groups`, outermost first
pub fn apply_groups(attr: Attr, groups: &[&str]) -> Attr {
    groups
        .iter()
        .rev()
        .fold(attr, |inner, group| Attr::group(*group, vec![inner]))
}

fn find_empty_key(attrs: &[Attr], prefix: &str) -> Option<String> {
    for (i, attr) in attrs.iter().enumerate() {
        let path = format!("{}{}", prefix, i);
        match &attr.value {
            Value::Group(nested) => {
                if let Some(found) = find_empty_key(nested, &format!("{}.", path)) {
                    return Some(found);
                }
            }
            _ if attr.key.is_empty() => return Some(path),
            _ => {}
        }
    }
    None
}
