//! Log events as seen by a [`Handler`](crate::handler::Handler)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::Location;

use crate::attr::Attr;

/// Severity of a log event
///
/// Levels are ordered integers so that handlers can compare against a
/// minimum. Values between the named levels are legal and render relative
/// to the nearest lower level (`INFO+2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Level(pub i32);

impl Level {
    pub const DEBUG: Level = Level(-4);
    pub const INFO: Level = Level(0);
    pub const WARN: Level = Level(4);
    pub const ERROR: Level = Level(8);

    /// Name of the nearest named level at or below this one
    fn base(self) -> (&'static str, Level) {
        if self < Level::INFO {
            ("DEBUG", Level::DEBUG)
        } else if self < Level::WARN {
            ("INFO", Level::INFO)
        } else if self < Level::ERROR {
            ("WARN", Level::WARN)
        } else {
            ("ERROR", Level::ERROR)
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::INFO
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (name, base) = self.base();
        let offset = self.0 - base.0;
        if offset == 0 {
            write!(f, "{}", name)
        } else {
            write!(f, "{}{:+}", name, offset)
        }
    }
}

/// Source location of the code that emitted an event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    /// Source file
    pub file: String,

    /// Line number
    pub line: u32,

    /// Column number
    pub column: u32,
}

impl CallSite {
    /// The location of the caller of the function this is invoked from
    #[track_caller]
    pub fn caller() -> Self {
        Self::from(Location::caller())
    }
}

impl From<&Location<'_>> for CallSite {
    fn from(location: &Location<'_>) -> Self {
        Self {
            file: location.file().to_string(),
            line: location.line(),
            column: location.column(),
        }
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A single structured log event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// When the event was emitted
    pub time: DateTime<Utc>,

    /// Severity
    pub level: Level,

    /// Log message
    pub message: String,

    /// Where the event was emitted from, if known
    pub call_site: Option<CallSite>,

    /// Attributes attached directly at the log call
    pub attrs: Vec<Attr>,
}

impl Event {
    /// Create an event stamped with the current time and no call site
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: Utc::now(),
            level,
            message: message.into(),
            call_site: None,
            attrs: Vec::new(),
        }
    }

    /// Set the timestamp
    pub fn with_time(mut self, time: DateTime<Utc>) -> Self {
        self.time = time;
        self
    }

    /// Set the call site
    pub fn with_call_site(mut self, call_site: CallSite) -> Self {
        self.call_site = Some(call_site);
        self
    }

    /// Append one attribute
    pub fn with_attr(mut self, attr: Attr) -> Self {
        self.attrs.push(attr);
        self
    }

    /// Append several attributes, keeping their order
    pub fn with_attrs(mut self, attrs: impl IntoIterator<Item = Attr>) -> Self {
        self.attrs.extend(attrs);
        self
    }
}
