//! Operation journals
//!
//! Every `with_attrs` / `with_group` call made on a collector is recorded as
//! an [`Operation`]. The ordered list of operations that produced a given
//! collector is its [`Journal`]. Attributes bound before a group stay at the
//! top level while attributes bound after it nest under the group, so the
//! relative order of the two kinds of operation has to be kept exactly.
//!
//! For `base.with_attrs([global=v]).with_group("api").with_attrs([user=1])`:
//!
//! 1. `Attrs([global=v])`
//! 2. `Group("api")`
//! 3. `Attrs([user=1])`
//!
//! Journals are immutable. Deriving returns a new journal that copies the
//! parent's operations and appends one more, so sibling branches never see
//! each other's operations.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::attr::Attr;

/// One handler derivation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Attributes bound with `with_attrs`
    Attrs { attrs: Vec<Attr> },

    /// Group scope opened with `with_group`
    Group { name: String },

    /// An operation this version does not understand. Realization and replay
    /// skip it.
    #[serde(other)]
    Unknown,
}

impl Operation {
    /// Attribute-binding operation
    pub fn attrs(attrs: Vec<Attr>) -> Self {
        Operation::Attrs { attrs }
    }

    /// Group-scope operation
    pub fn group(name: impl Into<String>) -> Self {
        Operation::Group { name: name.into() }
    }
}

/// Ordered, immutable sequence of [`Operation`]s
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Journal {
    ops: Arc<[Operation]>,
}

impl Journal {
    /// An empty journal
    pub fn new() -> Self {
        Self::default()
    }

    /// A new journal holding this journal's operations followed by `op`
    pub fn push(&self, op: Operation) -> Journal {
        let mut ops = Vec::with_capacity(self.ops.len() + 1);
        ops.extend_from_slice(&self.ops);
        ops.push(op);
        Journal { ops: ops.into() }
    }

    /// Operations in the order they were issued
    pub fn operations(&self) -> &[Operation] {
        &self.ops
    }

    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.ops.iter()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl PartialEq for Journal {
    fn eq(&self, other: &Self) -> bool {
        self.ops[..] == other.ops[..]
    }
}

impl FromIterator<Operation> for Journal {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        Journal {
            ops: iter.into_iter().collect::<Vec<_>>().into(),
        }
    }
}

impl<'a> IntoIterator for &'a Journal {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}
