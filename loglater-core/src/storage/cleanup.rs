//! Cleanup policies for bounding a record store

use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::record::Record;

type PolicyFn = dyn Fn(&mut Vec<Record>) + Send + Sync;

/// Reduces a store's records to the subset worth keeping
///
/// Policies work in place on the ordered record list and must keep the
/// relative order of the records they retain.
#[derive(Clone)]
pub struct CleanupPolicy {
    name: String,
    apply: Arc<PolicyFn>,
}

impl CleanupPolicy {
    /// Wrap an in-place policy function
    pub fn new(
        name: impl Into<String>,
        apply: impl Fn(&mut Vec<Record>) + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            apply: Arc::new(apply),
        }
    }

    /// Keep only the `max_count` most recently appended records
    pub fn max_count(max_count: usize) -> Self {
        Self::new(format!("max_count({})", max_count), move |records| {
            if records.len() > max_count {
                let excess = records.len() - max_count;
                records.drain(..excess);
            }
        })
    }

    /// Keep only records newer than `now - max_age`
    ///
    /// Records are assumed to be appended in time order, so everything before
    /// the first young-enough record is dropped in one pass.
    pub fn max_age(max_age: Duration) -> Self {
        Self::new(format!("max_age({:?})", max_age), move |records| {
            if records.is_empty() {
                return;
            }
            let Some(cutoff) = chrono::Duration::from_std(max_age)
                .ok()
                .and_then(|age| Utc::now().checked_sub_signed(age))
            else {
                return;
            };

            let keep_from = records
                .iter()
                .position(|record| record.time > cutoff)
                .unwrap_or(records.len());
            records.drain(..keep_from);
        })
    }

    /// Keep the records for which `keep` returns true
    pub fn filter(keep: impl Fn(&Record) -> bool + Send + Sync + 'static) -> Self {
        Self::new("filter", move |records| records.retain(|record| keep(record)))
    }

    /// Replace the record list with whatever `cleanup` returns
    ///
    /// `cleanup` works on a copy; the list is only replaced once it returns.
    pub fn custom(cleanup: impl Fn(Vec<Record>) -> Vec<Record> + Send + Sync + 'static) -> Self {
        Self::new("custom", move |records| {
            *records = cleanup(records.clone());
        })
    }

    /// Run this policy, then `next`
    pub fn then(self, next: CleanupPolicy) -> Self {
        let name = format!("{} -> {}", self.name, next.name);
        Self::new(name, move |records| {
            self.apply(records);
            next.apply(records);
        })
    }

    /// Apply the policy to `records`
    pub fn apply(&self, records: &mut Vec<Record>) {
        (self.apply)(records)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CleanupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupPolicy")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
