//! Record storage
//!
//! [`RecordStore`] keeps captured records in memory behind a reader-writer
//! lock. Appends and cleanup take the write side; [`Storage::get_all`] takes
//! the read side and hands back a copy.
//!
//! A store may carry a [`CleanupPolicy`]. In synchronous mode the policy runs
//! inline after every append. In asynchronous mode appends only signal a
//! single background worker, which runs the policy once the signals have
//! been quiet for the configured debounce duration.
//!
//! # Example
//!
//! ```rust,no_run
//! use loglater_core::storage::RecordStore;
//! use std::time::Duration;
//!
//! let store = RecordStore::builder()
//!     .max_size(1_000)
//!     .async_cleanup(true)
//!     .debounce(Duration::from_millis(250))
//!     .build();
//! ```

mod cleanup;
mod worker;

pub use cleanup::CleanupPolicy;

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::StoreConfig;
use crate::record::Record;
use worker::CleanupWorker;

/// Default initial capacity of a store
pub const DEFAULT_PREALLOCATION: usize = 10;

/// Default debounce for asynchronous cleanup
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(10);

/// Trait for record storage backends
#[async_trait]
pub trait Storage: Send + Sync {
    /// Add a record
    async fn append(&self, record: Record);

    /// Copy of every stored record, oldest first
    async fn get_all(&self) -> Vec<Record>;
}

/// In-memory record store with optional cleanup
pub struct RecordStore {
    records: Arc<RwLock<Vec<Record>>>,
    policy: Option<CleanupPolicy>,
    async_cleanup: bool,
    debounce: Duration,
    signal_tx: mpsc::Sender<()>,
    signal_rx: Mutex<Option<mpsc::Receiver<()>>>,
    cancellation: CancellationToken,
    worker_started: AtomicBool,
    runtime_missing: AtomicBool,
}

impl RecordStore {
    /// Create an unbounded store with default settings
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Start configuring a store
    pub fn builder() -> RecordStoreBuilder {
        RecordStoreBuilder::default()
    }

    /// Create a store from a loaded configuration
    pub fn with_config(config: &StoreConfig) -> Self {
        RecordStoreBuilder::from_config(config).build()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Current capacity of the backing vector
    pub async fn capacity(&self) -> usize {
        self.records.read().await.capacity()
    }

    /// The configured cleanup policy, if any
    pub fn policy(&self) -> Option<&CleanupPolicy> {
        self.policy.as_ref()
    }

    /// Whether cleanup is handed to the background worker
    pub fn is_async_cleanup(&self) -> bool {
        self.async_cleanup
    }

    /// Debounce applied by the background worker
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Apply the cleanup policy now, under the write lock
    pub async fn run_cleanup(&self) {
        let Some(policy) = &self.policy else {
            return;
        };

        let mut records = self.records.write().await;
        if records.is_empty() {
            return;
        }
        let before = records.len();
        policy.apply(&mut records);
        tracing::trace!(
            policy = %policy.name(),
            before,
            after = records.len(),
            "Cleanup completed"
        );
    }

    /// Start the background cleanup worker
    ///
    /// Returns the worker's handle the first time it is called on a store
    /// with asynchronous cleanup and a policy. Returns `None` if the worker
    /// was already started, the store was shut down, cleanup is synchronous,
    /// or there is no tokio runtime to spawn onto. Appends start the worker
    /// on demand, so calling this is only needed to hold on to the handle.
    pub fn spawn_cleanup_worker(&self) -> Option<JoinHandle<()>> {
        if !self.async_cleanup || self.cancellation.is_cancelled() {
            return None;
        }
        let policy = self.policy.clone()?;
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                if !self.runtime_missing.swap(true, Ordering::AcqRel) {
                    tracing::warn!(error = %e, "No tokio runtime, cleanup worker not started");
                }
                return None;
            }
        };

        if self
            .worker_started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let signals = match self.signal_rx.lock() {
            Ok(mut rx) => rx.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        }?;

        let worker = CleanupWorker {
            records: Arc::clone(&self.records),
            policy,
            debounce: self.debounce,
            signals,
            cancellation: self.cancellation.clone(),
        };
        Some(runtime.spawn(worker.run()))
    }

    /// Stop the background worker; it will not be restarted
    pub fn shutdown(&self) {
        self.cancellation.cancel();
    }

    async fn trigger_cleanup(&self) {
        if !self.async_cleanup {
            self.run_cleanup().await;
            return;
        }

        if !self.worker_started.load(Ordering::Acquire) {
            self.spawn_cleanup_worker();
        }

        match self.signal_tx.try_send(()) {
            Ok(()) => {}
            // A cleanup is already pending
            Err(TrySendError::Full(())) => {}
            Err(TrySendError::Closed(())) => {
                tracing::trace!("Cleanup worker has stopped, signal dropped");
            }
        }
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RecordStore {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

impl std::fmt::Debug for RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStore")
            .field("policy", &self.policy)
            .field("async_cleanup", &self.async_cleanup)
            .field("debounce", &self.debounce)
            .field("worker_started", &self.worker_started.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Storage for RecordStore {
    async fn append(&self, record: Record) {
        {
            let mut records = self.records.write().await;
            records.push(record);
        }

        if self.policy.is_some() {
            self.trigger_cleanup().await;
        }
    }

    async fn get_all(&self) -> Vec<Record> {
        self.records.read().await.clone()
    }
}

/// Builder for [`RecordStore`]
///
/// Each cleanup setting replaces the previous one; use
/// [`CleanupPolicy::then`] to combine policies.
#[derive(Debug, Clone)]
pub struct RecordStoreBuilder {
    preallocation: usize,
    policy: Option<CleanupPolicy>,
    async_cleanup: bool,
    debounce: Duration,
    cancellation: Option<CancellationToken>,
}

impl Default for RecordStoreBuilder {
    fn default() -> Self {
        Self {
            preallocation: DEFAULT_PREALLOCATION,
            policy: None,
            async_cleanup: false,
            debounce: DEFAULT_DEBOUNCE,
            cancellation: None,
        }
    }
}

impl RecordStoreBuilder {
    /// Builder pre-populated from a configuration
    pub fn from_config(config: &StoreConfig) -> Self {
        let mut builder = Self::default()
            .preallocate(config.preallocation)
            .async_cleanup(config.async_cleanup)
            .debounce(config.debounce);
        builder.policy = config.cleanup_policy();
        builder
    }

    /// Initial capacity of the record list
    pub fn preallocate(mut self, capacity: usize) -> Self {
        self.preallocation = capacity;
        self
    }

    /// Keep at most `max_size` records, dropping the oldest
    pub fn max_size(self, max_size: usize) -> Self {
        self.cleanup_policy(CleanupPolicy::max_count(max_size))
    }

    /// Drop records older than `max_age`
    pub fn max_age(self, max_age: Duration) -> Self {
        self.cleanup_policy(CleanupPolicy::max_age(max_age))
    }

    /// Use a caller-supplied policy
    pub fn cleanup_policy(mut self, policy: CleanupPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Use a caller-supplied function as the policy
    pub fn cleanup_fn(
        self,
        cleanup: impl Fn(Vec<Record>) -> Vec<Record> + Send + Sync + 'static,
    ) -> Self {
        self.cleanup_policy(CleanupPolicy::custom(cleanup))
    }

    /// Run cleanup on a debounced background worker instead of inline
    pub fn async_cleanup(mut self, enabled: bool) -> Self {
        self.async_cleanup = enabled;
        self
    }

    /// Debounce for asynchronous cleanup; zero is ignored
    pub fn debounce(mut self, debounce: Duration) -> Self {
        if !debounce.is_zero() {
            self.debounce = debounce;
        }
        self
    }

    /// Stop the background worker when `token` is cancelled
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn build(self) -> RecordStore {
        let (signal_tx, signal_rx) = mpsc::channel(1);
        let cancellation = self
            .cancellation
            .map(|parent| parent.child_token())
            .unwrap_or_else(CancellationToken::new);

        RecordStore {
            records: Arc::new(RwLock::new(Vec::with_capacity(self.preallocation))),
            policy: self.policy,
            async_cleanup: self.async_cleanup,
            debounce: self.debounce,
            signal_tx,
            signal_rx: Mutex::new(Some(signal_rx)),
            cancellation,
            worker_started: AtomicBool::new(false),
            runtime_missing: AtomicBool::new(false),
        }
    }
}

#[cfg(test)]
mod tests;
