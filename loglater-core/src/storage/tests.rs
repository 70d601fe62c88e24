use super::*;
use crate::event::{Event, Level};
use crate::journal::Journal;
use chrono::Utc;
use std::sync::atomic::AtomicUsize;

fn record(message: &str) -> Record {
    Record::from_event(&Event::new(Level::INFO, message), Journal::new()).unwrap()
}

fn aged(message: &str, age: Duration) -> Record {
    let time = Utc::now() - chrono::Duration::from_std(age).unwrap();
    Record::from_event(&Event::new(Level::INFO, message).with_time(time), Journal::new()).unwrap()
}

fn messages(records: &[Record]) -> Vec<&str> {
    records.iter().map(|r| r.message.as_str()).collect()
}

/// Let spawned tasks run until they block again
async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// Policy that counts its invocations and keeps the newest `keep` records
fn counting(keep: usize) -> (CleanupPolicy, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let policy = CleanupPolicy::new("counting", move |records| {
        counter.fetch_add(1, Ordering::SeqCst);
        if records.len() > keep {
            let excess = records.len() - keep;
            records.drain(..excess);
        }
    });
    (policy, calls)
}

#[tokio::test]
async fn test_unbounded_keeps_everything_in_order() {
    let store = RecordStore::new();
    for message in ["a", "b", "c"] {
        store.append(record(message)).await;
    }

    assert_eq!(store.len().await, 3);
    assert_eq!(messages(&store.get_all().await), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_sync_max_size_drops_oldest() {
    let store = RecordStore::builder().max_size(2).build();
    for message in ["1", "2", "3", "4"] {
        store.append(record(message)).await;
    }

    assert_eq!(messages(&store.get_all().await), vec!["3", "4"]);
}

#[tokio::test]
async fn test_sync_max_age_drops_expired() {
    let store = RecordStore::builder()
        .max_age(Duration::from_secs(60))
        .build();

    store.append(aged("old", Duration::from_secs(120))).await;
    store.append(aged("older-but-late", Duration::from_secs(90))).await;
    store.append(record("fresh")).await;

    assert_eq!(messages(&store.get_all().await), vec!["fresh"]);
}

#[tokio::test]
async fn test_cleanup_fn_replaces_records() {
    let store = RecordStore::builder()
        .cleanup_fn(|records| {
            records
                .into_iter()
                .filter(|r| r.message.starts_with("keep"))
                .collect()
        })
        .build();

    store.append(record("keep-1")).await;
    store.append(record("drop")).await;
    store.append(record("keep-2")).await;

    assert_eq!(messages(&store.get_all().await), vec!["keep-1", "keep-2"]);
}

#[tokio::test]
async fn test_get_all_returns_copy() {
    let store = RecordStore::new();
    store.append(record("original")).await;

    let mut copy = store.get_all().await;
    copy[0].message = "changed".to_string();
    copy.push(record("extra"));

    assert_eq!(messages(&store.get_all().await), vec!["original"]);
}

#[tokio::test]
async fn test_preallocation() {
    assert!(RecordStore::new().capacity().await >= DEFAULT_PREALLOCATION);
    let store = RecordStore::builder().preallocate(128).build();
    assert!(store.capacity().await >= 128);
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_with_config() {
    let config = StoreConfig::new().with_max_size(2).with_preallocation(4);
    let store = RecordStore::with_config(&config);

    for message in ["a", "b", "c"] {
        store.append(record(message)).await;
    }

    assert!(!store.is_async_cleanup());
    assert_eq!(store.policy().map(|p| p.name()), Some("max_count(2)"));
    assert_eq!(messages(&store.get_all().await), vec!["b", "c"]);
}

#[test]
fn test_zero_debounce_is_ignored() {
    let store = RecordStore::builder().debounce(Duration::ZERO).build();
    assert_eq!(store.debounce(), DEFAULT_DEBOUNCE);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends() {
    let store = Arc::new(RecordStore::new());

    let tasks: Vec<_> = (0..8)
        .map(|task| {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    store.append(record(&format!("{}-{}", task, i))).await;
                }
            })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }

    let records = store.get_all().await;
    assert_eq!(records.len(), 800);
    for task in 0..8 {
        let prefix = format!("{}-", task);
        let own: Vec<_> = records
            .iter()
            .filter(|r| r.message.starts_with(&prefix))
            .map(|r| r.message.clone())
            .collect();
        let expected: Vec<_> = (0..100).map(|i| format!("{}-{}", task, i)).collect();
        assert_eq!(own, expected);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_with_sync_cleanup() {
    let store = Arc::new(RecordStore::builder().max_size(50).build());

    let tasks: Vec<_> = (0..4)
        .map(|task| {
            let store = store.clone();
            tokio::spawn(async move {
                for i in 0..100 {
                    store.append(record(&format!("{}-{}", task, i))).await;
                }
            })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.unwrap();
    }

    assert_eq!(store.len().await, 50);
}

#[tokio::test]
#[should_panic(expected = "policy exploded")]
async fn test_sync_policy_panic_reaches_caller() {
    let store = RecordStore::builder()
        .cleanup_policy(CleanupPolicy::new("explode", |_| panic!("policy exploded")))
        .build();
    store.append(record("boom")).await;
}

#[tokio::test(start_paused = true)]
async fn test_async_cleanup_waits_for_debounce() {
    let store = RecordStore::builder()
        .max_size(2)
        .async_cleanup(true)
        .debounce(Duration::from_millis(100))
        .build();

    for message in ["1", "2", "3", "4"] {
        store.append(record(message)).await;
    }
    assert_eq!(store.len().await, 4);

    settle().await;
    tokio::time::advance(Duration::from_millis(50)).await;
    settle().await;
    assert_eq!(store.len().await, 4);

    tokio::time::advance(Duration::from_millis(60)).await;
    settle().await;
    assert_eq!(messages(&store.get_all().await), vec!["3", "4"]);
}

#[tokio::test(start_paused = true)]
async fn test_async_burst_coalesces_into_one_cleanup() {
    let (policy, calls) = counting(3);
    let store = RecordStore::builder()
        .cleanup_policy(policy)
        .async_cleanup(true)
        .debounce(Duration::from_millis(100))
        .build();

    for i in 0..20 {
        store.append(record(&i.to_string())).await;
    }
    settle().await;
    tokio::time::advance(Duration::from_millis(150)).await;
    settle().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.len().await, 3);

    store.append(record("later")).await;
    settle().await;
    tokio::time::advance(Duration::from_millis(150)).await;
    settle().await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.len().await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_async_signal_pushes_deadline_back() {
    let (policy, calls) = counting(0);
    let store = RecordStore::builder()
        .cleanup_policy(policy)
        .async_cleanup(true)
        .debounce(Duration::from_millis(100))
        .build();

    store.append(record("first")).await;
    settle().await;
    tokio::time::advance(Duration::from_millis(80)).await;
    store.append(record("second")).await;
    settle().await;

    tokio::time::advance(Duration::from_millis(80)).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.len().await, 2);

    tokio::time::advance(Duration::from_millis(40)).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_worker_survives_policy_panic() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let policy = CleanupPolicy::new("flaky", move |records| {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("first cleanup fails");
        }
        records.clear();
    });
    let store = RecordStore::builder()
        .cleanup_policy(policy)
        .async_cleanup(true)
        .debounce(Duration::from_millis(10))
        .build();
    let worker = store.spawn_cleanup_worker().unwrap();

    store.append(record("a")).await;
    settle().await;
    tokio::time::advance(Duration::from_millis(20)).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.len().await, 1);
    assert!(!worker.is_finished());

    store.append(record("b")).await;
    settle().await;
    tokio::time::advance(Duration::from_millis(20)).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(store.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_worker_keeps_records_when_custom_policy_panics() {
    let store = RecordStore::builder()
        .cleanup_fn(|_records| panic!("custom cleanup failed"))
        .async_cleanup(true)
        .debounce(Duration::from_millis(10))
        .build();
    let worker = store.spawn_cleanup_worker().unwrap();

    for message in ["a", "b", "c"] {
        store.append(record(message)).await;
    }
    settle().await;
    tokio::time::advance(Duration::from_millis(20)).await;
    settle().await;

    assert!(!worker.is_finished());
    assert_eq!(messages(&store.get_all().await), vec!["a", "b", "c"]);
}

#[tokio::test(start_paused = true)]
async fn test_huge_debounce_does_not_stop_worker() {
    let store = RecordStore::builder()
        .max_size(1)
        .async_cleanup(true)
        .debounce(Duration::MAX)
        .build();
    let worker = store.spawn_cleanup_worker().unwrap();

    store.append(record("a")).await;
    store.append(record("b")).await;
    settle().await;
    tokio::time::advance(Duration::from_secs(3600)).await;
    settle().await;

    assert!(!worker.is_finished());
    assert_eq!(store.len().await, 2);

    store.run_cleanup().await;
    assert_eq!(messages(&store.get_all().await), vec!["b"]);
}

#[tokio::test]
async fn test_worker_starts_once() {
    let store = RecordStore::builder()
        .max_size(1)
        .async_cleanup(true)
        .build();

    let first = store.spawn_cleanup_worker();
    assert!(first.is_some());
    assert!(store.spawn_cleanup_worker().is_none());

    store.append(record("x")).await;
    assert!(store.spawn_cleanup_worker().is_none());
}

#[tokio::test]
async fn test_worker_not_spawned_without_async_policy() {
    let sync_store = RecordStore::builder().max_size(1).build();
    assert!(sync_store.spawn_cleanup_worker().is_none());

    let no_policy = RecordStore::builder().async_cleanup(true).build();
    assert!(no_policy.spawn_cleanup_worker().is_none());
}

#[test]
fn test_worker_needs_runtime() {
    let store = RecordStore::builder()
        .max_size(1)
        .async_cleanup(true)
        .build();
    assert!(store.spawn_cleanup_worker().is_none());
}

#[test]
fn test_appends_without_runtime_report_missing_runtime_once() {
    let store = RecordStore::builder()
        .max_size(1)
        .async_cleanup(true)
        .build();

    futures::executor::block_on(async {
        store.append(record("a")).await;
        assert!(store.runtime_missing.load(Ordering::Acquire));
        store.append(record("b")).await;
    });

    assert!(store.runtime_missing.load(Ordering::Acquire));
    assert!(!store.worker_started.load(Ordering::Acquire));
    assert_eq!(futures::executor::block_on(store.len()), 2);
}

#[tokio::test]
async fn test_parent_cancellation_stops_worker() {
    let token = CancellationToken::new();
    let store = RecordStore::builder()
        .max_size(1)
        .async_cleanup(true)
        .cancellation(token.clone())
        .build();
    let worker = store.spawn_cleanup_worker().unwrap();

    token.cancel();
    tokio::time::timeout(Duration::from_secs(1), worker)
        .await
        .expect("worker did not stop")
        .unwrap();

    // Appends still succeed, cleanup just no longer happens
    store.append(record("a")).await;
    store.append(record("b")).await;
    assert_eq!(store.len().await, 2);
    assert!(store.spawn_cleanup_worker().is_none());
}

#[tokio::test]
async fn test_shutdown_prevents_lazy_start() {
    let store = RecordStore::builder()
        .max_size(1)
        .async_cleanup(true)
        .build();
    store.shutdown();

    store.append(record("a")).await;
    store.append(record("b")).await;

    assert_eq!(store.len().await, 2);
    assert!(store.spawn_cleanup_worker().is_none());
}

#[tokio::test]
async fn test_dropping_store_stops_worker() {
    let store = RecordStore::builder()
        .max_size(1)
        .async_cleanup(true)
        .build();
    let worker = store.spawn_cleanup_worker().unwrap();

    drop(store);

    tokio::time::timeout(Duration::from_secs(1), worker)
        .await
        .expect("worker did not stop")
        .unwrap();
}

#[tokio::test]
async fn test_run_cleanup_on_demand() {
    let store = RecordStore::builder()
        .max_size(1)
        .async_cleanup(true)
        .debounce(Duration::from_secs(3600))
        .build();

    store.append(record("a")).await;
    store.append(record("b")).await;
    assert_eq!(store.len().await, 2);

    store.run_cleanup().await;
    assert_eq!(messages(&store.get_all().await), vec!["b"]);
}
