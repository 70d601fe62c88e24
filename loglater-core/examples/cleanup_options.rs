//! Bounding a record store: count, age, custom policies and async cleanup

use loglater_core::prelude::*;
use std::sync::Arc;
use std::time::Duration;

async fn fill(collector: &Arc<LogCollector>, count: usize) -> Result<()> {
    let logger = Logger::new(collector.clone());
    for n in 0..count {
        let level = if n % 3 == 0 { Level::WARN } else { Level::INFO };
        logger.log(level, format!("event {}", n), vec![Attr::new("n", n)]).await?;
    }
    Ok(())
}

async fn report(name: &str, collector: &Arc<LogCollector>) {
    let records = collector.store().get_all().await;
    let messages: Vec<_> = records.iter().map(|r| r.message.as_str()).collect();
    println!("{:<12} {:?}", name, messages);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("loglater_core=debug")),
        )
        .init();

    // Keep the newest five
    let bounded = LogCollector::builder()
        .storage(Arc::new(RecordStore::builder().max_size(5).build()))
        .build();
    fill(&bounded, 10).await?;
    report("max_size", &bounded).await;

    // Only warnings survive
    let warnings = LogCollector::builder()
        .storage(Arc::new(
            RecordStore::builder()
                .cleanup_policy(CleanupPolicy::filter(|r| r.level >= Level::WARN))
                .build(),
        ))
        .build();
    fill(&warnings, 10).await?;
    report("filter", &warnings).await;

    // Age and count, combined
    let combined = LogCollector::builder()
        .storage(Arc::new(
            RecordStore::builder()
                .cleanup_policy(
                    CleanupPolicy::max_age(Duration::from_secs(60)).then(CleanupPolicy::max_count(3)),
                )
                .build(),
        ))
        .build();
    fill(&combined, 10).await?;
    report("age+count", &combined).await;

    // Debounced background cleanup
    let store = Arc::new(
        RecordStore::builder()
            .max_size(2)
            .async_cleanup(true)
            .debounce(Duration::from_millis(200))
            .build(),
    );
    let debounced = LogCollector::builder().storage(store.clone()).build();
    fill(&debounced, 10).await?;
    report("async now", &debounced).await;
    tokio::time::sleep(Duration::from_millis(400)).await;
    report("async later", &debounced).await;
    store.shutdown();

    // From configuration (loglater.toml and LOGLATER_* variables)
    let config = StoreConfig::load()?;
    let configured = LogCollector::builder()
        .storage(Arc::new(RecordStore::with_config(&config)))
        .build();
    fill(&configured, 10).await?;
    report("configured", &configured).await;

    Ok(())
}
