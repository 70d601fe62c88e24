//! Capture logs silently, then replay them as JSON once something goes wrong

use loglater_core::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let collector = LogCollector::new(None);
    let logger = Logger::new(collector.clone());

    logger.info("starting import", vec![Attr::new("file", "orders.csv")]).await?;
    for row in 1..=3 {
        logger.debug("row parsed", vec![Attr::new("row", row)]).await?;
    }
    let failed = true;

    if failed {
        logger.error("import failed", vec![Attr::new("row", 4)]).await?;
        println!("import failed, dumping {} captured records:", collector.store().get_all().await.len());
        let sink: Arc<dyn Handler> = Arc::new(JsonHandler::stdout().with_min_level(Level::DEBUG));
        collector.play_logs(Some(sink)).await?;
    }

    Ok(())
}
