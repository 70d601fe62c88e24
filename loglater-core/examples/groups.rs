//! Derived loggers, groups, and the realized view of captured records

use loglater_core::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    // Forward live to tracing while also capturing
    let live: Arc<dyn Handler> = Arc::new(TracingHandler::new());
    let collector = LogCollector::new(Some(live));

    let logger = Logger::new(collector.clone())
        .with(vec![Attr::new("service", "api")])
        .with_group("request")
        .with(vec![Attr::new("method", "GET"), Attr::new("path", "/users")]);

    logger.info("handling request", vec![]).await?;
    logger
        .with_group("db")
        .debug("query", vec![Attr::new("rows", 12), Attr::new("elapsed", std::time::Duration::from_millis(3))])
        .await?;
    logger.info("done", vec![Attr::new("status", 200)]).await?;

    println!("\nRealized records:");
    for record in collector.get_logs().await {
        let attrs: Vec<String> = record.attrs.iter().map(|a| a.to_string()).collect();
        println!("  {} [{}]", record.message, attrs.join(" "));
    }

    println!("\nReplayed as JSON:");
    let json: Arc<dyn Handler> = Arc::new(JsonHandler::stdout().with_min_level(Level::DEBUG));
    collector.play_logs(Some(json)).await?;

    Ok(())
}
