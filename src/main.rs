use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use curveboard::api::{self, AppState};
use curveboard::config::Config;
use curveboard::ingest::raw_log::RawEventLog;
use curveboard::ingest::{EventNormalizer, FeedConnection, HttpMetadataFetcher};
use curveboard::pipeline::IngestPipeline;
use curveboard::pricing::PriceRefresher;
use curveboard::store::TokenStore;

struct ServiceOrchestrator {
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<(&'static str, JoinHandle<Result<()>>)>,
}

impl ServiceOrchestrator {
    fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            shutdown_tx,
            tasks: Vec::new(),
        }
    }

    async fn start_all_services(&mut self, config: Arc<Config>) -> Result<()> {
        info!("🚀 Starting all Curveboard services");

        let store = Arc::new(RwLock::new(TokenStore::new(&config)));
        let raw_log = Arc::new(RwLock::new(RawEventLog::new(config.raw_log_capacity)));
        let (events_tx, events_rx) = mpsc::channel(config.event_queue_depth);

        // Feed Service
        let (feed, connected_rx) = FeedConnection::new(&config, events_tx.clone());
        let feed_shutdown = self.shutdown_tx.subscribe();
        self.tasks.push((
            "feed",
            tokio::spawn(async move {
                info!("🌊 Token feed service starting");
                feed.run(feed_shutdown).await
            }),
        ));

        // Pipeline Service
        let pipeline = IngestPipeline::new(
            store.clone(),
            raw_log.clone(),
            EventNormalizer::new(&config),
            Arc::new(HttpMetadataFetcher::new()),
            events_tx.clone(),
        );
        let pipeline_shutdown = self.shutdown_tx.subscribe();
        self.tasks.push((
            "pipeline",
            tokio::spawn(async move {
                info!("🔄 Ingest pipeline starting");
                pipeline.run(events_rx, pipeline_shutdown).await
            }),
        ));

        // Price Refresh Service
        let refresher = PriceRefresher::new(&config, store.clone(), events_tx);
        let refresher_shutdown = self.shutdown_tx.subscribe();
        self.tasks.push((
            "pricing",
            tokio::spawn(async move {
                info!("💰 Price refresh service starting");
                refresher.run(refresher_shutdown).await
            }),
        ));

        // API Service
        let state = Arc::new(AppState::new(store, raw_log, connected_rx, config));
        let api_shutdown = self.shutdown_tx.subscribe();
        self.tasks.push((
            "api",
            tokio::spawn(async move { api::serve(state, api_shutdown).await }),
        ));

        info!("✅ All {} services started successfully", self.tasks.len());
        Ok(())
    }

    async fn shutdown_all(&mut self) -> Result<()> {
        info!("🛑 Shutting down all services");
        let _ = self.shutdown_tx.send(());

        for (name, task) in self.tasks.drain(..) {
            match task.await {
                Ok(Ok(())) => info!("✅ Service '{}' shut down cleanly", name),
                Ok(Err(e)) => warn!("⚠️  Service '{}' error during shutdown: {}", name, e),
                Err(e) => error!("❌ Service '{}' task failed: {}", name, e),
            }
        }

        info!("✅ All services shut down successfully");
        Ok(())
    }
}

fn init_tracing() {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_level(true)
        .compact();

    tracing_subscriber::registry()
        .with(console_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("📈 Curveboard - Token Launch Dashboard Backend");
    info!("==============================================");

    let config = Arc::new(Config::load());
    info!(feed = %config.feed_url, listen = %config.listen_addr, "Configuration loaded");

    let mut orchestrator = ServiceOrchestrator::new();
    orchestrator.start_all_services(config).await?;
    info!("Press Ctrl+C to shutdown all services");

    match signal::ctrl_c().await {
        Ok(()) => info!("🛑 Shutdown signal received"),
        Err(e) => error!("Failed to listen for shutdown signal: {}", e),
    }

    orchestrator.shutdown_all().await?;

    info!("👋 Curveboard shutdown complete");
    Ok(())
}
