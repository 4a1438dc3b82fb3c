/// Single-consumer ingestion pipeline
///
/// All store mutations flow through one bounded queue drained by one task, so
/// the store only ever sees fully-merged records. Normalization may suspend on
/// the metadata fetch; its completion is re-enqueued as an `Apply` event
/// instead of touching the store from the spawned task.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::core::types::{PriceUpdate, TokenRecord};
use crate::ingest::normalizer::{EventNormalizer, MetadataFetcher};
use crate::ingest::raw_log::RawEventLog;
use crate::store::TokenStore;

pub type SharedStore = Arc<RwLock<TokenStore>>;
pub type SharedRawLog = Arc<RwLock<RawEventLog>>;

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Raw payload straight off the feed.
    Raw(Value),
    /// Completed normalization ready to be applied to the store.
    Apply(TokenRecord),
    /// Batch price refresh result for one mint.
    Price { mint: String, update: PriceUpdate },
}

pub struct IngestPipeline {
    store: SharedStore,
    raw_log: SharedRawLog,
    normalizer: EventNormalizer,
    fetcher: Arc<dyn MetadataFetcher>,
    events_tx: mpsc::Sender<PipelineEvent>,
}

impl IngestPipeline {
    pub fn new(
        store: SharedStore,
        raw_log: SharedRawLog,
        normalizer: EventNormalizer,
        fetcher: Arc<dyn MetadataFetcher>,
        events_tx: mpsc::Sender<PipelineEvent>,
    ) -> Self {
        Self {
            store,
            raw_log,
            normalizer,
            fetcher,
            events_tx,
        }
    }

    pub async fn run(
        self,
        mut events_rx: mpsc::Receiver<PipelineEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> anyhow::Result<()> {
        info!("Ingest pipeline started");
        loop {
            tokio::select! {
                event = events_rx.recv() => {
                    match event {
                        Some(event) => self.handle(event).await,
                        None => {
                            warn!("Pipeline queue closed, stopping");
                            return Ok(());
                        }
                    }
                }
                _ = shutdown.recv() => {
                    info!("🛑 Ingest pipeline shutting down gracefully");
                    return Ok(());
                }
            }
        }
    }

    async fn handle(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::Raw(raw) => {
                self.raw_log.write().await.push(raw.clone());

                let normalizer = self.normalizer.clone();
                let fetcher = self.fetcher.clone();
                let events_tx = self.events_tx.clone();
                // The metadata fetch may take a while; run it off the consumer
                // and route the result back through the queue.
                tokio::spawn(async move {
                    if let Some(record) = normalizer.normalize(&raw, fetcher.as_ref()).await {
                        if events_tx.send(PipelineEvent::Apply(record)).await.is_err() {
                            debug!("Pipeline queue closed before apply");
                        }
                    }
                });
            }
            PipelineEvent::Apply(record) => {
                debug!(mint = %record.mint, symbol = %record.symbol, "Applying token record");
                self.store.write().await.insert(record);
            }
            PipelineEvent::Price { mint, update } => {
                self.store.write().await.apply_price_update(&mint, &update);
            }
        }
    }
}
