//! End-to-end ingestion: raw feed frame through the queue into the store.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::sleep;

use curveboard::config::Config;
use curveboard::core::types::Category;
use curveboard::ingest::raw_log::RawEventLog;
use curveboard::ingest::normalizer::{EventNormalizer, MetadataFetcher, TokenMetadata};
use curveboard::pipeline::{IngestPipeline, PipelineEvent};
use curveboard::store::TokenStore;

struct StubFetcher;

#[async_trait]
impl MetadataFetcher for StubFetcher {
    async fn fetch(&self, _uri: &str) -> Option<TokenMetadata> {
        Some(TokenMetadata {
            name: Some("Frog Coin".to_string()),
            image: Some("https://cdn.example/frog.png".to_string()),
            twitter: Some("https://x.com/frogcoin".to_string()),
            ..Default::default()
        })
    }
}

#[tokio::test]
async fn raw_creation_event_lands_in_store_and_views() {
    let config = Config::default();
    let store = Arc::new(RwLock::new(TokenStore::new(&config)));
    let raw_log = Arc::new(RwLock::new(RawEventLog::new(config.raw_log_capacity)));
    let (events_tx, events_rx) = mpsc::channel(config.event_queue_depth);
    let (shutdown_tx, _) = broadcast::channel(4);

    let pipeline = IngestPipeline::new(
        store.clone(),
        raw_log.clone(),
        EventNormalizer::new(&config),
        Arc::new(StubFetcher),
        events_tx.clone(),
    );
    let handle = tokio::spawn(pipeline.run(events_rx, shutdown_tx.subscribe()));

    let frame = json!({
        "txType": "create",
        "mint": "FrogMint1111111111111111111111111111111111111",
        "name": "frog",
        "symbol": "FROG",
        "traderPublicKey": "Dev11111111111111111111111111111111111111111",
        "uri": "https://ipfs.example/frog.json",
        "marketCap": 25000.0,
        "timestamp": 1700000000000i64
    });
    events_tx.send(PipelineEvent::Raw(frame)).await.unwrap();

    // Normalization is asynchronous; poll until the record is applied.
    let mut applied = false;
    for _ in 0..50 {
        if store.read().await.len() == 1 {
            applied = true;
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert!(applied, "record never reached the store");

    {
        let store = store.read().await;
        let record = store
            .get("FrogMint1111111111111111111111111111111111111")
            .expect("record present");
        // Metadata document fields take precedence over the raw frame.
        assert_eq!(record.name, "Frog Coin");
        assert_eq!(record.symbol, "FROG");
        assert_eq!(record.image, "https://cdn.example/frog.png");
        assert_eq!(record.twitter.as_deref(), Some("https://x.com/frogcoin"));
        assert_eq!(record.market_cap_value, 25_000.0);
        assert_eq!(record.category, Category::Bonding);
        assert_eq!(record.created_timestamp, 1_700_000_000_000);

        let views = store.views();
        assert_eq!(views.all.len(), 1);
        assert_eq!(views.bonding.len(), 1);
        assert!(views.new.is_empty());
        assert!(views.graduated.is_empty());
    }

    assert_eq!(raw_log.read().await.snapshot().len(), 1);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn non_creation_frames_are_logged_but_not_stored() {
    let config = Config::default();
    let store = Arc::new(RwLock::new(TokenStore::new(&config)));
    let raw_log = Arc::new(RwLock::new(RawEventLog::new(config.raw_log_capacity)));
    let (events_tx, events_rx) = mpsc::channel(config.event_queue_depth);
    let (shutdown_tx, _) = broadcast::channel(4);

    let pipeline = IngestPipeline::new(
        store.clone(),
        raw_log.clone(),
        EventNormalizer::new(&config),
        Arc::new(StubFetcher),
        events_tx.clone(),
    );
    let handle = tokio::spawn(pipeline.run(events_rx, shutdown_tx.subscribe()));

    events_tx
        .send(PipelineEvent::Raw(
            json!({ "message": "Successfully subscribed to token creation events." }),
        ))
        .await
        .unwrap();

    sleep(Duration::from_millis(100)).await;

    assert_eq!(store.read().await.len(), 0);
    assert_eq!(raw_log.read().await.snapshot().len(), 1);

    shutdown_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();
}
