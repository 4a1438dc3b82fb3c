/// Periodic batch price refresh via the DexScreener token API
///
/// Results are routed through the pipeline queue as `Price` events rather
/// than written to the store directly, preserving the single-writer rule.

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::types::PriceUpdate;
use crate::pipeline::{PipelineEvent, SharedStore};

const BATCH_SIZE: usize = 30;
const API_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Deserialize)]
struct DexScreenerResponse {
    pairs: Option<Vec<TokenPair>>,
}

#[derive(Debug, Deserialize)]
struct TokenPair {
    #[serde(rename = "baseToken")]
    base_token: BaseToken,
    #[serde(rename = "priceUsd")]
    price_usd: Option<String>,
    fdv: Option<f64>,
    #[serde(rename = "marketCap")]
    market_cap: Option<f64>,
    liquidity: Option<Liquidity>,
}

#[derive(Debug, Deserialize)]
struct BaseToken {
    address: String,
}

#[derive(Debug, Deserialize)]
struct Liquidity {
    usd: Option<f64>,
}

pub struct PriceRefresher {
    api_url: String,
    refresh_interval: Duration,
    client: reqwest::Client,
    store: SharedStore,
    events_tx: mpsc::Sender<PipelineEvent>,
}

impl PriceRefresher {
    pub fn new(
        config: &Config,
        store: SharedStore,
        events_tx: mpsc::Sender<PipelineEvent>,
    ) -> Self {
        Self {
            api_url: config.price_api_url.clone(),
            refresh_interval: Duration::from_secs(config.price_refresh_secs),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(API_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client"),
            store,
            events_tx,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        let mut ticker = interval(self.refresh_interval);
        info!(interval_secs = self.refresh_interval.as_secs(), "Price refresher started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.refresh_once().await {
                        Ok(0) => {}
                        Ok(sent) => debug!(updates = sent, "Price refresh complete"),
                        Err(e) => warn!(error = %e, "Price refresh failed"),
                    }
                }
                _ = shutdown.recv() => {
                    info!("🛑 Price refresher shutting down gracefully");
                    return Ok(());
                }
            }
        }
    }

    async fn refresh_once(&self) -> Result<usize> {
        let mints = self.store.read().await.mints();
        if mints.is_empty() {
            return Ok(0);
        }

        let mut sent = 0;
        for chunk in mints.chunks(BATCH_SIZE) {
            let url = format!("{}/{}", self.api_url, chunk.join(","));
            let response = match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => response,
                Ok(response) => {
                    warn!(status = %response.status(), "Price API rejected batch");
                    continue;
                }
                Err(e) => {
                    warn!(error = %e, "Price API request failed");
                    continue;
                }
            };

            let body: DexScreenerResponse = response
                .json()
                .await
                .context("Failed to decode price API response")?;

            for (mint, update) in updates_from_response(&body) {
                if self
                    .events_tx
                    .send(PipelineEvent::Price { mint, update })
                    .await
                    .is_err()
                {
                    warn!("Pipeline queue closed, stopping price refresh");
                    return Ok(sent);
                }
                sent += 1;
            }
        }

        Ok(sent)
    }
}

/// One update per mint; the first (most liquid) pair listed wins.
fn updates_from_response(response: &DexScreenerResponse) -> Vec<(String, PriceUpdate)> {
    let mut seen = HashSet::new();
    let mut updates = Vec::new();

    for pair in response.pairs.as_deref().unwrap_or_default() {
        let mint = pair.base_token.address.clone();
        if !seen.insert(mint.clone()) {
            continue;
        }
        let Some(price) = pair
            .price_usd
            .as_deref()
            .and_then(|p| p.parse::<f64>().ok())
        else {
            continue;
        };
        updates.push((
            mint,
            PriceUpdate {
                price,
                market_cap: pair.market_cap.or(pair.fdv),
                liquidity: pair.liquidity.as_ref().and_then(|l| l.usd),
            },
        ));
    }

    updates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_pair_per_mint_wins() {
        let body = r#"{
            "schemaVersion": "1.0.0",
            "pairs": [
                {"baseToken": {"address": "mint-a", "name": "A", "symbol": "A"},
                 "priceUsd": "0.0021", "fdv": 2100000.0,
                 "liquidity": {"usd": 50000.0}},
                {"baseToken": {"address": "mint-a", "name": "A", "symbol": "A"},
                 "priceUsd": "0.0019"},
                {"baseToken": {"address": "mint-b", "name": "B", "symbol": "B"},
                 "priceUsd": "1.5", "marketCap": 9000.0}
            ]
        }"#;
        let response: DexScreenerResponse = serde_json::from_str(body).unwrap();
        let updates = updates_from_response(&response);

        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].0, "mint-a");
        assert_eq!(updates[0].1.price, 0.0021);
        assert_eq!(updates[0].1.market_cap, Some(2_100_000.0));
        assert_eq!(updates[0].1.liquidity, Some(50_000.0));
        assert_eq!(updates[1].1.market_cap, Some(9_000.0));
    }

    #[test]
    fn pairs_without_price_are_skipped() {
        let body = r#"{"schemaVersion": "1.0.0", "pairs": [
            {"baseToken": {"address": "mint-a", "name": "A", "symbol": "A"}}
        ]}"#;
        let response: DexScreenerResponse = serde_json::from_str(body).unwrap();
        assert!(updates_from_response(&response).is_empty());
    }

    #[test]
    fn missing_pairs_array_yields_no_updates() {
        let response: DexScreenerResponse =
            serde_json::from_str(r#"{"schemaVersion": "1.0.0", "pairs": null}"#).unwrap();
        assert!(updates_from_response(&response).is_empty());
    }
}
