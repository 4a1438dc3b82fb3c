/// PumpPortal websocket feed connection
///
/// Maintains one duplex connection, subscribes to new-token events on open,
/// and forwards every JSON text frame into the pipeline queue. Drops are never
/// fatal: the connectivity flag flips false and the connection is retried
/// after a fixed delay, indefinitely.

use std::time::Duration;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::sleep;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};
use url::Url;

use crate::config::Config;
use crate::pipeline::PipelineEvent;

pub struct FeedConnection {
    url: String,
    reconnect_delay: Duration,
    events_tx: mpsc::Sender<PipelineEvent>,
    connected_tx: watch::Sender<bool>,
}

impl FeedConnection {
    pub fn new(
        config: &Config,
        events_tx: mpsc::Sender<PipelineEvent>,
    ) -> (Self, watch::Receiver<bool>) {
        let (connected_tx, connected_rx) = watch::channel(false);
        let feed = Self {
            url: config.feed_url.clone(),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
            events_tx,
            connected_tx,
        };
        (feed, connected_rx)
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        loop {
            match self.connect_and_stream(&mut shutdown).await {
                Ok(StreamEnd::Shutdown) => {
                    info!("🛑 Feed connection shutting down gracefully");
                    return Ok(());
                }
                Ok(StreamEnd::Closed) => {
                    warn!("Feed connection closed by remote");
                }
                Err(e) => {
                    warn!(error = %e, "Feed connection failed");
                }
            }

            let _ = self.connected_tx.send(false);

            tokio::select! {
                _ = sleep(self.reconnect_delay) => {}
                _ = shutdown.recv() => {
                    info!("🛑 Feed connection shutting down gracefully");
                    return Ok(());
                }
            }
        }
    }

    async fn connect_and_stream(&self, shutdown: &mut broadcast::Receiver<()>) -> Result<StreamEnd> {
        Url::parse(&self.url).context("Failed to parse feed URL")?;
        info!(url = %self.url, "Connecting to token feed");

        let (ws_stream, _response) = connect_async(self.url.as_str())
            .await
            .context("Failed to connect to feed")?;
        let (mut write, mut read) = ws_stream.split();

        // Single subscription request on open.
        let subscribe = serde_json::json!({ "method": "subscribeNewToken" });
        write
            .send(Message::Text(subscribe.to_string()))
            .await
            .context("Failed to send subscription request")?;

        let _ = self.connected_tx.send(true);
        info!("✅ Feed connected, subscribed to new token events");

        loop {
            tokio::select! {
                message = read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            if let Some(confirmation) = subscription_confirmation(&text) {
                                info!("✅ {}", confirmation);
                                continue;
                            }
                            match serde_json::from_str::<Value>(&text) {
                                Ok(raw) => {
                                    if self.events_tx.send(PipelineEvent::Raw(raw)).await.is_err() {
                                        warn!("Pipeline queue closed, stopping feed");
                                        return Ok(StreamEnd::Closed);
                                    }
                                }
                                Err(e) => {
                                    debug!(error = %e, "Non-JSON feed frame ignored");
                                }
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "Feed sent close frame");
                            return Ok(StreamEnd::Closed);
                        }
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(other)) => {
                            debug!(?other, "Unexpected feed frame ignored");
                        }
                        Some(Err(e)) => {
                            return Err(e).context("Feed receive error");
                        }
                        None => return Ok(StreamEnd::Closed),
                    }
                }
                _ = shutdown.recv() => {
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(StreamEnd::Shutdown);
                }
            }
        }
    }
}

enum StreamEnd {
    Closed,
    Shutdown,
}

fn subscription_confirmation(text: &str) -> Option<String> {
    if text.contains("Successfully subscribed") {
        if let Ok(json) = serde_json::from_str::<Value>(text) {
            return json
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
        }
    }
    None
}
