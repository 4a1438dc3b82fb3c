/// Normalizes heterogeneous feed payloads into canonical token records
///
/// The feed does not guarantee a schema: creation events arrive under several
/// shapes and field spellings depending on the upstream source. Extraction is
/// driven by ordered alias tables, first match wins.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::debug;

use crate::config::{CategoryThresholds, Config};
use crate::core::types::{
    categorize, TokenRecord, DEFAULT_CREATOR, DEFAULT_TOKEN_IMAGE, DEFAULT_TOKEN_NAME,
    DEFAULT_TOKEN_SYMBOL,
};
use crate::curve;

const MINT_ALIASES: &[&str] = &["mint", "token", "address", "ca"];
const NAME_ALIASES: &[&str] = &["name", "tokenName"];
const SYMBOL_ALIASES: &[&str] = &["symbol", "tokenSymbol"];
const CREATOR_ALIASES: &[&str] = &[
    "traderpublickey",
    "traderPublicKey",
    "trader_public_key",
    "creator",
    "user",
    "deployer",
    "authority",
];
const URI_ALIASES: &[&str] = &["uri", "metadata_uri", "metadataUri"];
const PRICE_ALIASES: &[&str] = &["price", "initialPrice", "sol_amount", "priceInSol"];
const MARKET_CAP_ALIASES: &[&str] = &["market_cap", "marketCap", "fdv", "usd_market_cap", "mcap"];
const LIQUIDITY_ALIASES: &[&str] = &["liquidity", "liquidityPool", "liquidityUsd"];
const TIMESTAMP_ALIASES: &[&str] = &["timestamp", "blockTime", "created_timestamp"];
const SUPPLY_ALIASES: &[&str] = &["supply", "totalSupply"];

const METADATA_FETCH_TIMEOUT_SECS: u64 = 10;

/// Off-band metadata document referenced by a creation event.
#[derive(Debug, Clone, Default)]
pub struct TokenMetadata {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
}

/// Injected metadata-fetch capability. A failed fetch is `None`, never an
/// error for the event being normalized.
#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, uri: &str) -> Option<TokenMetadata>;
}

pub struct HttpMetadataFetcher {
    client: reqwest::Client,
}

impl HttpMetadataFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(METADATA_FETCH_TIMEOUT_SECS))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

impl Default for HttpMetadataFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, uri: &str) -> Option<TokenMetadata> {
        let response = match self.client.get(uri).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(uri = %uri, error = %e, "Metadata fetch failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(uri = %uri, status = %response.status(), "Metadata fetch rejected");
            return None;
        }

        match response.json::<Value>().await {
            Ok(body) => Some(metadata_from_json(&body)),
            Err(e) => {
                debug!(uri = %uri, error = %e, "Metadata body was not JSON");
                None
            }
        }
    }
}

fn metadata_from_json(body: &Value) -> TokenMetadata {
    // Social links live either at the top level or under an `extensions` block.
    let social = |key: &str| {
        non_empty(body.get(key))
            .or_else(|| non_empty(body.get("extensions").and_then(|e| e.get(key))))
    };

    TokenMetadata {
        name: non_empty(body.get("name")),
        symbol: non_empty(body.get("symbol")),
        description: non_empty(body.get("description")),
        image: non_empty(body.get("image")),
        twitter: social("twitter"),
        telegram: social("telegram"),
        website: social("website"),
    }
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_string(obj: &Value, aliases: &[&str]) -> Option<String> {
    aliases.iter().find_map(|key| non_empty(obj.get(*key)))
}

/// Accepts plain numbers and money-formatted strings ("$1,234.56").
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse()
            .ok(),
        _ => None,
    }
}

fn first_numeric(obj: &Value, aliases: &[&str]) -> Option<f64> {
    aliases
        .iter()
        .find_map(|key| obj.get(*key).and_then(numeric_value))
}

fn first_present<'a>(obj: &'a Value, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|key| obj.get(*key))
        .filter(|v| !v.is_null())
}

fn tagged_create(obj: &Value) -> bool {
    ["type", "method", "txType"]
        .iter()
        .any(|key| obj.get(*key).and_then(Value::as_str) == Some("create"))
}

/// Shape heuristics for recognizing a token-creation event. Anything that does
/// not match is ignored upstream, not treated as an error.
pub fn is_creation_event(raw: &Value) -> bool {
    if tagged_create(raw) {
        return true;
    }
    if raw.get("data").map(tagged_create).unwrap_or(false) {
        return true;
    }
    if raw.get("tokenData").map(|v| !v.is_null()).unwrap_or(false) {
        return true;
    }
    if raw.get("method").and_then(Value::as_str) == Some("subscribeNewToken")
        && raw.get("data").is_some()
    {
        return true;
    }
    // Bare payloads: a mint plus some creator identity is enough.
    (raw.get("mint").is_some() && raw.get("creator").is_some())
        || (raw.get("token").is_some() && raw.get("user").is_some())
}

/// Peels the wrappers some sources nest the token payload under.
fn unwrap_creation(raw: &Value) -> &Value {
    if tagged_create(raw) {
        return raw;
    }
    if let Some(data) = raw.get("data") {
        if tagged_create(data) {
            return data;
        }
    }
    if let Some(token_data) = raw.get("tokenData") {
        if !token_data.is_null() {
            return token_data;
        }
    }
    raw
}

#[derive(Debug, Clone)]
pub struct EventNormalizer {
    assumed_supply: f64,
    thresholds: CategoryThresholds,
}

impl EventNormalizer {
    pub fn new(config: &Config) -> Self {
        Self {
            assumed_supply: config.assumed_token_supply,
            thresholds: config.thresholds,
        }
    }

    /// Maps one raw payload into a token record candidate. Returns `None` for
    /// unrecognized shapes or when no mint can be extracted; both are skips,
    /// not failures.
    pub async fn normalize(
        &self,
        raw: &Value,
        fetcher: &dyn MetadataFetcher,
    ) -> Option<TokenRecord> {
        if !is_creation_event(raw) {
            return None;
        }

        let info = unwrap_creation(raw);

        let mint = match first_string(info, MINT_ALIASES) {
            Some(mint) => mint,
            None => {
                debug!("No mint address in creation event, skipping");
                return None;
            }
        };

        let raw_name = first_string(info, NAME_ALIASES);
        let raw_symbol = first_string(info, SYMBOL_ALIASES);
        let raw_description = non_empty(info.get("description"));
        let creator =
            first_string(info, CREATOR_ALIASES).unwrap_or_else(|| DEFAULT_CREATOR.to_string());
        let metadata_uri = first_string(info, URI_ALIASES);

        let price = first_numeric(info, PRICE_ALIASES).filter(|p| *p > 0.0);
        let liquidity = first_numeric(info, LIQUIDITY_ALIASES);

        // Explicit market cap wins; an unparseable one counts as zero and the
        // price-based estimate below takes over.
        let mut market_cap_value = first_present(info, MARKET_CAP_ALIASES)
            .and_then(numeric_value)
            .unwrap_or(0.0);
        if market_cap_value == 0.0 {
            if let Some(price) = price {
                let supply = first_numeric(info, SUPPLY_ALIASES)
                    .filter(|s| *s > 0.0)
                    .unwrap_or(self.assumed_supply);
                market_cap_value = price * supply;
            }
        }

        let created_timestamp = first_numeric(info, TIMESTAMP_ALIASES)
            .map(|t| t as i64)
            .unwrap_or_else(|| Utc::now().timestamp_millis());

        let bonding_curve_key = curve::resolve_bonding_curve(&mint, raw);

        let metadata = match &metadata_uri {
            Some(uri) => fetcher.fetch(uri).await.unwrap_or_default(),
            None => TokenMetadata::default(),
        };

        let category = categorize(market_cap_value, &self.thresholds);

        Some(TokenRecord {
            mint,
            name: metadata
                .name
                .or(raw_name)
                .unwrap_or_else(|| DEFAULT_TOKEN_NAME.to_string()),
            symbol: metadata
                .symbol
                .or(raw_symbol)
                .unwrap_or_else(|| DEFAULT_TOKEN_SYMBOL.to_string()),
            description: metadata.description.or(raw_description).unwrap_or_default(),
            image: metadata
                .image
                .unwrap_or_else(|| DEFAULT_TOKEN_IMAGE.to_string()),
            metadata_uri,
            creator,
            bonding_curve_key,
            price,
            market_cap_value,
            liquidity,
            created_timestamp,
            twitter: metadata.twitter,
            telegram: metadata.telegram,
            website: metadata.website,
            category,
        })
    }
}
