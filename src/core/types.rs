use serde::{Deserialize, Serialize};

use crate::config::CategoryThresholds;

pub const DEFAULT_TOKEN_NAME: &str = "Unknown Token";
pub const DEFAULT_TOKEN_SYMBOL: &str = "UNKNOWN";
pub const DEFAULT_CREATOR: &str = "Unknown";
pub const DEFAULT_TOKEN_IMAGE: &str = "/placeholder.svg?height=48&width=48";

/// Lifecycle bucket, always derived from the current market cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    New,
    Bonding,
    Graduated,
}

pub fn categorize(market_cap_value: f64, thresholds: &CategoryThresholds) -> Category {
    if market_cap_value >= thresholds.graduated {
        Category::Graduated
    } else if market_cap_value >= thresholds.bonding {
        Category::Bonding
    } else {
        Category::New
    }
}

/// Canonical representation of one launched token, keyed by mint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub mint: String,
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub image: String,
    pub metadata_uri: Option<String>,
    pub creator: String,
    /// Monotonic: once set, later events must not clear or replace it.
    pub bonding_curve_key: Option<String>,
    pub price: Option<f64>,
    pub market_cap_value: f64,
    pub liquidity: Option<f64>,
    /// Epoch milliseconds, source-provided or ingestion-time fallback.
    pub created_timestamp: i64,
    pub twitter: Option<String>,
    pub telegram: Option<String>,
    pub website: Option<String>,
    pub category: Category,
}

/// Price refresh payload applied to an existing record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub price: f64,
    pub market_cap: Option<f64>,
    pub liquidity: Option<f64>,
}

/// Read-only projections recomputed after every store mutation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TokenViews {
    pub all: Vec<TokenRecord>,
    pub new: Vec<TokenRecord>,
    pub bonding: Vec<TokenRecord>,
    pub graduated: Vec<TokenRecord>,
    pub trending: Vec<TokenRecord>,
}

impl TokenRecord {
    /// A bare record with placeholder display fields, used as the merge base.
    pub fn new(mint: String, created_timestamp: i64) -> Self {
        Self {
            mint,
            name: DEFAULT_TOKEN_NAME.to_string(),
            symbol: DEFAULT_TOKEN_SYMBOL.to_string(),
            description: String::new(),
            image: DEFAULT_TOKEN_IMAGE.to_string(),
            metadata_uri: None,
            creator: DEFAULT_CREATOR.to_string(),
            bonding_curve_key: None,
            price: None,
            market_cap_value: 0.0,
            liquidity: None,
            created_timestamp,
            twitter: None,
            telegram: None,
            website: None,
            category: Category::New,
        }
    }
}
