/// Bounded, ordered token store with merge-on-insert semantics

pub mod views;

use chrono::Utc;
use tracing::debug;

use crate::config::{CategoryThresholds, Config, TrendingConfig};
use crate::core::types::{
    categorize, PriceUpdate, TokenRecord, TokenViews, DEFAULT_CREATOR, DEFAULT_TOKEN_IMAGE,
    DEFAULT_TOKEN_NAME, DEFAULT_TOKEN_SYMBOL,
};

/// Newest-first collection of token records keyed by mint, capped at a fixed
/// capacity. All mutations go through `insert` / `apply_price_update`, both of
/// which leave the derived views consistent before returning.
#[derive(Debug)]
pub struct TokenStore {
    records: Vec<TokenRecord>,
    views: TokenViews,
    capacity: usize,
    assumed_supply: f64,
    thresholds: CategoryThresholds,
    trending: TrendingConfig,
}

impl TokenStore {
    pub fn new(config: &Config) -> Self {
        Self {
            records: Vec::with_capacity(config.store_capacity),
            views: TokenViews::default(),
            capacity: config.store_capacity,
            assumed_supply: config.assumed_token_supply,
            thresholds: config.thresholds,
            trending: config.trending,
        }
    }

    /// Inserts a candidate record, merging into an existing record with the
    /// same mint. New mints are prepended; the oldest records are evicted past
    /// capacity.
    pub fn insert(&mut self, candidate: TokenRecord) {
        match self.records.iter_mut().find(|r| r.mint == candidate.mint) {
            Some(existing) => {
                merge(existing, candidate, &self.thresholds);
            }
            None => {
                self.records.insert(0, candidate);
                self.records.truncate(self.capacity);
            }
        }
        self.recompute_views();
    }

    /// Applies a price refresh to an existing record. Unknown mints are a
    /// logged no-op; evicted tokens keep reporting prices for a while.
    pub fn apply_price_update(&mut self, mint: &str, update: &PriceUpdate) {
        let Some(record) = self.records.iter_mut().find(|r| r.mint == mint) else {
            debug!(mint = %mint, "Price update for unknown mint, ignoring");
            return;
        };

        record.price = Some(update.price);
        if let Some(market_cap) = update.market_cap {
            record.market_cap_value = market_cap;
            record.category = categorize(market_cap, &self.thresholds);
        }
        if let Some(liquidity) = update.liquidity {
            record.liquidity = Some(liquidity);
        }

        self.recompute_views();
    }

    pub fn views(&self) -> &TokenViews {
        &self.views
    }

    pub fn get(&self, mint: &str) -> Option<&TokenRecord> {
        self.records.iter().find(|r| r.mint == mint)
    }

    pub fn mints(&self) -> Vec<String> {
        self.records.iter().map(|r| r.mint.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn recompute_views(&mut self) {
        self.views = views::project(
            &self.records,
            self.assumed_supply,
            &self.trending,
            Utc::now().timestamp_millis(),
        );
    }
}

/// Field-level merge for a duplicate creation event. The candidate wins on
/// explicit non-default values; the stored bonding-curve key never regresses
/// to empty, and the first-seen creation timestamp is kept.
fn merge(existing: &mut TokenRecord, candidate: TokenRecord, thresholds: &CategoryThresholds) {
    if !candidate.name.is_empty() && candidate.name != DEFAULT_TOKEN_NAME {
        existing.name = candidate.name;
    }
    if !candidate.symbol.is_empty() && candidate.symbol != DEFAULT_TOKEN_SYMBOL {
        existing.symbol = candidate.symbol;
    }
    if !candidate.description.is_empty() {
        existing.description = candidate.description;
    }
    if candidate.image != DEFAULT_TOKEN_IMAGE {
        existing.image = candidate.image;
    }
    if candidate.creator != DEFAULT_CREATOR {
        existing.creator = candidate.creator;
    }
    if candidate.metadata_uri.is_some() {
        existing.metadata_uri = candidate.metadata_uri;
    }
    if candidate.bonding_curve_key.is_some() && existing.bonding_curve_key.is_none() {
        existing.bonding_curve_key = candidate.bonding_curve_key;
    }
    if candidate.price.is_some() {
        existing.price = candidate.price;
    }
    if candidate.market_cap_value > 0.0 {
        existing.market_cap_value = candidate.market_cap_value;
    }
    if candidate.liquidity.is_some() {
        existing.liquidity = candidate.liquidity;
    }
    if candidate.twitter.is_some() {
        existing.twitter = candidate.twitter;
    }
    if candidate.telegram.is_some() {
        existing.telegram = candidate.telegram;
    }
    if candidate.website.is_some() {
        existing.website = candidate.website;
    }

    existing.category = categorize(existing.market_cap_value, thresholds);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Category;

    fn store() -> TokenStore {
        TokenStore::new(&Config::default())
    }

    fn candidate(mint: &str) -> TokenRecord {
        TokenRecord::new(mint.to_string(), 1_700_000_000_000)
    }

    #[test]
    fn insert_is_idempotent_for_same_mint() {
        let mut store = store();
        let mut rec = candidate("mint-a");
        rec.bonding_curve_key = Some("curve-a".to_string());

        store.insert(rec.clone());
        store.insert(rec);

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("mint-a").unwrap().bonding_curve_key.as_deref(),
            Some("curve-a")
        );
    }

    #[test]
    fn merge_never_clears_bonding_curve_key() {
        let mut store = store();
        let mut first = candidate("mint-a");
        first.bonding_curve_key = Some("curve-a".to_string());
        store.insert(first);

        // Late duplicate without a key must not regress the stored one.
        let second = candidate("mint-a");
        assert!(second.bonding_curve_key.is_none());
        store.insert(second);

        assert_eq!(
            store.get("mint-a").unwrap().bonding_curve_key.as_deref(),
            Some("curve-a")
        );
    }

    #[test]
    fn merge_takes_newer_non_default_values() {
        let mut store = store();
        store.insert(candidate("mint-a"));

        let mut update = candidate("mint-a");
        update.name = "Named".to_string();
        update.symbol = "NMD".to_string();
        update.market_cap_value = 60_000.0;
        update.created_timestamp = 999; // must not replace first-seen timestamp
        store.insert(update);

        let merged = store.get("mint-a").unwrap();
        assert_eq!(merged.name, "Named");
        assert_eq!(merged.symbol, "NMD");
        assert_eq!(merged.category, Category::Graduated);
        assert_eq!(merged.created_timestamp, 1_700_000_000_000);
    }

    #[test]
    fn default_fields_do_not_overwrite_real_ones() {
        let mut store = store();
        let mut first = candidate("mint-a");
        first.name = "Real".to_string();
        first.creator = "alice".to_string();
        store.insert(first);

        store.insert(candidate("mint-a"));

        let merged = store.get("mint-a").unwrap();
        assert_eq!(merged.name, "Real");
        assert_eq!(merged.creator, "alice");
    }

    #[test]
    fn store_growth_is_bounded_with_oldest_evicted() {
        let mut store = store();
        for i in 0..151 {
            store.insert(candidate(&format!("mint-{i}")));
        }
        assert_eq!(store.len(), 150);
        assert!(store.get("mint-0").is_none());
        assert!(store.get("mint-1").is_some());
        assert!(store.get("mint-150").is_some());
        // Newest first.
        assert_eq!(store.views().all[0].mint, "mint-150");
    }

    #[test]
    fn price_update_reclassifies_token() {
        let mut store = store();
        let mut rec = candidate("mint-a");
        rec.market_cap_value = 20_000.0;
        rec.category = Category::Bonding;
        store.insert(rec);

        store.apply_price_update(
            "mint-a",
            &PriceUpdate {
                price: 0.00005,
                market_cap: Some(60_000.0),
                liquidity: None,
            },
        );

        let updated = store.get("mint-a").unwrap();
        assert_eq!(updated.price, Some(0.00005));
        assert_eq!(updated.market_cap_value, 60_000.0);
        assert_eq!(updated.category, Category::Graduated);
        assert_eq!(store.views().graduated.len(), 1);
        assert!(store.views().bonding.is_empty());
    }

    #[test]
    fn price_update_for_unknown_mint_is_a_noop() {
        let mut store = store();
        store.insert(candidate("mint-a"));
        store.apply_price_update(
            "missing",
            &PriceUpdate {
                price: 1.0,
                market_cap: Some(100.0),
                liquidity: None,
            },
        );
        assert_eq!(store.len(), 1);
        assert!(store.get("mint-a").unwrap().price.is_none());
    }

    #[test]
    fn views_are_recomputed_on_every_mutation() {
        let mut store = store();
        let mut rec = candidate("mint-a");
        rec.market_cap_value = 15_000.0;
        rec.category = Category::Bonding;
        store.insert(rec);
        assert_eq!(store.views().bonding.len(), 1);
        assert_eq!(store.views().all.len(), 1);
        assert_eq!(store.views().trending.len(), 1);
    }
}
