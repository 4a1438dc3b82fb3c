/// Pure projection of the record set into the UI-facing views
///
/// Recomputed in full after every store mutation. The working set is bounded,
/// so a full pass is cheap and keeps the views trivially consistent.

use crate::config::TrendingConfig;
use crate::core::types::{Category, TokenRecord, TokenViews};

pub fn project(
    records: &[TokenRecord],
    assumed_supply: f64,
    trending_cfg: &TrendingConfig,
    now_ms: i64,
) -> TokenViews {
    let mut views = TokenViews {
        all: records.to_vec(),
        ..Default::default()
    };

    for record in records {
        match record.category {
            Category::Bonding => views.bonding.push(record.clone()),
            Category::Graduated => views.graduated.push(record.clone()),
            Category::New => views.new.push(record.clone()),
        }
    }

    views.trending = trending(records, assumed_supply, trending_cfg, now_ms);
    views
}

fn recently_created(record: &TokenRecord, cfg: &TrendingConfig, now_ms: i64) -> bool {
    record.created_timestamp > now_ms - cfg.recent_window_ms
}

/// Ranked list: tokens with a known market cap, plus fresh tokens whose cap is
/// estimated from price, sorted by cap descending. Thin lists are backfilled
/// with the newest remaining tokens.
fn trending(
    records: &[TokenRecord],
    assumed_supply: f64,
    cfg: &TrendingConfig,
    now_ms: i64,
) -> Vec<TokenRecord> {
    let mut ranked: Vec<TokenRecord> = records
        .iter()
        .filter(|r| {
            r.market_cap_value > 0.0 || (r.price.is_some() && recently_created(r, cfg, now_ms))
        })
        .map(|r| {
            let mut entry = r.clone();
            if entry.market_cap_value == 0.0 {
                if let Some(price) = entry.price {
                    entry.market_cap_value = price * assumed_supply;
                }
            }
            entry
        })
        .collect();

    // Stable sort preserves insertion order among equal caps.
    ranked.sort_by(|a, b| {
        b.market_cap_value
            .partial_cmp(&a.market_cap_value)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    if ranked.len() < cfg.min_qualified {
        let take = cfg.backfill_cap.saturating_sub(ranked.len());
        let mut recent: Vec<TokenRecord> = records
            .iter()
            .filter(|r| {
                recently_created(r, cfg, now_ms) && !ranked.iter().any(|t| t.mint == r.mint)
            })
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.created_timestamp.cmp(&a.created_timestamp));
        ranked.extend(recent.into_iter().take(take));
    }

    ranked.truncate(cfg.cap);
    ranked
}
