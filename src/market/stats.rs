//! Aggregate marketplace statistics.
//!
//! The individual figures (floor, highest sale, total volume) live in the
//! look-aside cache without a TTL and are nudged incrementally as events
//! apply; a cache miss falls back to an exact recompute from the store. The
//! combined summary object is cached for a short window and dropped by every
//! nudge so readers converge quickly after a sale.

use std::time::Duration;

use sqlx::PgPool;

use crate::amount::Wei;
use crate::cache::LookAsideCache;
use crate::db;
use crate::error::MarketError;
use crate::types::{MarketStats, StatsFigure};

/// Lifetime of the combined summary object.
pub const SUMMARY_TTL: Duration = Duration::from_secs(60);

/// Which slice of the market a stats figure describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatsScope {
    /// All FID listings (the home-chain identity market).
    Fid,
    /// NFT listings on one chain, optionally narrowed to a single token.
    Token {
        chain_id: i32,
        token_id: Option<String>,
    },
}

impl StatsScope {
    fn suffix(&self) -> String {
        match self {
            StatsScope::Fid => String::new(),
            StatsScope::Token { chain_id, token_id } => match token_id {
                Some(token) => format!(":{token}:{chain_id}"),
                None => format!(":-1:{chain_id}"),
            },
        }
    }
}

pub fn floor_key(scope: &StatsScope) -> String {
    format!("marketplace:stats:floor{}", scope.suffix())
}

pub fn highest_sale_key(scope: &StatsScope) -> String {
    format!("marketplace:stats:highestSale{}", scope.suffix())
}

pub fn total_volume_key(scope: &StatsScope) -> String {
    format!("marketplace:stats:totalVolume{}", scope.suffix())
}

pub fn summary_key(scope: &StatsScope) -> String {
    format!("marketplace:getStats{}", scope.suffix())
}

/// New floor to write after a listing, if the cached figure should move.
/// An absent figure stays absent; the next read recomputes it exactly.
pub fn nudged_floor(current: Option<Wei>, listed: Wei) -> Option<Wei> {
    match current {
        Some(floor) if listed < floor => Some(listed),
        _ => None,
    }
}

/// New highest sale to write after a sale, if the cached figure should move.
pub fn nudged_highest_sale(current: Option<Wei>, sale: Wei) -> Option<Wei> {
    match current {
        Some(high) if sale > high => Some(sale),
        _ => None,
    }
}

/// New running volume after a sale. Only an already-cached figure is
/// advanced; a miss is left for the exact recompute.
pub fn nudged_volume(current: Option<Wei>, sale: Wei) -> Option<Wei> {
    current.map(|volume| volume.saturating_add(sale))
}

/// Apply a Listed event to the cached figures.
pub async fn nudge_listed(cache: &LookAsideCache, scope: &StatsScope, amount: Wei) {
    let key = floor_key(scope);
    let current: Option<Wei> = cache.get(&key).await;
    if let Some(floor) = nudged_floor(current, amount) {
        cache.set(&key, &floor, None).await;
    }
    cache.delete(&summary_key(scope)).await;
}

/// Apply a sale (Bought or OfferApproved) to the cached figures.
pub async fn nudge_sale(cache: &LookAsideCache, scope: &StatsScope, amount: Wei) {
    let sale_key = highest_sale_key(scope);
    let current: Option<Wei> = cache.get(&sale_key).await;
    if let Some(high) = nudged_highest_sale(current, amount) {
        cache.set(&sale_key, &high, None).await;
    }

    let volume_key = total_volume_key(scope);
    let current: Option<Wei> = cache.get(&volume_key).await;
    if let Some(volume) = nudged_volume(current, amount) {
        cache.set(&volume_key, &volume, None).await;
    }

    cache.delete(&summary_key(scope)).await;
}

/// Exact figures, bypassing the summary cache. Individual figures still read
/// through the look-aside cache and repopulate it on miss.
pub struct RawStats {
    pub floor: Wei,
    pub highest_offer: Wei,
    pub highest_sale: Wei,
    pub total_volume: Wei,
    pub last_fid: Option<i64>,
}

pub async fn compute_stats(
    pool: &PgPool,
    cache: &LookAsideCache,
    scope: &StatsScope,
) -> Result<RawStats, MarketError> {
    let floor = match cache.get::<Wei>(&floor_key(scope)).await {
        Some(floor) => floor,
        None => {
            let listing = match scope {
                StatsScope::Fid => db::listings::fid_floor_listing(pool).await?,
                StatsScope::Token { chain_id, token_id } => {
                    db::listings::token_floor_listing(pool, *chain_id, token_id.as_deref()).await?
                }
            };
            let floor = listing
                .map(|l| l.min_fee.parse().unwrap_or(Wei::ZERO))
                .unwrap_or(Wei::ZERO);
            if !floor.is_zero() {
                cache.set(&floor_key(scope), &floor, None).await;
            }
            floor
        }
    };

    // The highest live offer expires on its own deadline, so it is never
    // cached; it is read fresh on every recompute.
    let highest_offer = match scope {
        StatsScope::Fid => db::offers::highest_fid_offer(pool).await?,
        StatsScope::Token { chain_id, token_id } => {
            db::offers::highest_token_offer(pool, *chain_id, token_id.as_deref()).await?
        }
    }
    .map(|o| o.amount.parse().unwrap_or(Wei::ZERO))
    .unwrap_or(Wei::ZERO);

    let highest_sale = match cache.get::<Wei>(&highest_sale_key(scope)).await {
        Some(high) => high,
        None => {
            let max = match scope {
                StatsScope::Fid => db::activity_log::max_fid_sale_price(pool).await?,
                StatsScope::Token { chain_id, token_id } => {
                    db::activity_log::max_token_sale_price(pool, *chain_id, token_id.as_deref())
                        .await?
                }
            };
            let high = max
                .map(|p| p.parse().unwrap_or(Wei::ZERO))
                .unwrap_or(Wei::ZERO);
            if !high.is_zero() {
                cache.set(&highest_sale_key(scope), &high, None).await;
            }
            high
        }
    };

    let total_volume = match cache.get::<Wei>(&total_volume_key(scope)).await {
        Some(volume) => volume,
        None => {
            let sum = match scope {
                StatsScope::Fid => db::activity_log::fid_sale_volume(pool).await?,
                StatsScope::Token { chain_id, token_id } => {
                    db::activity_log::token_sale_volume(pool, *chain_id, token_id.as_deref())
                        .await?
                }
            };
            let volume = sum
                .map(|s| s.parse().unwrap_or(Wei::ZERO))
                .unwrap_or(Wei::ZERO);
            if !volume.is_zero() {
                cache.set(&total_volume_key(scope), &volume, None).await;
            }
            volume
        }
    };

    let last_fid = match scope {
        StatsScope::Fid => db::activity_log::last_sold_fid(pool).await?,
        StatsScope::Token { .. } => None,
    };

    Ok(RawStats {
        floor,
        highest_offer,
        highest_sale,
        total_volume,
        last_fid,
    })
}

fn figure(wei: Wei, usd_rate: u64) -> StatsFigure {
    StatsFigure {
        usd: wei.mul_rate(usd_rate).format_usd(),
        wei: wei.to_string(),
    }
}

/// Decorate raw wei figures with their USD equivalents.
pub fn decorate(raw: &RawStats, usd_rate: u64) -> MarketStats {
    MarketStats {
        floor: figure(raw.floor, usd_rate),
        highest_offer: figure(raw.highest_offer, usd_rate),
        highest_sale: figure(raw.highest_sale, usd_rate),
        total_volume: figure(raw.total_volume, usd_rate),
        last_fid: raw.last_fid.map(|fid| fid.to_string()),
    }
}
