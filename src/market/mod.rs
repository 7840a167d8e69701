//! The marketplace event-indexing engine.
//!
//! Every write path is driven by a transaction hash: the engine polls for the
//! receipt, decodes the marketplace events out of its logs, applies them to
//! the store, and appends one ledger entry per transaction. The ledger's
//! unique (tx_hash, chain_id) index is the idempotency barrier; replays
//! short-circuit to canonical state without touching the chain.

pub mod stats;

use std::collections::BTreeMap;
use std::time::Duration;

use alloy::consensus::TxReceipt as _;
use alloy::primitives::{TxHash, U256};
use chrono::Utc;
use sqlx::PgPool;

use crate::amount::Wei;
use crate::cache::LookAsideCache;
use crate::chain::events::{self, MarketEvent, TargetId};
use crate::chain::provider::{self, ChainConfig, FID_HOME_CHAIN_ID, NFT_CHAIN_IDS};
use crate::chain::receipt;
use crate::db;
use crate::error::MarketError;
use crate::types::{
    ActivityEntry, ActivityPage, ActivityQueryParams, Appraisal, AppraisalValue, AppraiseRequest,
    EventType, HistoricalSalePoint, HistoricalSalesParams, Listing, MarketStats, NewActivityEntry,
    NewListing, NewOffer, Offer, OffersQueryParams,
};

use stats::StatsScope;

const ETH_USD_KEY: &str = "ethToUsd";
const ETH_USD_TTL: Duration = Duration::from_secs(300);

/// Appraisal placeholder until someone appraises: 0.001 ETH.
const APPRAISAL_SEED_WEI: u64 = 1_000_000_000_000_000;

fn listing_key(fid: i64) -> String {
    format!("listing:{fid}")
}

fn token_listing_key(token_id: &str, chain_id: i32) -> String {
    format!("listing:-1:{token_id}:{chain_id}")
}

fn best_offer_key(fid: i64) -> String {
    format!("bestOffer:{fid}")
}

fn token_best_offer_key(token_id: &str, chain_id: i32) -> String {
    format!("bestOffer:-1:{token_id}:{chain_id}")
}

fn appraisal_key(fid: i64) -> String {
    format!("appraisal:{fid}")
}

/// Deadline as stored. A deadline wider than the signed 64-bit column is
/// effectively forever, so it saturates to the far future.
pub fn db_deadline(deadline: u64) -> i64 {
    i64::try_from(deadline).unwrap_or(i64::MAX)
}

/// Target of the receipt's `Canceled` event. No such event means the
/// transaction did not cancel a FID listing.
pub fn fid_cancel_target(events: &[MarketEvent]) -> Result<i64, MarketError> {
    events
        .iter()
        .find_map(|e| match e {
            MarketEvent::Canceled {
                target: TargetId::Fid(fid),
                ..
            } => Some(*fid),
            _ => None,
        })
        .ok_or(MarketError::State("FID not listed"))
}

pub fn token_cancel_target(events: &[MarketEvent]) -> Result<String, MarketError> {
    events
        .iter()
        .find_map(|e| match e {
            MarketEvent::Canceled {
                target: TargetId::Token(token),
                ..
            } => Some(token.clone()),
            _ => None,
        })
        .ok_or(MarketError::State("Token not listed"))
}

/// Fold one appraisal into the cached running aggregate.
pub fn accumulate_appraisal(current: &AppraisalValue, amount: Wei) -> AppraisalValue {
    let total = current
        .total_sum
        .parse::<Wei>()
        .unwrap_or(Wei::ZERO)
        .saturating_add(amount);
    let count = current.count + 1;
    let average = Wei::new(total.as_u256() / U256::from(count));
    AppraisalValue {
        total_sum: total.to_string(),
        count,
        average: average.to_string(),
    }
}

/// Appraisal placeholder for a FID nobody has appraised yet.
pub fn seed_appraisal() -> AppraisalValue {
    let seed = Wei::from_u64(APPRAISAL_SEED_WEI);
    AppraisalValue {
        total_sum: seed.to_string(),
        count: 1,
        average: seed.to_string(),
    }
}

pub struct Marketplace {
    pool: PgPool,
    cache: LookAsideCache,
    chains: Vec<ChainConfig>,
    http: reqwest::Client,
}

impl Marketplace {
    pub fn new(pool: PgPool, chains: Vec<ChainConfig>) -> Self {
        Marketplace {
            cache: LookAsideCache::new(pool.clone()),
            pool,
            chains,
            http: reqwest::Client::new(),
        }
    }

    fn config_for(&self, chain_id: i32) -> Result<&ChainConfig, MarketError> {
        self.chains
            .iter()
            .find(|c| c.chain_id == chain_id)
            .ok_or(MarketError::UnsupportedChain(chain_id))
    }

    /// Receipt events from the FID marketplace on its home chain.
    async fn fid_receipt_events(&self, hash: TxHash) -> Result<Vec<MarketEvent>, MarketError> {
        let config = self.config_for(FID_HOME_CHAIN_ID)?;
        let provider = provider::create_provider(config)?;
        let rcpt = receipt::wait_for_receipt(&provider, hash).await?;
        Ok(events::decode_fid_logs(rcpt.inner.logs()))
    }

    /// Receipt events from the NFT marketplace on the given chain. Only logs
    /// emitted by the configured marketplace contract are considered.
    async fn token_receipt_events(
        &self,
        chain_id: i32,
        hash: TxHash,
    ) -> Result<Vec<MarketEvent>, MarketError> {
        let config = self.config_for(chain_id)?;
        let Some(marketplace) = config.nft_marketplace else {
            return Err(MarketError::UnsupportedChain(chain_id));
        };
        let provider = provider::create_provider(config)?;
        let rcpt = receipt::wait_for_receipt(&provider, hash).await?;
        Ok(events::decode_nft_logs(rcpt.inner.logs(), marketplace))
    }

    async fn replay(
        &self,
        tx: &str,
        chain_id: i32,
    ) -> Result<Option<ActivityEntry>, MarketError> {
        Ok(db::activity_log::find_by_tx(&self.pool, tx, chain_id).await?)
    }

    /// Append to the ledger, falling back to the winner's entry when a
    /// concurrent request recorded the transaction first.
    async fn record(&self, entry: NewActivityEntry) -> Result<ActivityEntry, MarketError> {
        match db::activity_log::append(&self.pool, &entry).await? {
            Some(row) => Ok(row),
            None => db::activity_log::find_by_tx(&self.pool, &entry.tx_hash, entry.chain_id)
                .await?
                .ok_or(MarketError::State("transaction not recorded")),
        }
    }

    fn spawn_nudge_listed(&self, scope: StatsScope, amount: Wei) {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            stats::nudge_listed(&cache, &scope, amount).await;
        });
    }

    fn spawn_nudge_sale(&self, scope: StatsScope, amount: Wei) {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            stats::nudge_sale(&cache, &scope, amount).await;
        });
    }

    // ─── FID Transactions ──────────────────────────────────────────────

    /// Returns the canonical listing row; replaying a processed transaction
    /// reads it back without touching the chain.
    pub async fn list(&self, tx_hash: &str) -> Result<Listing, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        let chain_id = FID_HOME_CHAIN_ID;
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            return db::listings::find_fid_listing(&self.pool, entry.fid)
                .await?
                .ok_or(MarketError::State("FID not listed"));
        }

        let events = self.fid_receipt_events(hash).await?;
        let Some((fid, owner, amount, deadline)) = events.iter().find_map(|e| match e {
            MarketEvent::Listed {
                target: TargetId::Fid(fid),
                owner,
                amount,
                deadline,
            } => Some((*fid, *owner, *amount, *deadline)),
            _ => None,
        }) else {
            return Err(MarketError::State("FID not listed"));
        };

        let listing = db::listings::upsert_listing(
            &self.pool,
            &NewListing {
                fid,
                token_id: None,
                chain_id,
                owner_address: events::format_address(owner),
                min_fee: amount.padded(),
                deadline: db_deadline(deadline),
                tx_hash: tx.clone(),
            },
        )
        .await?;

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::Listed,
                fid,
                token_id: None,
                chain_id,
                actor: Some(events::format_address(owner)),
                price: Some(amount.padded()),
                referrer: None,
                tx_hash: tx,
            })
            .await?;

        self.cache.delete(&listing_key(fid)).await;
        self.spawn_nudge_listed(StatsScope::Fid, amount);

        tracing::info!(fid, chain_id, tx_hash = %entry.tx_hash, "fid listed");
        Ok(listing)
    }

    pub async fn buy(&self, tx_hash: &str) -> Result<ActivityEntry, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        let chain_id = FID_HOME_CHAIN_ID;
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            return Ok(entry);
        }

        let events = self.fid_receipt_events(hash).await?;
        let Some((fid, buyer, amount)) = events.iter().find_map(|e| match e {
            MarketEvent::Bought {
                target: TargetId::Fid(fid),
                buyer,
                amount,
            } => Some((*fid, *buyer, *amount)),
            _ => None,
        }) else {
            return Err(MarketError::State("FID not bought"));
        };
        let referrer = events::find_referrer(&events).map(events::format_address);

        // The listing may already be gone if it expired; the sale still
        // counts.
        db::listings::close_fid_listing(&self.pool, fid, &tx).await?;

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::Bought,
                fid,
                token_id: None,
                chain_id,
                actor: Some(events::format_address(buyer)),
                price: Some(amount.padded()),
                referrer,
                tx_hash: tx,
            })
            .await?;

        self.cache.delete(&listing_key(fid)).await;
        self.cache.delete_background(&best_offer_key(fid));
        self.cache
            .delete_background(&stats::floor_key(&StatsScope::Fid));
        self.spawn_nudge_sale(StatsScope::Fid, amount);

        tracing::info!(fid, chain_id, tx_hash = %entry.tx_hash, "fid bought");
        Ok(entry)
    }

    pub async fn offer(&self, tx_hash: &str) -> Result<ActivityEntry, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        let chain_id = FID_HOME_CHAIN_ID;
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            return Ok(entry);
        }

        let events = self.fid_receipt_events(hash).await?;
        let Some((fid, buyer, amount, deadline)) = events.iter().find_map(|e| match e {
            MarketEvent::OfferMade {
                target: TargetId::Fid(fid),
                buyer,
                amount,
                deadline,
            } => Some((*fid, *buyer, *amount, *deadline)),
            _ => None,
        }) else {
            return Err(MarketError::State("FID not offered"));
        };

        db::offers::upsert_offer(
            &self.pool,
            &NewOffer {
                buyer_address: events::format_address(buyer),
                fid,
                token_id: None,
                chain_id,
                amount: amount.padded(),
                deadline: db_deadline(deadline),
                tx_hash: tx.clone(),
            },
        )
        .await?;

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::OfferMade,
                fid,
                token_id: None,
                chain_id,
                actor: Some(events::format_address(buyer)),
                price: Some(amount.padded()),
                referrer: None,
                tx_hash: tx,
            })
            .await?;

        self.cache.delete(&best_offer_key(fid)).await;

        tracing::info!(fid, chain_id, tx_hash = %entry.tx_hash, "fid offer made");
        Ok(entry)
    }

    pub async fn cancel_offer(&self, tx_hash: &str) -> Result<ActivityEntry, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        let chain_id = FID_HOME_CHAIN_ID;
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            return Ok(entry);
        }

        let events = self.fid_receipt_events(hash).await?;
        let Some((fid, buyer)) = events.iter().find_map(|e| match e {
            MarketEvent::OfferCanceled {
                target: TargetId::Fid(fid),
                buyer,
            } => Some((*fid, *buyer)),
            _ => None,
        }) else {
            return Err(MarketError::State("FID offer not canceled"));
        };

        let buyer_address = events::format_address(buyer);
        let closed = db::offers::close_fid_offer(&self.pool, fid, &buyer_address, &tx).await?;

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::OfferCanceled,
                fid,
                token_id: None,
                chain_id,
                actor: Some(buyer_address),
                price: closed.map(|o| o.amount),
                referrer: None,
                tx_hash: tx,
            })
            .await?;

        self.cache.delete(&best_offer_key(fid)).await;

        tracing::info!(fid, chain_id, tx_hash = %entry.tx_hash, "fid offer canceled");
        Ok(entry)
    }

    pub async fn approve_offer(&self, tx_hash: &str) -> Result<ActivityEntry, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        let chain_id = FID_HOME_CHAIN_ID;
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            return Ok(entry);
        }

        let events = self.fid_receipt_events(hash).await?;
        let Some((fid, buyer)) = events.iter().find_map(|e| match e {
            MarketEvent::OfferApproved {
                target: TargetId::Fid(fid),
                buyer,
                ..
            } => Some((*fid, *buyer)),
            _ => None,
        }) else {
            return Err(MarketError::State("FID offer not approved"));
        };
        let referrer = events::find_referrer(&events).map(events::format_address);

        // The FID contract does not emit the approved amount; it comes from
        // the stored offer.
        let buyer_address = events::format_address(buyer);
        let Some(offer) = db::offers::close_fid_offer(&self.pool, fid, &buyer_address, &tx).await?
        else {
            return Err(MarketError::State("FID not offered"));
        };
        let amount: Wei = offer.amount.parse().unwrap_or(Wei::ZERO);

        db::listings::close_fid_listing(&self.pool, fid, &tx).await?;

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::OfferApproved,
                fid,
                token_id: None,
                chain_id,
                actor: Some(buyer_address),
                price: Some(amount.padded()),
                referrer,
                tx_hash: tx,
            })
            .await?;

        self.cache.delete(&listing_key(fid)).await;
        self.cache.delete(&best_offer_key(fid)).await;
        self.cache
            .delete_background(&stats::floor_key(&StatsScope::Fid));
        self.spawn_nudge_sale(StatsScope::Fid, amount);

        tracing::info!(fid, chain_id, tx_hash = %entry.tx_hash, "fid offer approved");
        Ok(entry)
    }

    pub async fn cancel_listing(&self, tx_hash: &str) -> Result<ActivityEntry, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        let chain_id = FID_HOME_CHAIN_ID;
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            return Ok(entry);
        }

        let events = self.fid_receipt_events(hash).await?;
        let fid = fid_cancel_target(&events)?;

        let Some(listing) = db::listings::close_fid_listing(&self.pool, fid, &tx).await? else {
            return Err(MarketError::State("FID not listed"));
        };

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::Canceled,
                fid,
                token_id: None,
                chain_id,
                actor: Some(listing.owner_address),
                price: None,
                referrer: None,
                tx_hash: tx,
            })
            .await?;

        self.cache.delete(&listing_key(fid)).await;
        self.cache
            .delete_background(&stats::floor_key(&StatsScope::Fid));
        self.cache
            .delete_background(&stats::summary_key(&StatsScope::Fid));

        tracing::info!(fid, chain_id, tx_hash = %entry.tx_hash, "fid listing canceled");
        Ok(entry)
    }

    // ─── NFT Transactions ──────────────────────────────────────────────

    /// Returns the canonical listing row, like [`Marketplace::list`].
    pub async fn list_token(
        &self,
        tx_hash: &str,
        chain_id: i32,
    ) -> Result<Listing, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            let token = entry
                .token_id
                .ok_or(MarketError::State("Token not listed"))?;
            return db::listings::find_token_listing(&self.pool, &token, chain_id)
                .await?
                .ok_or(MarketError::State("Token not listed"));
        }

        let events = self.token_receipt_events(chain_id, hash).await?;
        let Some((token, owner, amount, deadline)) = events.iter().find_map(|e| match e {
            MarketEvent::Listed {
                target: TargetId::Token(token),
                owner,
                amount,
                deadline,
            } => Some((token.clone(), *owner, *amount, *deadline)),
            _ => None,
        }) else {
            return Err(MarketError::State("Token not listed"));
        };

        let listing = db::listings::upsert_listing(
            &self.pool,
            &NewListing {
                fid: -1,
                token_id: Some(token.clone()),
                chain_id,
                owner_address: events::format_address(owner),
                min_fee: amount.padded(),
                deadline: db_deadline(deadline),
                tx_hash: tx.clone(),
            },
        )
        .await?;

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::Listed,
                fid: -1,
                token_id: Some(token.clone()),
                chain_id,
                actor: Some(events::format_address(owner)),
                price: Some(amount.padded()),
                referrer: None,
                tx_hash: tx,
            })
            .await?;

        self.cache.delete(&token_listing_key(&token, chain_id)).await;
        let scope = StatsScope::Token {
            chain_id,
            token_id: Some(token.clone()),
        };
        stats::nudge_listed(&self.cache, &scope, amount).await;

        tracing::info!(token_id = %token, chain_id, tx_hash = %entry.tx_hash, "token listed");
        Ok(listing)
    }

    pub async fn buy_token(
        &self,
        tx_hash: &str,
        chain_id: i32,
    ) -> Result<ActivityEntry, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            return Ok(entry);
        }

        let events = self.token_receipt_events(chain_id, hash).await?;
        let Some((token, buyer, amount)) = events.iter().find_map(|e| match e {
            MarketEvent::Bought {
                target: TargetId::Token(token),
                buyer,
                amount,
            } => Some((token.clone(), *buyer, *amount)),
            _ => None,
        }) else {
            return Err(MarketError::State("Token not bought"));
        };
        let referrer = events::find_referrer(&events).map(events::format_address);

        db::listings::close_token_listing(&self.pool, &token, chain_id, &tx).await?;

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::Bought,
                fid: -1,
                token_id: Some(token.clone()),
                chain_id,
                actor: Some(events::format_address(buyer)),
                price: Some(amount.padded()),
                referrer,
                tx_hash: tx,
            })
            .await?;

        let scope = StatsScope::Token {
            chain_id,
            token_id: Some(token.clone()),
        };
        self.cache.delete(&token_listing_key(&token, chain_id)).await;
        self.cache
            .delete_background(&token_best_offer_key(&token, chain_id));
        self.cache.delete_background(&stats::floor_key(&scope));
        stats::nudge_sale(&self.cache, &scope, amount).await;

        tracing::info!(token_id = %token, chain_id, tx_hash = %entry.tx_hash, "token bought");
        Ok(entry)
    }

    pub async fn offer_token(
        &self,
        tx_hash: &str,
        chain_id: i32,
    ) -> Result<ActivityEntry, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            return Ok(entry);
        }

        let events = self.token_receipt_events(chain_id, hash).await?;
        let Some((token, buyer, amount, deadline)) = events.iter().find_map(|e| match e {
            MarketEvent::OfferMade {
                target: TargetId::Token(token),
                buyer,
                amount,
                deadline,
            } => Some((token.clone(), *buyer, *amount, *deadline)),
            _ => None,
        }) else {
            return Err(MarketError::State("Token not offered"));
        };

        db::offers::upsert_offer(
            &self.pool,
            &NewOffer {
                buyer_address: events::format_address(buyer),
                fid: -1,
                token_id: Some(token.clone()),
                chain_id,
                amount: amount.padded(),
                deadline: db_deadline(deadline),
                tx_hash: tx.clone(),
            },
        )
        .await?;

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::OfferMade,
                fid: -1,
                token_id: Some(token.clone()),
                chain_id,
                actor: Some(events::format_address(buyer)),
                price: Some(amount.padded()),
                referrer: None,
                tx_hash: tx,
            })
            .await?;

        self.cache
            .delete(&token_best_offer_key(&token, chain_id))
            .await;

        tracing::info!(token_id = %token, chain_id, tx_hash = %entry.tx_hash, "token offer made");
        Ok(entry)
    }

    pub async fn cancel_token_offer(
        &self,
        tx_hash: &str,
        chain_id: i32,
    ) -> Result<ActivityEntry, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            return Ok(entry);
        }

        let events = self.token_receipt_events(chain_id, hash).await?;
        let Some((token, buyer)) = events.iter().find_map(|e| match e {
            MarketEvent::OfferCanceled {
                target: TargetId::Token(token),
                buyer,
            } => Some((token.clone(), *buyer)),
            _ => None,
        }) else {
            return Err(MarketError::State("Token offer not canceled"));
        };

        let buyer_address = events::format_address(buyer);
        let closed =
            db::offers::close_token_offer(&self.pool, &token, chain_id, &buyer_address, &tx)
                .await?;

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::OfferCanceled,
                fid: -1,
                token_id: Some(token.clone()),
                chain_id,
                actor: Some(buyer_address),
                price: closed.map(|o| o.amount),
                referrer: None,
                tx_hash: tx,
            })
            .await?;

        self.cache
            .delete(&token_best_offer_key(&token, chain_id))
            .await;

        tracing::info!(token_id = %token, chain_id, tx_hash = %entry.tx_hash, "token offer canceled");
        Ok(entry)
    }

    pub async fn approve_token_offer(
        &self,
        tx_hash: &str,
        chain_id: i32,
    ) -> Result<ActivityEntry, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            return Ok(entry);
        }

        let events = self.token_receipt_events(chain_id, hash).await?;
        let Some((token, buyer, emitted)) = events.iter().find_map(|e| match e {
            MarketEvent::OfferApproved {
                target: TargetId::Token(token),
                buyer,
                amount,
            } => Some((token.clone(), *buyer, *amount)),
            _ => None,
        }) else {
            return Err(MarketError::State("Token offer not approved"));
        };
        let referrer = events::find_referrer(&events).map(events::format_address);

        let buyer_address = events::format_address(buyer);
        let closed =
            db::offers::close_token_offer(&self.pool, &token, chain_id, &buyer_address, &tx)
                .await?;
        let amount = match emitted {
            Some(amount) => amount,
            None => match closed {
                Some(offer) => offer.amount.parse().unwrap_or(Wei::ZERO),
                None => return Err(MarketError::State("Token not offered")),
            },
        };

        db::listings::close_token_listing(&self.pool, &token, chain_id, &tx).await?;

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::OfferApproved,
                fid: -1,
                token_id: Some(token.clone()),
                chain_id,
                actor: Some(buyer_address),
                price: Some(amount.padded()),
                referrer,
                tx_hash: tx,
            })
            .await?;

        let scope = StatsScope::Token {
            chain_id,
            token_id: Some(token.clone()),
        };
        self.cache.delete(&token_listing_key(&token, chain_id)).await;
        self.cache
            .delete(&token_best_offer_key(&token, chain_id))
            .await;
        self.cache.delete_background(&stats::floor_key(&scope));
        stats::nudge_sale(&self.cache, &scope, amount).await;

        tracing::info!(token_id = %token, chain_id, tx_hash = %entry.tx_hash, "token offer approved");
        Ok(entry)
    }

    pub async fn cancel_token_listing(
        &self,
        tx_hash: &str,
        chain_id: i32,
    ) -> Result<ActivityEntry, MarketError> {
        let hash = receipt::parse_tx_hash(tx_hash)?;
        let tx = format!("{hash:#x}");
        if let Some(entry) = self.replay(&tx, chain_id).await? {
            return Ok(entry);
        }

        let events = self.token_receipt_events(chain_id, hash).await?;
        let token = token_cancel_target(&events)?;

        let Some(listing) =
            db::listings::close_token_listing(&self.pool, &token, chain_id, &tx).await?
        else {
            return Err(MarketError::State("Token not listed"));
        };

        let entry = self
            .record(NewActivityEntry {
                event_type: EventType::Canceled,
                fid: -1,
                token_id: Some(token.clone()),
                chain_id,
                actor: Some(listing.owner_address),
                price: None,
                referrer: None,
                tx_hash: tx,
            })
            .await?;

        let scope = StatsScope::Token {
            chain_id,
            token_id: Some(token.clone()),
        };
        self.cache.delete(&token_listing_key(&token, chain_id)).await;
        self.cache.delete_background(&stats::floor_key(&scope));
        self.cache.delete_background(&stats::summary_key(&scope));

        tracing::info!(token_id = %token, chain_id, tx_hash = %entry.tx_hash, "token listing canceled");
        Ok(entry)
    }

    // ─── Reads ─────────────────────────────────────────────────────────

    pub async fn get_listing(&self, fid: i64) -> Result<Option<Listing>, MarketError> {
        let key = listing_key(fid);
        if let Some(listing) = self.cache.get::<Listing>(&key).await {
            return Ok(Some(listing));
        }
        let listing = db::listings::find_fid_listing(&self.pool, fid).await?;
        if let Some(ref l) = listing {
            self.cache.set(&key, l, None).await;
        }
        Ok(listing)
    }

    pub async fn get_token_listing(
        &self,
        token_id: &str,
        chain_id: i32,
    ) -> Result<Option<Listing>, MarketError> {
        if !NFT_CHAIN_IDS.contains(&chain_id) {
            return Err(MarketError::UnsupportedChain(chain_id));
        }
        let key = token_listing_key(token_id, chain_id);
        if let Some(listing) = self.cache.get::<Listing>(&key).await {
            return Ok(Some(listing));
        }
        let listing = db::listings::find_token_listing(&self.pool, token_id, chain_id).await?;
        if let Some(ref l) = listing {
            self.cache.set(&key, l, None).await;
        }
        Ok(listing)
    }

    pub async fn get_best_offer(&self, fid: i64) -> Result<Option<Offer>, MarketError> {
        let key = best_offer_key(fid);
        if let Some(offer) = self.cache.get::<Offer>(&key).await {
            return Ok(Some(offer));
        }
        let offer = db::offers::best_fid_offer(&self.pool, fid).await?;
        if let Some(ref o) = offer {
            self.cache.set(&key, o, None).await;
        }
        Ok(offer)
    }

    pub async fn get_best_token_offer(
        &self,
        token_id: &str,
        chain_id: i32,
    ) -> Result<Option<Offer>, MarketError> {
        if !NFT_CHAIN_IDS.contains(&chain_id) {
            return Err(MarketError::UnsupportedChain(chain_id));
        }
        let key = token_best_offer_key(token_id, chain_id);
        if let Some(offer) = self.cache.get::<Offer>(&key).await {
            return Ok(Some(offer));
        }
        let offer = db::offers::best_token_offer(&self.pool, token_id, chain_id).await?;
        if let Some(ref o) = offer {
            self.cache.set(&key, o, None).await;
        }
        Ok(offer)
    }

    pub async fn get_offers(
        &self,
        params: &OffersQueryParams,
    ) -> Result<Vec<Offer>, MarketError> {
        Ok(db::offers::get_offers(
            &self.pool,
            params.fid,
            params.buyer_address.as_deref(),
            params.token_id.as_deref(),
            params.chain_id,
        )
        .await?)
    }

    pub async fn get_offer(
        &self,
        fid: i64,
        buyer_address: &str,
    ) -> Result<Option<Offer>, MarketError> {
        Ok(db::offers::find_fid_offer(&self.pool, fid, buyer_address).await?)
    }

    pub async fn get_activities(
        &self,
        params: &ActivityQueryParams,
    ) -> Result<ActivityPage, MarketError> {
        let limit = params.limit();
        let before_id: Option<i32> = params.cursor.as_deref().and_then(|c| c.parse().ok());

        // First pages are hot (feeds poll them); cache briefly.
        let cache_key = if before_id.is_none() {
            Some(format!(
                "activities:{}:{}:{}:{}:{limit}",
                params.event_type.as_deref().unwrap_or("*"),
                params
                    .fid
                    .map(|f| f.to_string())
                    .unwrap_or_else(|| "*".to_string()),
                params.actor.as_deref().unwrap_or("*"),
                params.referrer.as_deref().unwrap_or("*"),
            ))
        } else {
            None
        };
        if let Some(ref key) = cache_key {
            if let Some(page) = self.cache.get::<ActivityPage>(key).await {
                return Ok(page);
            }
        }

        let activities = db::activity_log::get_activities(
            &self.pool,
            params.event_type.as_deref(),
            params.fid,
            params.actor.as_deref(),
            params.referrer.as_deref(),
            before_id,
            limit,
        )
        .await?;
        let next = if activities.len() as i64 == limit {
            activities.last().map(|a| a.id.to_string())
        } else {
            None
        };
        let page = ActivityPage { activities, next };
        if let Some(ref key) = cache_key {
            self.cache
                .set(key, &page, Some(Duration::from_secs(60)))
                .await;
        }
        Ok(page)
    }

    pub async fn get_stats(&self) -> Result<MarketStats, MarketError> {
        self.scoped_stats(StatsScope::Fid).await
    }

    pub async fn get_token_stats(
        &self,
        chain_id: i32,
        token_id: Option<String>,
    ) -> Result<MarketStats, MarketError> {
        if !NFT_CHAIN_IDS.contains(&chain_id) {
            return Err(MarketError::UnsupportedChain(chain_id));
        }
        self.scoped_stats(StatsScope::Token { chain_id, token_id })
            .await
    }

    async fn scoped_stats(&self, scope: StatsScope) -> Result<MarketStats, MarketError> {
        let key = stats::summary_key(&scope);
        if let Some(cached) = self.cache.get::<MarketStats>(&key).await {
            return Ok(cached);
        }
        let raw = stats::compute_stats(&self.pool, &self.cache, &scope).await?;
        let rate = self.eth_to_usd().await;
        let decorated = stats::decorate(&raw, rate);
        self.cache.set(&key, &decorated, Some(stats::SUMMARY_TTL)).await;
        Ok(decorated)
    }

    /// Whole-dollar ETH price, cached for five minutes. Degrades to zero on
    /// fetch failure so stats reads never fail on the price feed.
    pub async fn eth_to_usd(&self) -> u64 {
        if let Some(rate) = self.cache.get::<u64>(ETH_USD_KEY).await {
            return rate;
        }
        match self.fetch_eth_usd().await {
            Ok(rate) => {
                self.cache.set(ETH_USD_KEY, &rate, Some(ETH_USD_TTL)).await;
                rate
            }
            Err(err) => {
                tracing::warn!(error = %err, "eth price fetch failed");
                0
            }
        }
    }

    async fn fetch_eth_usd(&self) -> Result<u64, reqwest::Error> {
        #[derive(serde::Deserialize)]
        struct Spot {
            data: SpotData,
        }
        #[derive(serde::Deserialize)]
        struct SpotData {
            amount: String,
        }
        let spot: Spot = self
            .http
            .get("https://api.coinbase.com/v2/prices/ETH-USD/spot")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(spot.data.amount.parse::<f64>().unwrap_or(0.0) as u64)
    }

    /// The appraisal aggregate lives in the cache only; a FID nobody has
    /// appraised yet gets the seed value without a store round trip.
    pub async fn get_appraisal(&self, fid: i64) -> Result<AppraisalValue, MarketError> {
        if let Some(value) = self.cache.get::<AppraisalValue>(&appraisal_key(fid)).await {
            return Ok(value);
        }
        Ok(seed_appraisal())
    }

    pub async fn appraise(&self, req: &AppraiseRequest) -> Result<Appraisal, MarketError> {
        let amount: Wei = req
            .amount
            .parse()
            .map_err(|_| MarketError::State("invalid appraisal amount"))?;
        if amount.is_zero() || amount > Wei::from_eth(100_000) {
            return Err(MarketError::State("appraisal amount out of range"));
        }
        // Individual appraisals are kept as an audit trail; reads only ever
        // see the cached aggregate.
        let row = db::appraisals::insert_appraisal(
            &self.pool,
            req.fid,
            req.appraised_by.as_deref(),
            &amount.padded(),
        )
        .await?;
        let key = appraisal_key(req.fid);
        let current = self
            .cache
            .get::<AppraisalValue>(&key)
            .await
            .unwrap_or_else(seed_appraisal);
        self.cache
            .set(&key, &accumulate_appraisal(&current, amount), None)
            .await;
        Ok(row)
    }

    pub async fn get_historical_sales(
        &self,
        params: &HistoricalSalesParams,
    ) -> Result<Vec<HistoricalSalePoint>, MarketError> {
        let days = match params.timerange.as_deref() {
            Some("24h") => 1,
            Some("7d") => 7,
            Some("90d") => 90,
            Some("1y") => 365,
            _ => 30,
        };
        let since = Utc::now() - chrono::Duration::days(days);
        let rate = self.eth_to_usd().await;
        let sales = db::activity_log::sales_since(
            &self.pool,
            params.fid,
            params.token_id.as_deref(),
            params.chain_id,
            since,
        )
        .await?;

        // One point per UTC day, summing that day's sales.
        let mut daily: BTreeMap<i64, Wei> = BTreeMap::new();
        for sale in sales {
            let Some(price) = sale.price.as_deref().and_then(|p| p.parse::<Wei>().ok()) else {
                continue;
            };
            let Some(created) = sale.created_at else {
                continue;
            };
            let day = created.timestamp() - created.timestamp().rem_euclid(86_400);
            let total = daily.entry(day).or_insert(Wei::ZERO);
            *total = total.saturating_add(price);
        }

        Ok(daily
            .into_iter()
            .map(|(timestamp, total)| HistoricalSalePoint {
                timestamp,
                usd: total.mul_rate(rate).format_usd(),
            })
            .collect())
    }
}
