use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ─── Database Models ───────────────────────────────────────────────────

/// An offer-to-sell for a FID (fid >= 0, token_id NULL) or an NFT
/// (fid = -1, token_id + chain_id set). `min_fee` is stored zero-padded so
/// lexicographic order matches numeric order.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Listing {
    pub id: i32,
    pub fid: i64,
    pub token_id: Option<String>,
    pub chain_id: i32,
    pub owner_address: String,
    pub min_fee: String,
    pub deadline: i64,
    pub tx_hash: Option<String>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A bid on a listing target, unique per (target, buyer) while active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Offer {
    pub id: i32,
    pub buyer_address: String,
    pub fid: i64,
    pub token_id: Option<String>,
    pub chain_id: i32,
    pub amount: String,
    pub deadline: i64,
    pub tx_hash: Option<String>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// One row per processed transaction hash — the idempotency ledger and
/// audit trail. Unique on (tx_hash, chain_id), never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityEntry {
    pub id: i32,
    pub event_type: String,
    pub fid: i64,
    pub token_id: Option<String>,
    pub chain_id: i32,
    pub actor: Option<String>,
    pub price: Option<String>,
    pub referrer: Option<String>,
    pub tx_hash: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Upsert parameters for a listing. `token_id = None` means a FID listing
/// on the home chain; `Some` means an NFT listing on `chain_id`.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub fid: i64,
    pub token_id: Option<String>,
    pub chain_id: i32,
    pub owner_address: String,
    pub min_fee: String,
    pub deadline: i64,
    pub tx_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewOffer {
    pub buyer_address: String,
    pub fid: i64,
    pub token_id: Option<String>,
    pub chain_id: i32,
    pub amount: String,
    pub deadline: i64,
    pub tx_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewActivityEntry {
    pub event_type: EventType,
    pub fid: i64,
    pub token_id: Option<String>,
    pub chain_id: i32,
    pub actor: Option<String>,
    pub price: Option<String>,
    pub referrer: Option<String>,
    pub tx_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Appraisal {
    pub id: i32,
    pub fid: i64,
    pub appraised_by: Option<String>,
    pub amount: String,
    pub created_at: Option<DateTime<Utc>>,
}

// ─── Event Types ───────────────────────────────────────────────────────

/// The closed set of ledger event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Listed,
    Bought,
    Canceled,
    OfferMade,
    OfferCanceled,
    OfferApproved,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Listed => "Listed",
            EventType::Bought => "Bought",
            EventType::Canceled => "Canceled",
            EventType::OfferMade => "OfferMade",
            EventType::OfferCanceled => "OfferCanceled",
            EventType::OfferApproved => "OfferApproved",
        }
    }

    /// Event names counted as sales for stats purposes.
    pub const SALES: [&'static str; 2] = ["Bought", "OfferApproved"];
}

// ─── Requests ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRequest {
    pub tx_hash: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxChainRequest {
    pub tx_hash: String,
    pub chain_id: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppraiseRequest {
    pub fid: i64,
    pub appraised_by: Option<String>,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatsParams {
    pub token_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffersQueryParams {
    pub fid: Option<i64>,
    pub buyer_address: Option<String>,
    pub token_id: Option<String>,
    pub chain_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityQueryParams {
    pub event_type: Option<String>,
    pub fid: Option<i64>,
    pub actor: Option<String>,
    pub referrer: Option<String>,
    pub cursor: Option<String>,
    pub limit: Option<i64>,
}

impl ActivityQueryParams {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(20).clamp(1, 100)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSalesParams {
    pub fid: Option<i64>,
    pub token_id: Option<String>,
    pub chain_id: Option<i32>,
    pub timerange: Option<String>,
}

// ─── Responses ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsFigure {
    pub usd: String,
    pub wei: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketStats {
    pub floor: StatsFigure,
    pub highest_offer: StatsFigure,
    pub highest_sale: StatsFigure,
    pub total_volume: StatsFigure,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_fid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub success: bool,
    pub stats: MarketStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalValue {
    pub total_sum: String,
    pub count: u64,
    pub average: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPage {
    pub activities: Vec<ActivityEntry>,
    pub next: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSalePoint {
    pub timestamp: i64,
    pub usd: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
}
