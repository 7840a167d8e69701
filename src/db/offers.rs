use sqlx::PgPool;

use crate::types::{NewOffer, Offer};

/// Upsert an offer from an OfferMade event. One live offer per (target,
/// buyer); re-offering replaces the amount and revives a canceled row.
pub async fn upsert_offer(pool: &PgPool, o: &NewOffer) -> Result<Offer, sqlx::Error> {
    let query = if o.token_id.is_none() {
        r#"
        INSERT INTO offers
            (buyer_address, fid, token_id, chain_id, amount, deadline, tx_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (fid, buyer_address) WHERE token_id IS NULL DO UPDATE SET
            amount = EXCLUDED.amount,
            deadline = EXCLUDED.deadline,
            tx_hash = EXCLUDED.tx_hash,
            canceled_at = NULL,
            updated_at = NOW()
        RETURNING *
        "#
    } else {
        r#"
        INSERT INTO offers
            (buyer_address, fid, token_id, chain_id, amount, deadline, tx_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (token_id, chain_id, buyer_address) WHERE token_id IS NOT NULL DO UPDATE SET
            amount = EXCLUDED.amount,
            deadline = EXCLUDED.deadline,
            tx_hash = EXCLUDED.tx_hash,
            canceled_at = NULL,
            updated_at = NOW()
        RETURNING *
        "#
    };

    sqlx::query_as(query)
        .bind(&o.buyer_address)
        .bind(o.fid)
        .bind(&o.token_id)
        .bind(o.chain_id)
        .bind(&o.amount)
        .bind(o.deadline)
        .bind(&o.tx_hash)
        .fetch_one(pool)
        .await
}

/// Close an active FID offer (canceled by the buyer or approved by the
/// owner). Returns None when no active offer exists.
pub async fn close_fid_offer(
    pool: &PgPool,
    fid: i64,
    buyer_address: &str,
    tx_hash: &str,
) -> Result<Option<Offer>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE offers
        SET canceled_at = NOW(), tx_hash = $3, updated_at = NOW()
        WHERE fid = $1 AND buyer_address = $2 AND token_id IS NULL AND canceled_at IS NULL
        RETURNING *
        "#,
    )
    .bind(fid)
    .bind(buyer_address)
    .bind(tx_hash)
    .fetch_optional(pool)
    .await
}

pub async fn close_token_offer(
    pool: &PgPool,
    token_id: &str,
    chain_id: i32,
    buyer_address: &str,
    tx_hash: &str,
) -> Result<Option<Offer>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE offers
        SET canceled_at = NOW(), tx_hash = $4, updated_at = NOW()
        WHERE token_id = $1 AND chain_id = $2 AND buyer_address = $3 AND canceled_at IS NULL
        RETURNING *
        "#,
    )
    .bind(token_id)
    .bind(chain_id)
    .bind(buyer_address)
    .bind(tx_hash)
    .fetch_optional(pool)
    .await
}

pub async fn find_fid_offer(
    pool: &PgPool,
    fid: i64,
    buyer_address: &str,
) -> Result<Option<Offer>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM offers
        WHERE fid = $1 AND buyer_address = $2 AND token_id IS NULL AND canceled_at IS NULL
        "#,
    )
    .bind(fid)
    .bind(buyer_address)
    .fetch_optional(pool)
    .await
}

pub async fn find_token_offer(
    pool: &PgPool,
    token_id: &str,
    chain_id: i32,
    buyer_address: &str,
) -> Result<Option<Offer>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM offers
        WHERE token_id = $1 AND chain_id = $2 AND buyer_address = $3 AND canceled_at IS NULL
        "#,
    )
    .bind(token_id)
    .bind(chain_id)
    .bind(buyer_address)
    .fetch_optional(pool)
    .await
}

/// Highest live offer for a FID. Amounts are zero-padded so MAX over the
/// text column is the numeric maximum.
pub async fn best_fid_offer(pool: &PgPool, fid: i64) -> Result<Option<Offer>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM offers
        WHERE fid = $1
          AND token_id IS NULL
          AND canceled_at IS NULL
          AND deadline > EXTRACT(EPOCH FROM NOW())::BIGINT
        ORDER BY amount DESC
        LIMIT 1
        "#,
    )
    .bind(fid)
    .fetch_optional(pool)
    .await
}

pub async fn best_token_offer(
    pool: &PgPool,
    token_id: &str,
    chain_id: i32,
) -> Result<Option<Offer>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM offers
        WHERE token_id = $1
          AND chain_id = $2
          AND canceled_at IS NULL
          AND deadline > EXTRACT(EPOCH FROM NOW())::BIGINT
        ORDER BY amount DESC
        LIMIT 1
        "#,
    )
    .bind(token_id)
    .bind(chain_id)
    .fetch_optional(pool)
    .await
}

/// Highest live offer across the whole FID scope, for the stats summary.
pub async fn highest_fid_offer(pool: &PgPool) -> Result<Option<Offer>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM offers
        WHERE token_id IS NULL
          AND canceled_at IS NULL
          AND deadline > EXTRACT(EPOCH FROM NOW())::BIGINT
        ORDER BY amount DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
}

pub async fn highest_token_offer(
    pool: &PgPool,
    chain_id: i32,
    token_id: Option<&str>,
) -> Result<Option<Offer>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM offers
        WHERE token_id IS NOT NULL
          AND chain_id = $1
          AND ($2::TEXT IS NULL OR token_id = $2)
          AND canceled_at IS NULL
          AND deadline > EXTRACT(EPOCH FROM NOW())::BIGINT
        ORDER BY amount DESC
        LIMIT 1
        "#,
    )
    .bind(chain_id)
    .bind(token_id)
    .fetch_optional(pool)
    .await
}

/// Live offers for a target or buyer, best first, capped at the top ten.
pub async fn get_offers(
    pool: &PgPool,
    fid: Option<i64>,
    buyer_address: Option<&str>,
    token_id: Option<&str>,
    chain_id: Option<i32>,
) -> Result<Vec<Offer>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM offers
        WHERE canceled_at IS NULL
          AND ($1::BIGINT IS NULL OR fid = $1)
          AND ($2::TEXT IS NULL OR buyer_address = $2)
          AND ($3::TEXT IS NULL OR token_id = $3)
          AND ($4::INT IS NULL OR chain_id = $4)
        ORDER BY amount DESC
        LIMIT 10
        "#,
    )
    .bind(fid)
    .bind(buyer_address)
    .bind(token_id)
    .bind(chain_id)
    .fetch_all(pool)
    .await
}
