use sqlx::PgPool;

use crate::types::{Listing, NewListing};

/// Upsert a listing from a Listed event. Relisting a target revives any
/// previously canceled row: the conflict arm clears `canceled_at`.
///
/// The conflict target depends on the listing scope: FID listings are unique
/// per fid, NFT listings per (token_id, chain_id). Both are partial unique
/// indexes, so the WHERE clause must match the index predicate.
pub async fn upsert_listing(pool: &PgPool, l: &NewListing) -> Result<Listing, sqlx::Error> {
    let query = if l.token_id.is_none() {
        r#"
        INSERT INTO listings
            (fid, token_id, chain_id, owner_address, min_fee, deadline, tx_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (fid) WHERE token_id IS NULL DO UPDATE SET
            owner_address = EXCLUDED.owner_address,
            min_fee = EXCLUDED.min_fee,
            deadline = EXCLUDED.deadline,
            tx_hash = EXCLUDED.tx_hash,
            canceled_at = NULL,
            updated_at = NOW()
        RETURNING *
        "#
    } else {
        r#"
        INSERT INTO listings
            (fid, token_id, chain_id, owner_address, min_fee, deadline, tx_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (token_id, chain_id) WHERE token_id IS NOT NULL DO UPDATE SET
            owner_address = EXCLUDED.owner_address,
            min_fee = EXCLUDED.min_fee,
            deadline = EXCLUDED.deadline,
            tx_hash = EXCLUDED.tx_hash,
            canceled_at = NULL,
            updated_at = NOW()
        RETURNING *
        "#
    };

    sqlx::query_as(query)
        .bind(l.fid)
        .bind(&l.token_id)
        .bind(l.chain_id)
        .bind(&l.owner_address)
        .bind(&l.min_fee)
        .bind(l.deadline)
        .bind(&l.tx_hash)
        .fetch_one(pool)
        .await
}

/// Close an active FID listing (cancel or buy). Returns None when no active
/// listing exists, which callers surface as a state error.
pub async fn close_fid_listing(
    pool: &PgPool,
    fid: i64,
    tx_hash: &str,
) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE listings
        SET canceled_at = NOW(), tx_hash = $2, updated_at = NOW()
        WHERE fid = $1 AND token_id IS NULL AND canceled_at IS NULL
        RETURNING *
        "#,
    )
    .bind(fid)
    .bind(tx_hash)
    .fetch_optional(pool)
    .await
}

pub async fn close_token_listing(
    pool: &PgPool,
    token_id: &str,
    chain_id: i32,
    tx_hash: &str,
) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as(
        r#"
        UPDATE listings
        SET canceled_at = NOW(), tx_hash = $3, updated_at = NOW()
        WHERE token_id = $1 AND chain_id = $2 AND canceled_at IS NULL
        RETURNING *
        "#,
    )
    .bind(token_id)
    .bind(chain_id)
    .bind(tx_hash)
    .fetch_optional(pool)
    .await
}

/// Live FID listing: not canceled and not past its deadline.
pub async fn find_fid_listing(pool: &PgPool, fid: i64) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM listings
        WHERE fid = $1
          AND token_id IS NULL
          AND canceled_at IS NULL
          AND deadline > EXTRACT(EPOCH FROM NOW())::BIGINT
        "#,
    )
    .bind(fid)
    .fetch_optional(pool)
    .await
}

pub async fn find_token_listing(
    pool: &PgPool,
    token_id: &str,
    chain_id: i32,
) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM listings
        WHERE token_id = $1
          AND chain_id = $2
          AND canceled_at IS NULL
          AND deadline > EXTRACT(EPOCH FROM NOW())::BIGINT
        "#,
    )
    .bind(token_id)
    .bind(chain_id)
    .fetch_optional(pool)
    .await
}

/// Cheapest live FID listing. `min_fee` is zero-padded so MIN over the text
/// column is the numeric minimum.
pub async fn fid_floor_listing(pool: &PgPool) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM listings
        WHERE token_id IS NULL
          AND canceled_at IS NULL
          AND deadline > EXTRACT(EPOCH FROM NOW())::BIGINT
        ORDER BY min_fee ASC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await
}

pub async fn token_floor_listing(
    pool: &PgPool,
    chain_id: i32,
    token_id: Option<&str>,
) -> Result<Option<Listing>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM listings
        WHERE token_id IS NOT NULL
          AND chain_id = $1
          AND ($2::TEXT IS NULL OR token_id = $2)
          AND canceled_at IS NULL
          AND deadline > EXTRACT(EPOCH FROM NOW())::BIGINT
        ORDER BY min_fee ASC
        LIMIT 1
        "#,
    )
    .bind(chain_id)
    .bind(token_id)
    .fetch_optional(pool)
    .await
}
