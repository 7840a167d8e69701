use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::types::{ActivityEntry, NewActivityEntry};

/// Idempotency lookup: the entry recorded for this transaction, if any.
pub async fn find_by_tx(
    pool: &PgPool,
    tx_hash: &str,
    chain_id: i32,
) -> Result<Option<ActivityEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM activity_log WHERE tx_hash = $1 AND chain_id = $2")
        .bind(tx_hash)
        .bind(chain_id)
        .fetch_optional(pool)
        .await
}

/// Append an entry to the ledger. The unique index on (tx_hash, chain_id)
/// makes this a no-op for a transaction that was already recorded; None
/// means another request got there first.
pub async fn append(
    pool: &PgPool,
    e: &NewActivityEntry,
) -> Result<Option<ActivityEntry>, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO activity_log
            (event_type, fid, token_id, chain_id, actor, price, referrer, tx_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (tx_hash, chain_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(e.event_type.as_str())
    .bind(e.fid)
    .bind(&e.token_id)
    .bind(e.chain_id)
    .bind(&e.actor)
    .bind(&e.price)
    .bind(&e.referrer)
    .bind(&e.tx_hash)
    .fetch_optional(pool)
    .await
}

/// Ledger page, newest first, cursored on the row id. Filtering for
/// "Bought" also matches OfferApproved, since both are sales.
pub async fn get_activities(
    pool: &PgPool,
    event_type: Option<&str>,
    fid: Option<i64>,
    actor: Option<&str>,
    referrer: Option<&str>,
    before_id: Option<i32>,
    limit: i64,
) -> Result<Vec<ActivityEntry>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM activity_log
        WHERE ($1::TEXT IS NULL
               OR event_type = $1
               OR ($1 = 'Bought' AND event_type = 'OfferApproved'))
          AND ($2::BIGINT IS NULL OR fid = $2)
          AND ($3::TEXT IS NULL OR actor = $3)
          AND ($4::TEXT IS NULL OR referrer = $4)
          AND ($5::INT IS NULL OR id < $5)
        ORDER BY id DESC
        LIMIT $6
        "#,
    )
    .bind(event_type)
    .bind(fid)
    .bind(actor)
    .bind(referrer)
    .bind(before_id)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Highest recorded sale price in the FID scope. Prices are zero-padded so
/// MAX over the text column is the numeric maximum.
pub async fn max_fid_sale_price(pool: &PgPool) -> Result<Option<String>, sqlx::Error> {
    let (max,): (Option<String>,) = sqlx::query_as(
        r#"
        SELECT MAX(price) FROM activity_log
        WHERE token_id IS NULL
          AND event_type IN ('Bought', 'OfferApproved')
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(max)
}

pub async fn max_token_sale_price(
    pool: &PgPool,
    chain_id: i32,
    token_id: Option<&str>,
) -> Result<Option<String>, sqlx::Error> {
    let (max,): (Option<String>,) = sqlx::query_as(
        r#"
        SELECT MAX(price) FROM activity_log
        WHERE token_id IS NOT NULL
          AND chain_id = $1
          AND ($2::TEXT IS NULL OR token_id = $2)
          AND event_type IN ('Bought', 'OfferApproved')
        "#,
    )
    .bind(chain_id)
    .bind(token_id)
    .fetch_one(pool)
    .await?;
    Ok(max)
}

/// Sum of all sale prices in the FID scope, as a decimal string. The padded
/// text prices cast cleanly to NUMERIC.
pub async fn fid_sale_volume(pool: &PgPool) -> Result<Option<String>, sqlx::Error> {
    let (sum,): (Option<String>,) = sqlx::query_as(
        r#"
        SELECT SUM(price::NUMERIC)::TEXT FROM activity_log
        WHERE token_id IS NULL
          AND event_type IN ('Bought', 'OfferApproved')
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(sum)
}

pub async fn token_sale_volume(
    pool: &PgPool,
    chain_id: i32,
    token_id: Option<&str>,
) -> Result<Option<String>, sqlx::Error> {
    let (sum,): (Option<String>,) = sqlx::query_as(
        r#"
        SELECT SUM(price::NUMERIC)::TEXT FROM activity_log
        WHERE token_id IS NOT NULL
          AND chain_id = $1
          AND ($2::TEXT IS NULL OR token_id = $2)
          AND event_type IN ('Bought', 'OfferApproved')
        "#,
    )
    .bind(chain_id)
    .bind(token_id)
    .fetch_one(pool)
    .await?;
    Ok(sum)
}

/// FID of the most recent sale, for the stats summary.
pub async fn last_sold_fid(pool: &PgPool) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT fid FROM activity_log
        WHERE token_id IS NULL
          AND event_type IN ('Bought', 'OfferApproved')
        ORDER BY id DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(fid,)| fid))
}

/// Sales since a point in time, oldest first, for the historical chart.
pub async fn sales_since(
    pool: &PgPool,
    fid: Option<i64>,
    token_id: Option<&str>,
    chain_id: Option<i32>,
    since: DateTime<Utc>,
) -> Result<Vec<ActivityEntry>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM activity_log
        WHERE event_type IN ('Bought', 'OfferApproved')
          AND ($1::BIGINT IS NULL OR fid = $1)
          AND ($2::TEXT IS NULL OR token_id = $2)
          AND ($3::INT IS NULL OR chain_id = $3)
          AND created_at >= $4
        ORDER BY created_at ASC
        "#,
    )
    .bind(fid)
    .bind(token_id)
    .bind(chain_id)
    .bind(since)
    .fetch_all(pool)
    .await
}
