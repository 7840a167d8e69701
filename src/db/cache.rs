use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Durable tier row for the look-aside cache.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CacheRow {
    pub key: String,
    pub value: serde_json::Value,
    pub expires_at: Option<DateTime<Utc>>,
}

pub async fn find_entry(pool: &PgPool, key: &str) -> Result<Option<CacheRow>, sqlx::Error> {
    sqlx::query_as::<_, CacheRow>(
        "SELECT key, value, expires_at FROM key_value_cache WHERE key = $1",
    )
    .bind(key)
    .fetch_optional(pool)
    .await
}

pub async fn upsert_entry(
    pool: &PgPool,
    key: &str,
    value: &serde_json::Value,
    expires_at: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO key_value_cache (key, value, expires_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (key)
        DO UPDATE SET value = EXCLUDED.value,
                      expires_at = EXCLUDED.expires_at,
                      updated_at = NOW()
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(expires_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn delete_entry(pool: &PgPool, key: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM key_value_cache WHERE key = $1")
        .bind(key)
        .execute(pool)
        .await?;
    Ok(())
}
