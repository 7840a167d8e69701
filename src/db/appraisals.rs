use sqlx::PgPool;

use crate::types::Appraisal;

pub async fn insert_appraisal(
    pool: &PgPool,
    fid: i64,
    appraised_by: Option<&str>,
    amount: &str,
) -> Result<Appraisal, sqlx::Error> {
    sqlx::query_as(
        r#"
        INSERT INTO appraisals (fid, appraised_by, amount)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(fid)
    .bind(appraised_by)
    .bind(amount)
    .fetch_one(pool)
    .await
}
