use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use super::WhaleUpsert;
use crate::models::{WhaleAccount, WhaleStats};

/// Fetch a whale by its wallet address.
pub async fn get_whale_by_address(
    pool: &PgPool,
    address: &str,
) -> anyhow::Result<Option<WhaleAccount>> {
    let whale = sqlx::query_as::<_, WhaleAccount>("SELECT * FROM whales WHERE address = $1")
        .bind(address)
        .fetch_optional(pool)
        .await?;

    Ok(whale)
}

/// Insert a newly discovered whale. A concurrent insert of the same address
/// resolves as last-writer-wins on the balance.
pub async fn insert_whale(pool: &PgPool, whale: &WhaleUpsert) -> anyhow::Result<WhaleAccount> {
    let row = sqlx::query_as::<_, WhaleAccount>(
        r#"
        INSERT INTO whales (address, balance, balance_usd, change_24h, last_activity, first_seen, is_active)
        VALUES ($1, $2, $3, 0, $4, $4, true)
        ON CONFLICT (address) DO UPDATE
            SET balance = EXCLUDED.balance,
                balance_usd = EXCLUDED.balance_usd,
                is_active = true,
                updated_at = NOW()
        RETURNING *
        "#,
    )
    .bind(&whale.address)
    .bind(whale.balance)
    .bind(whale.balance_usd)
    .bind(whale.seen_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Refresh balance and 24h change for a known whale, reactivating it.
pub async fn update_whale_balance(
    pool: &PgPool,
    whale: &WhaleUpsert,
    change_24h: Decimal,
) -> anyhow::Result<WhaleAccount> {
    let row = sqlx::query_as::<_, WhaleAccount>(
        r#"
        UPDATE whales
        SET balance = $2,
            balance_usd = $3,
            change_24h = $4,
            is_active = true,
            updated_at = NOW()
        WHERE address = $1
        RETURNING *
        "#,
    )
    .bind(&whale.address)
    .bind(whale.balance)
    .bind(whale.balance_usd)
    .bind(change_24h)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Soft-deactivate every active whale whose address is not in `keep`.
pub async fn deactivate_whales_except(pool: &PgPool, keep: &[String]) -> anyhow::Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE whales
        SET is_active = false, updated_at = NOW()
        WHERE is_active = true AND NOT (address = ANY($1))
        "#,
    )
    .bind(keep)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Bump the running transaction counter and advance last_activity.
pub async fn record_whale_activity(
    pool: &PgPool,
    address: &str,
    at: DateTime<Utc>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE whales
        SET transaction_count_24h = transaction_count_24h + 1,
            last_activity = GREATEST(COALESCE(last_activity, $2), $2),
            updated_at = NOW()
        WHERE address = $1
        "#,
    )
    .bind(address)
    .bind(at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Active whales ordered by balance, largest first.
pub async fn get_top_whales(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<WhaleAccount>> {
    let whales = sqlx::query_as::<_, WhaleAccount>(
        r#"
        SELECT * FROM whales
        WHERE is_active = true
        ORDER BY balance DESC
        LIMIT $1 OFFSET $2
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(whales)
}

pub async fn get_whale_stats(pool: &PgPool) -> anyhow::Result<WhaleStats> {
    let stats = sqlx::query_as::<_, WhaleStats>(
        r#"
        SELECT COUNT(*) AS whale_count,
               COALESCE(SUM(balance), 0) AS total_balance,
               COALESCE(MAX(balance), 0) AS top_balance
        FROM whales
        WHERE is_active = true
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(stats)
}
