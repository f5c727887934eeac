use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::TransactionFilter;
use crate::models::{InsertOutcome, NewTransaction, TransactionRecord};

/// Insert a transaction record unless its signature is already stored.
pub async fn insert_transaction(
    pool: &PgPool,
    tx: &NewTransaction,
) -> anyhow::Result<InsertOutcome<TransactionRecord>> {
    let row = sqlx::query_as::<_, TransactionRecord>(
        r#"
        INSERT INTO transactions
            (signature, whale_address, kind, amount, price, value_usd, block_time, slot, fee_lamports)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (signature) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(&tx.signature)
    .bind(&tx.whale_address)
    .bind(tx.kind)
    .bind(tx.amount)
    .bind(tx.price)
    .bind(tx.value_usd())
    .bind(tx.block_time)
    .bind(tx.slot)
    .bind(tx.fee_lamports)
    .fetch_optional(pool)
    .await?;

    Ok(match row {
        Some(record) => InsertOutcome::Inserted(record),
        None => InsertOutcome::Duplicate,
    })
}

/// Return the subset of `signatures` already stored.
pub async fn get_known_signatures(
    pool: &PgPool,
    signatures: &[String],
) -> anyhow::Result<HashSet<String>> {
    if signatures.is_empty() {
        return Ok(HashSet::new());
    }

    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT signature FROM transactions WHERE signature = ANY($1)")
            .bind(signatures)
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(|(s,)| s).collect())
}

/// All transactions with block_time at or after `since`, newest first.
pub async fn get_transactions_since(
    pool: &PgPool,
    since: DateTime<Utc>,
) -> anyhow::Result<Vec<TransactionRecord>> {
    let rows = sqlx::query_as::<_, TransactionRecord>(
        "SELECT * FROM transactions WHERE block_time >= $1 ORDER BY block_time DESC",
    )
    .bind(since)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Recent transactions, optionally narrowed to one whale and/or one kind.
pub async fn get_recent_transactions(
    pool: &PgPool,
    filter: &TransactionFilter,
) -> anyhow::Result<Vec<TransactionRecord>> {
    let rows = sqlx::query_as::<_, TransactionRecord>(
        r#"
        SELECT * FROM transactions
        WHERE ($1::text IS NULL OR whale_address = $1)
          AND ($2::text IS NULL OR kind = $2)
        ORDER BY block_time DESC
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(filter.whale_address.as_deref())
    .bind(filter.kind.map(|k| k.as_str()))
    .bind(filter.limit)
    .bind(filter.offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
