use rust_decimal::Decimal;

use crate::models::{AlertCondition, ConditionKind, MarketSnapshot, TransactionRecord};

/// Whether a single condition holds against the snapshot.
///
/// - balance: any whale's balance satisfies it
/// - transaction: any windowed transaction's amount satisfies it
/// - price: the current price satisfies it (no price, no match)
/// - volume: the 24h USD volume satisfies it
pub fn condition_holds(condition: &AlertCondition, snapshot: &MarketSnapshot) -> bool {
    let op = condition.operator;
    let expected = condition.value;

    match condition.kind {
        ConditionKind::Balance => snapshot
            .whales
            .iter()
            .any(|w| op.compare(w.balance, expected)),
        ConditionKind::Transaction => snapshot
            .transactions
            .iter()
            .any(|t| op.compare(t.amount, expected)),
        ConditionKind::Price => snapshot
            .metrics
            .price
            .map_or(false, |price| op.compare(price, expected)),
        ConditionKind::Volume => op.compare(snapshot.metrics.volume_24h, expected),
        ConditionKind::Unknown => false,
    }
}

/// All conditions must hold. An empty condition list never matches.
pub fn conditions_match(conditions: &[AlertCondition], snapshot: &MarketSnapshot) -> bool {
    !conditions.is_empty() && conditions.iter().all(|c| condition_holds(c, snapshot))
}

/// Largest transaction in the window satisfying any of the alert's
/// transaction conditions.
pub fn largest_qualifying_transaction<'a>(
    conditions: &[AlertCondition],
    snapshot: &'a MarketSnapshot,
) -> Option<&'a TransactionRecord> {
    let tx_conditions: Vec<&AlertCondition> = conditions
        .iter()
        .filter(|c| c.kind == ConditionKind::Transaction)
        .collect();

    snapshot
        .transactions
        .iter()
        .filter(|t| {
            tx_conditions
                .iter()
                .any(|c| c.operator.compare(t.amount, c.value))
        })
        .max_by(|a, b| a.amount.cmp(&b.amount))
}

fn short_address(address: &str) -> &str {
    address.get(..8).unwrap_or(address)
}

fn display(value: Decimal) -> Decimal {
    value.round_dp(2).normalize()
}

/// Human-readable trigger message. Transaction details take precedence,
/// then volume, balance and price; otherwise a generic line naming the alert.
pub fn alert_message(
    alert_name: &str,
    conditions: &[AlertCondition],
    snapshot: &MarketSnapshot,
    token_symbol: &str,
) -> String {
    let has = |kind: ConditionKind| conditions.iter().any(|c| c.kind == kind);

    if let Some(tx) = largest_qualifying_transaction(conditions, snapshot) {
        return format!(
            "Large {} detected! {} {} tokens ({}...)",
            tx.kind,
            display(tx.amount),
            token_symbol,
            short_address(&tx.whale_address),
        );
    }

    if has(ConditionKind::Volume) {
        return format!(
            "Volume spike detected! 24h volume: ${}",
            display(snapshot.metrics.volume_24h)
        );
    }

    if let Some(balance) = conditions.iter().find(|c| c.kind == ConditionKind::Balance) {
        return format!(
            "Whale holding {} {}+ {} tokens detected!",
            balance.operator,
            display(balance.value),
            token_symbol,
        );
    }

    if has(ConditionKind::Price) {
        if let Some(price) = snapshot.metrics.price {
            return format!("{} price alert: ${}", token_symbol, price.normalize());
        }
    }

    format!("{alert_name} alert triggered!")
}
