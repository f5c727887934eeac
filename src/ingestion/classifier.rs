use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::{TokenBalance, TransferKind};

/// Balance deltas at or below this magnitude are treated as no movement.
pub const NOISE_FLOOR: Decimal = Decimal::ZERO;

/// A typed balance movement derived from one token account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedTransfer {
    pub kind: TransferKind,
    /// Always a positive magnitude.
    pub amount: Decimal,
    /// Owner of the token account whose balance moved, if reported.
    pub counterparty: Option<String>,
    pub account_index: u32,
}

/// Derive transfers for `mint` from a transaction's pre/post token balances.
///
/// Rules:
/// - post entries are matched to pre entries by account index
/// - a post entry with no pre entry is a new position (delta from zero)
/// - `delta > 0` is a **buy**, `delta < 0` a **sell**
/// - deltas within the noise floor are dropped
pub fn classify_transfers(
    pre: &[TokenBalance],
    post: &[TokenBalance],
    mint: &str,
) -> Vec<ClassifiedTransfer> {
    classify_with_floor(pre, post, mint, NOISE_FLOOR)
}

pub fn classify_with_floor(
    pre: &[TokenBalance],
    post: &[TokenBalance],
    mint: &str,
    noise_floor: Decimal,
) -> Vec<ClassifiedTransfer> {
    post.iter()
        .filter(|p| p.mint == mint)
        .filter_map(|p| {
            let pre_amount = pre
                .iter()
                .find(|b| b.mint == mint && b.account_index == p.account_index)
                .map(|b| b.amount)
                .unwrap_or(Decimal::ZERO);

            let delta = p.amount - pre_amount;
            if delta.abs() <= noise_floor {
                return None;
            }

            let kind = if delta > Decimal::ZERO {
                TransferKind::Buy
            } else {
                TransferKind::Sell
            };

            Some(ClassifiedTransfer {
                kind,
                amount: delta.abs(),
                counterparty: p.owner.clone(),
                account_index: p.account_index,
            })
        })
        .collect()
}

/// Pick the single transfer a whale's transaction record is built from:
/// the whale's own balance movement when present, otherwise the largest one.
pub fn select_whale_transfer<'a>(
    transfers: &'a [ClassifiedTransfer],
    whale_address: &str,
) -> Option<&'a ClassifiedTransfer> {
    transfers
        .iter()
        .filter(|t| t.counterparty.as_deref() == Some(whale_address))
        .max_by(|a, b| a.amount.cmp(&b.amount))
        .or_else(|| transfers.iter().max_by(|a, b| a.amount.cmp(&b.amount)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
