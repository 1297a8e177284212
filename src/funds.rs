//! Funds snapshot parsed from the back office's key/value funds feed.
//!
//! Rows arrive unordered. Only four keys matter; every other row is ignored,
//! even if its value would not parse.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::sources::UpstreamError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundsRow {
    pub key: String,
    pub value: String,
}

impl FundsRow {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundsSnapshot {
    pub opening_balance: Decimal,
    pub margin_used: Decimal,
    pub pay_in: Decimal,
    pub equity_credit_sell: Decimal,
}

#[derive(Debug, Clone, Copy)]
enum FundsField {
    OpeningBalance,
    MarginUsed,
    PayIn,
    EquityCreditSell,
}

// "Opening Balance", "opening_balance" and "openingBalance" all match
fn field_for(key: &str) -> Option<FundsField> {
    let normalized: String = key
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect();

    match normalized.as_str() {
        "openingbalance" => Some(FundsField::OpeningBalance),
        "marginused" => Some(FundsField::MarginUsed),
        "payin" => Some(FundsField::PayIn),
        "equitycreditsell" => Some(FundsField::EquityCreditSell),
        _ => None,
    }
}

fn parse_amount(key: &str, raw: &str) -> Result<Decimal, UpstreamError> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned)
        .map_err(|_| UpstreamError::Malformed(format!("funds row {key:?} has non-numeric value {raw:?}")))
}

impl FundsSnapshot {
    /// Missing keys stay zero; a known key with a bad value is a malformed feed.
    pub fn from_rows(rows: &[FundsRow]) -> Result<Self, UpstreamError> {
        let mut snapshot = Self::default();

        for row in rows {
            let Some(field) = field_for(&row.key) else {
                continue;
            };
            let amount = parse_amount(&row.key, &row.value)?;
            match field {
                FundsField::OpeningBalance => snapshot.opening_balance = amount,
                FundsField::MarginUsed => snapshot.margin_used = amount,
                FundsField::PayIn => snapshot.pay_in = amount,
                FundsField::EquityCreditSell => snapshot.equity_credit_sell = amount,
            }
        }

        Ok(snapshot)
    }
}
