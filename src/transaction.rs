// 9.2 transaction.rs: the persisted payout record and the request that creates it.
// amounts are persisted in paise (minor units) so the store never sees a fraction.

use chrono::NaiveDateTime;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{ClientId, TransactionId};

// Pending/Process are in flight; Proceed/Cancelled are terminal.
// Proceed is set by the settlement job, never by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PayoutStatus {
    Pending,
    Process,
    Proceed,
    Cancelled,
}

impl PayoutStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, PayoutStatus::Pending | PayoutStatus::Process)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DebitCredit {
    Debit,
    Credit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub ifsc: String,
    pub account_number: String,
    pub bank_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutRequest {
    pub client_id: ClientId,
    pub amount: Decimal,
    pub bank: BankDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    #[error("amount {0} must be positive")]
    NonPositiveAmount(Decimal),

    #[error("amount {0} has more than two decimal places")]
    TooPrecise(Decimal),

    #[error("amount {0} is too large")]
    TooLarge(Decimal),

    #[error("{0} is required")]
    MissingField(&'static str),
}

/// Rupees to paise. Sub-paise amounts are rejected rather than rounded.
pub fn to_minor_units(amount: Decimal) -> Result<i64, RequestError> {
    if amount <= Decimal::ZERO {
        return Err(RequestError::NonPositiveAmount(amount));
    }
    if amount.normalize().scale() > 2 {
        return Err(RequestError::TooPrecise(amount));
    }
    amount
        .checked_mul(dec!(100))
        .and_then(|paise| paise.to_i64())
        .ok_or(RequestError::TooLarge(amount))
}

impl PayoutRequest {
    /// Checks the request and returns the amount in minor units.
    pub fn validate(&self) -> Result<i64, RequestError> {
        if self.client_id.as_str().trim().is_empty() {
            return Err(RequestError::MissingField("client id"));
        }
        if self.bank.ifsc.trim().is_empty() {
            return Err(RequestError::MissingField("ifsc"));
        }
        if self.bank.account_number.trim().is_empty() {
            return Err(RequestError::MissingField("account number"));
        }
        if self.bank.bank_name.trim().is_empty() {
            return Err(RequestError::MissingField("bank name"));
        }
        to_minor_units(self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutTransaction {
    pub transaction_id: TransactionId,
    pub client_id: ClientId,
    // paise
    pub amount: i64,
    pub ifsc: String,
    pub account_number: String,
    pub bank_name: String,
    pub debit_credit: DebitCredit,
    pub status: PayoutStatus,
    pub ledger_synced: bool,
    pub bank_synced: bool,
    pub remarks: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl PayoutTransaction {
    pub fn new(
        transaction_id: TransactionId,
        request: &PayoutRequest,
        amount: i64,
        status: PayoutStatus,
        created_at: NaiveDateTime,
    ) -> Self {
        Self {
            transaction_id,
            client_id: request.client_id.clone(),
            amount,
            ifsc: request.bank.ifsc.trim().to_string(),
            account_number: request.bank.account_number.trim().to_string(),
            bank_name: request.bank.bank_name.trim().to_string(),
            debit_credit: DebitCredit::Debit,
            status,
            ledger_synced: false,
            bank_synced: false,
            remarks: String::new(),
            created_at,
            updated_at: created_at,
        }
    }
}
