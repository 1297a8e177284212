// 9.1 settlement.rs: day-bucketed payout queue feeding the settlement cycle.
// the bank transfer itself happens downstream; this module only decides which
// cycle a request lands in and what the settlement job will read.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::store::{QueueStore, StoreError};
use crate::transaction::{BankDetails, PayoutStatus};
use crate::types::{ClientId, TransactionId};

// 9.1.1 settlement day a request is queued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueBucket(pub NaiveDate);

impl QueueBucket {
    /// Hash key for this bucket, e.g. `payout_queue:2026-10-19`.
    pub fn key(&self, prefix: &str) -> String {
        format!("{}:{}", prefix, self.0.format("%Y-%m-%d"))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }
}

/// Before the cutoff hour a request settles today; at or after it, tomorrow.
pub fn resolve_queue_bucket(now: NaiveDateTime, cutoff_hour: u32) -> QueueBucket {
    let today = now.date();
    if now.hour() < cutoff_hour {
        QueueBucket(today)
    } else {
        QueueBucket(today.succ_opt().unwrap_or(today))
    }
}

// 9.1.2 what the settlement job reads, one hash field per client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutQueueEntry {
    pub transaction_id: TransactionId,
    pub client_id: ClientId,
    // paise; zero while the withdrawal window is closed
    pub amount: i64,
    pub ifsc: String,
    pub account_number: String,
    pub bank_name: String,
    pub status: PayoutStatus,
    pub requested_at: NaiveDateTime,
}

impl PayoutQueueEntry {
    pub fn new(
        transaction_id: TransactionId,
        client_id: ClientId,
        amount: i64,
        bank: &BankDetails,
        status: PayoutStatus,
        requested_at: NaiveDateTime,
    ) -> Self {
        Self {
            transaction_id,
            client_id,
            amount,
            ifsc: bank.ifsc.trim().to_string(),
            account_number: bank.account_number.trim().to_string(),
            bank_name: bank.bank_name.trim().to_string(),
            status,
            requested_at,
        }
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    pub fn from_json(raw: &str) -> Result<Self, StoreError> {
        serde_json::from_str(raw).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

// 9.1.3 whether withdrawals are currently paid out. passed into the coordinator
// explicitly so a request sees one consistent value for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementWindowPolicy {
    pub withdrawals_open: bool,
}

impl SettlementWindowPolicy {
    pub fn open() -> Self {
        Self { withdrawals_open: true }
    }

    pub fn closed() -> Self {
        Self { withdrawals_open: false }
    }

    /// Reads the shared window flag. A missing flag means closed.
    pub async fn load(queue: &dyn QueueStore, flag_key: &str) -> Result<Self, StoreError> {
        let raw = queue.get(flag_key).await?;
        let withdrawals_open = raw
            .map(|value| {
                matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "open"
                )
            })
            .unwrap_or(false);
        Ok(Self { withdrawals_open })
    }

    pub fn transaction_status(&self) -> PayoutStatus {
        if self.withdrawals_open {
            PayoutStatus::Process
        } else {
            PayoutStatus::Pending
        }
    }

    pub fn queued_amount(&self, amount: i64) -> i64 {
        if self.withdrawals_open {
            amount
        } else {
            0
        }
    }
}
