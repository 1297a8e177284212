// 8.0.2: result types and errors for engine operations.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregator::ChargeError;
use crate::funds::FundsSnapshot;
use crate::position::PositionAggregate;
use crate::settlement::QueueBucket;
use crate::sources::UpstreamError;
use crate::store::StoreError;
use crate::transaction::{PayoutStatus, RequestError};
use crate::types::TransactionId;

/// How much a client may withdraw right now, plus the inputs it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutDecision {
    pub payout_amount: Decimal,
    pub extra_payout_amount: Decimal,
    pub calculated_payout_amount: Decimal,
    pub charges_on_trades: Decimal,
    pub total_pnl_on_closed_positions: Decimal,
    pub funds: FundsSnapshot,
    pub positions: PositionAggregate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayoutReceipt {
    pub transaction_id: TransactionId,
    pub status: PayoutStatus,
    pub bucket: QueueBucket,
    // paise, as persisted
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled { transaction_id: TransactionId },
    // already settled; nothing was changed
    AlreadyProcessed { message: String },
}

impl CancelOutcome {
    pub fn message(&self) -> &str {
        match self {
            CancelOutcome::Cancelled { .. } => "payout request cancelled",
            CancelOutcome::AlreadyProcessed { message } => message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("requested {requested} exceeds eligible payout {eligible}")]
    LimitExceeded { requested: Decimal, eligible: Decimal },

    #[error("upstream failure: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),
}

impl From<ChargeError> for EngineError {
    fn from(error: ChargeError) -> Self {
        EngineError::Validation(error.to_string())
    }
}

impl From<RequestError> for EngineError {
    fn from(error: RequestError) -> Self {
        EngineError::Validation(error.to_string())
    }
}

impl EngineError {
    /// HTTP-style status the caller renders.
    pub fn status_code(&self) -> u16 {
        match self {
            EngineError::Validation(_) => 400,
            EngineError::Conflict(_) => 409,
            EngineError::LimitExceeded { .. } => 422,
            EngineError::Upstream(_) => 502,
            EngineError::Persistence(_) => 500,
        }
    }

    /// Fixed caller-facing text. Internal detail stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "Invalid request",
            EngineError::Conflict(_) => "A payout request is already in progress",
            EngineError::LimitExceeded { .. } => "Requested amount exceeds the withdrawable balance",
            EngineError::Upstream(_) => "Unable to fetch account details, please try again later",
            EngineError::Persistence(_) => "Unable to process the payout request, please try again later",
        }
    }
}
