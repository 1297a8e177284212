// 8.0: payout engine. prices trades, decides withdrawable balance, and runs the
// payout request state machine against the durable and queue stores.
// no background work; every call finishes within the caller's request.

mod config;
mod core;
mod eligibility;
mod payouts;
mod results;

pub use config::PayoutSettings;
pub use core::{Collaborators, Engine};
pub use eligibility::decide_payout;
pub use results::{CancelOutcome, EngineError, PayoutDecision, PayoutReceipt};
