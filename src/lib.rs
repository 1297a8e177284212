// brokerage-core: brokerage charge engine and payout eligibility/queueing.
// charge arithmetic is pure and deterministic; payouts talk to the outside
// world only through the traits in sources.rs and store.rs.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: ClientId, Segment, SubSegment, Exchange, Process, Clock
//   1.1  rounding.rs: floor-to-10dp intermediates, ceil-to-paise, stamp flooring
//   2.x  aggregator.rs: wire fills in, rounded ChargeBreakdown out, batches
//   3.x  charges.rs: per-(segment, sub-segment) formula table, MTF override
//   3.1  commodity.rs: MCX symbol -> transaction group + agri flag
//   4.x  position.rs: closed-position pnl scan, DP charges
//   5.x  order.rs: completed orders -> TradeOrderFill
//   5.1  funds.rs: funds key/value feed -> FundsSnapshot
//   6.x  sources.rs: funds/positions/orders feeds (static in-memory impl)
//   7.x  config.rs: charge schedule, env overrides, presets
//   8.x  engine/: Engine, eligibility, payout request/cancel
//   9.1  settlement.rs: queue buckets, queue entries, withdrawal window
//   9.2  transaction.rs: PayoutTransaction, PayoutRequest, minor units
//   9.3  store.rs: durable + queue store traits, in-memory stores

// charge modules
pub mod aggregator;
pub mod charges;
pub mod commodity;
pub mod rounding;
pub mod types;

// payout modules
pub mod engine;
pub mod funds;
pub mod order;
pub mod position;
pub mod settlement;
pub mod transaction;

// integration modules
pub mod config;
pub mod sources;
pub mod store;

// re exports for convenience
pub use aggregator::*;
pub use charges::*;
pub use commodity::*;
pub use engine::*;
pub use funds::*;
pub use order::*;
pub use position::*;
pub use settlement::*;
pub use transaction::*;
pub use types::*;
pub use rounding::ArithmeticOverflow;
pub use config::{ChargeSchedule, CommodityTransactionRates, ConfigError, Environment, MtfRates, RateCard, Settings};
pub use sources::{FundsSource, OrderSource, PositionSource, StaticMarketData, UpstreamError};
pub use store::{InMemoryPayoutStore, InMemoryQueueStore, PayoutStore, QueueStore, StoreError, TransactionUpdate};
