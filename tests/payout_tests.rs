//! Payout coordinator scenarios against the in-memory collaborators.

use async_trait::async_trait;
use brokerage_core::*;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

const TODAY: &str = "payout_queue:2026-10-19";

fn at(hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 10, 19)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

fn client() -> ClientId {
    ClientId::new("AB1234")
}

fn funds_rows() -> Vec<FundsRow> {
    vec![
        FundsRow::new("Opening Balance", "4,423.23"),
        FundsRow::new("marginUsed", "32.42"),
        FundsRow::new("payIn", "0"),
        FundsRow::new("equityCreditSell", "0"),
    ]
}

fn losing_position() -> Position {
    Position {
        exchange: "NSE".to_string(),
        trading_symbol: "SBIN".to_string(),
        product: "MIS".to_string(),
        net_quantity: 0,
        net_amount: dec!(-50),
    }
}

fn intraday_sell() -> CompletedOrder {
    CompletedOrder {
        order_id: "1001".to_string(),
        exchange: "NSE".to_string(),
        trading_symbol: "SBIN".to_string(),
        product: "MIS".to_string(),
        transaction_type: "SELL".to_string(),
        status: "COMPLETE".to_string(),
        average_price: dec!(500),
        filled_quantity: dec!(100),
    }
}

fn market_data() -> StaticMarketData {
    StaticMarketData::new()
        .with_funds(client(), funds_rows())
        .with_positions(client(), vec![losing_position()])
        .with_orders(client(), vec![intraday_sell()])
}

fn payout(amount: Decimal) -> PayoutRequest {
    PayoutRequest {
        client_id: client(),
        amount,
        bank: BankDetails {
            ifsc: "KKBK0000123".to_string(),
            account_number: "7711223344".to_string(),
            bank_name: "Kotak".to_string(),
        },
    }
}

struct Harness {
    engine: Engine,
    store: InMemoryPayoutStore,
    queue: InMemoryQueueStore,
}

impl Harness {
    fn new(hour: u32) -> Self {
        Self::with_data(market_data(), hour)
    }

    fn with_data(data: StaticMarketData, hour: u32) -> Self {
        let store = InMemoryPayoutStore::new();
        let queue = InMemoryQueueStore::new();
        let engine = Engine::new(
            Settings::default(),
            Collaborators::in_memory(data, store.clone(), queue.clone(), Arc::new(FixedClock(at(hour)))),
        );
        Self { engine, store, queue }
    }

    fn with_stores(store: Arc<dyn PayoutStore>, queue: Arc<dyn QueueStore>) -> Engine {
        let collaborators = Collaborators {
            store,
            queue,
            ..Collaborators::in_memory(
                market_data(),
                InMemoryPayoutStore::new(),
                InMemoryQueueStore::new(),
                Arc::new(FixedClock(at(10))),
            )
        };
        Engine::new(Settings::default(), collaborators)
    }
}

// durable store whose inserts always fail
struct FailingInsertStore {
    inner: InMemoryPayoutStore,
    error: StoreError,
}

#[async_trait]
impl PayoutStore for FailingInsertStore {
    async fn check_existing_payout_request(&self, client_id: &ClientId) -> Result<bool, StoreError> {
        self.inner.check_existing_payout_request(client_id).await
    }

    async fn insert_transaction(&self, _transaction: &PayoutTransaction) -> Result<(), StoreError> {
        Err(self.error.clone())
    }

    async fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<PayoutTransaction>, StoreError> {
        self.inner.get_transaction(transaction_id).await
    }

    async fn update_transaction(&self, transaction_id: &TransactionId, update: TransactionUpdate) -> Result<(), StoreError> {
        self.inner.update_transaction(transaction_id, update).await
    }
}

// durable store whose existence check is stale, as under a concurrent request
struct StaleCheckStore {
    inner: InMemoryPayoutStore,
}

#[async_trait]
impl PayoutStore for StaleCheckStore {
    async fn check_existing_payout_request(&self, _client_id: &ClientId) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn insert_transaction(&self, transaction: &PayoutTransaction) -> Result<(), StoreError> {
        self.inner.insert_transaction(transaction).await
    }

    async fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<PayoutTransaction>, StoreError> {
        self.inner.get_transaction(transaction_id).await
    }

    async fn update_transaction(&self, transaction_id: &TransactionId, update: TransactionUpdate) -> Result<(), StoreError> {
        self.inner.update_transaction(transaction_id, update).await
    }
}

// queue store whose deletes always fail
struct StuckQueue {
    inner: InMemoryQueueStore,
}

#[async_trait]
impl QueueStore for StuckQueue {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key).await
    }

    async fn hset(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError> {
        self.inner.hset(key, field, value).await
    }

    async fn hdelete(&self, _key: &str, _field: &str) -> Result<bool, StoreError> {
        Err(StoreError::Backend("queue unreachable".to_string()))
    }
}

#[tokio::test]
async fn eligibility_end_to_end() {
    let h = Harness::new(10);
    let decision = h.engine.compute_payout_eligibility(&client()).await.unwrap();

    // 4423.23 - 32.42 - 50 - 32.02
    assert_eq!(decision.charges_on_trades, dec!(32.02));
    assert_eq!(decision.calculated_payout_amount, dec!(4308.79));
    assert_eq!(decision.payout_amount, dec!(4308.79));
    assert_eq!(decision.positions.loss_on_closed_positions, dec!(-50));
    assert_eq!(decision.total_pnl_on_closed_positions, dec!(-50));
}

#[tokio::test]
async fn eligibility_ignores_incomplete_orders_and_adds_dp_charges() {
    let mut rejected = intraday_sell();
    rejected.status = "REJECTED".to_string();
    let sold_delivery = Position {
        exchange: "NSE".to_string(),
        trading_symbol: "ITC".to_string(),
        product: "CNC".to_string(),
        net_quantity: -10,
        net_amount: dec!(4500),
    };
    let data = StaticMarketData::new()
        .with_funds(client(), funds_rows())
        .with_positions(client(), vec![losing_position(), sold_delivery])
        .with_orders(client(), vec![rejected]);
    let h = Harness::with_data(data, 10);

    let decision = h.engine.compute_payout_eligibility(&client()).await.unwrap();
    assert_eq!(decision.positions.dp_charges, dec!(15.93));
    assert_eq!(decision.charges_on_trades, dec!(15.93));
    assert_eq!(decision.payout_amount, dec!(4324.88));
}

#[tokio::test]
async fn any_upstream_failure_aborts_eligibility() {
    for data in [
        market_data().failing_funds(UpstreamError::Status(500)),
        market_data().failing_positions(UpstreamError::Unavailable("timeout".to_string())),
        market_data().failing_orders(UpstreamError::Malformed("orders".to_string())),
        StaticMarketData::new().with_funds(client(), vec![FundsRow::new("openingBalance", "lots")]),
    ] {
        let h = Harness::with_data(data, 10);
        let err = h.engine.compute_payout_eligibility(&client()).await.unwrap_err();
        assert!(matches!(err, EngineError::Upstream(_)));
        assert_eq!(err.status_code(), 502);
    }
}

#[tokio::test]
async fn upstream_failure_writes_nothing() {
    let h = Harness::with_data(market_data().failing_orders(UpstreamError::Status(503)), 10);
    let err = h
        .engine
        .request_payout(payout(dec!(100)), SettlementWindowPolicy::open())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Upstream(_)));
    assert_eq!(h.queue.hlen(TODAY).await, 0);
    assert!(h.store.transactions_for(&client()).await.is_empty());
}

#[tokio::test]
async fn oversized_order_in_feed_is_upstream_error() {
    let mut corrupt = intraday_sell();
    corrupt.average_price = Decimal::from(1_000_000_000_000_000i64);
    corrupt.filled_quantity = Decimal::from(1_000_000_000_000_000i64);
    let h = Harness::with_data(market_data().with_orders(client(), vec![intraday_sell(), corrupt]), 10);

    let err = h.engine.compute_payout_eligibility(&client()).await.unwrap_err();
    assert!(matches!(err, EngineError::Upstream(UpstreamError::Malformed(_))));
    assert_eq!(err.status_code(), 502);

    let err = h
        .engine
        .request_payout(payout(dec!(100)), SettlementWindowPolicy::open())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Upstream(_)));
    assert_eq!(h.queue.hlen(TODAY).await, 0);
}

#[tokio::test]
async fn order_with_unknown_side_still_charged() {
    let mut odd = intraday_sell();
    odd.transaction_type = "ADJ".to_string();
    let h = Harness::with_data(market_data().with_orders(client(), vec![odd]), 10);

    // intraday without a side: brokerage 15, txn 1.49, sebi 0.05, gst 2.98
    let decision = h.engine.compute_payout_eligibility(&client()).await.unwrap();
    assert_eq!(decision.charges_on_trades, dec!(19.52));
}

#[tokio::test]
async fn full_eligible_amount_accepted() {
    let h = Harness::new(10);
    let receipt = h
        .engine
        .request_payout(payout(dec!(4308.79)), SettlementWindowPolicy::open())
        .await
        .unwrap();
    assert_eq!(receipt.amount, 430879);
    assert_eq!(receipt.bucket.key("payout_queue"), TODAY);
}

#[tokio::test]
async fn over_limit_rejected() {
    let h = Harness::new(10);
    let err = h
        .engine
        .request_payout(payout(dec!(4308.80)), SettlementWindowPolicy::open())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::LimitExceeded {
            requested: dec!(4308.80),
            eligible: dec!(4308.79)
        }
    );
    assert_eq!(err.status_code(), 422);
    assert_eq!(h.queue.hlen(TODAY).await, 0);
}

#[tokio::test]
async fn second_request_conflicts_without_second_queue_write() {
    let h = Harness::new(10);
    let first = h
        .engine
        .request_payout(payout(dec!(100)), SettlementWindowPolicy::open())
        .await
        .unwrap();

    let err = h
        .engine
        .request_payout(payout(dec!(200)), SettlementWindowPolicy::open())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
    assert_eq!(err.status_code(), 409);

    assert_eq!(h.queue.hlen(TODAY).await, 1);
    let raw = h.queue.hget(TODAY, client().as_str()).await.unwrap();
    let entry = PayoutQueueEntry::from_json(&raw).unwrap();
    assert_eq!(entry.transaction_id, first.transaction_id);
    assert_eq!(entry.amount, 10000);
    assert_eq!(h.store.transactions_for(&client()).await.len(), 1);
}

#[tokio::test]
async fn concurrent_requests_admit_one() {
    let h = Harness::new(10);
    let (a, b) = tokio::join!(
        h.engine.request_payout(payout(dec!(100)), SettlementWindowPolicy::open()),
        h.engine.request_payout(payout(dec!(100)), SettlementWindowPolicy::open()),
    );

    let admitted = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 1);
    assert!([a, b].into_iter().any(|r| matches!(r, Err(EngineError::Conflict(_)))));
    assert_eq!(h.store.transactions_for(&client()).await.len(), 1);
}

#[tokio::test]
async fn durable_uniqueness_backstops_stale_check() {
    let inner = InMemoryPayoutStore::new();
    let queue = InMemoryQueueStore::new();
    let engine = Harness::with_stores(
        Arc::new(StaleCheckStore { inner: inner.clone() }),
        Arc::new(queue.clone()),
    );

    let first = engine
        .request_payout(payout(dec!(100)), SettlementWindowPolicy::open())
        .await
        .unwrap();
    assert_eq!(queue.hlen(TODAY).await, 1);

    let err = engine
        .request_payout(payout(dec!(100)), SettlementWindowPolicy::open())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Conflict(_)));
    assert_eq!(inner.transactions_for(&client()).await.len(), 1);

    // the loser shares the winner's queue field, so its rollback leaves the
    // admitted request with no queue entry until reconciliation
    let admitted = inner.get_transaction(&first.transaction_id).await.unwrap().unwrap();
    assert_eq!(admitted.status, PayoutStatus::Process);
    assert_eq!(queue.hget(TODAY, client().as_str()).await, None);
    assert_eq!(queue.hlen(TODAY).await, 0);
}

#[tokio::test]
async fn closed_window_records_pending_with_zero_queued() {
    let h = Harness::new(10);
    h.queue.set("payout_window_open", "0").await;
    let window = h.engine.settlement_window().await.unwrap();

    let receipt = h.engine.request_payout(payout(dec!(500)), window).await.unwrap();
    assert_eq!(receipt.status, PayoutStatus::Pending);

    let raw = h.queue.hget(TODAY, client().as_str()).await.unwrap();
    assert_eq!(PayoutQueueEntry::from_json(&raw).unwrap().amount, 0);

    let stored = h.store.get_transaction(&receipt.transaction_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PayoutStatus::Pending);
    assert_eq!(stored.amount, 50000);
}

#[tokio::test]
async fn insert_failure_rolls_back_queue_entry() {
    let queue = InMemoryQueueStore::new();
    let engine = Harness::with_stores(
        Arc::new(FailingInsertStore {
            inner: InMemoryPayoutStore::new(),
            error: StoreError::Backend("disk full".to_string()),
        }),
        Arc::new(queue.clone()),
    );

    let err = engine
        .request_payout(payout(dec!(100)), SettlementWindowPolicy::open())
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Persistence(StoreError::Backend(_))));
    assert_eq!(err.status_code(), 500);
    assert_eq!(queue.hlen(TODAY).await, 0);
}

#[tokio::test]
async fn rollback_failure_keeps_original_error() {
    let inner_queue = InMemoryQueueStore::new();
    let engine = Harness::with_stores(
        Arc::new(FailingInsertStore {
            inner: InMemoryPayoutStore::new(),
            error: StoreError::Backend("disk full".to_string()),
        }),
        Arc::new(StuckQueue {
            inner: inner_queue.clone(),
        }),
    );

    let err = engine
        .request_payout(payout(dec!(100)), SettlementWindowPolicy::open())
        .await
        .unwrap_err();

    assert_eq!(err, EngineError::Persistence(StoreError::Backend("disk full".to_string())));
    // orphaned entry left for reconciliation
    assert_eq!(inner_queue.hlen(TODAY).await, 1);
}

#[tokio::test]
async fn cancel_after_proceed_is_soft_success() {
    let h = Harness::new(10);
    let receipt = h
        .engine
        .request_payout(payout(dec!(100)), SettlementWindowPolicy::open())
        .await
        .unwrap();
    h.store.mark_proceeded(&receipt.transaction_id, at(12)).await.unwrap();

    let outcome = h.engine.cancel_payout(&client(), &receipt.transaction_id).await.unwrap();
    assert!(matches!(outcome, CancelOutcome::AlreadyProcessed { .. }));
    assert!(outcome.message().contains("already been processed"));

    let stored = h.store.get_transaction(&receipt.transaction_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PayoutStatus::Proceed);
    assert_eq!(stored.updated_at, at(12));
    assert_eq!(h.queue.hlen(TODAY).await, 1);
}

#[tokio::test]
async fn cancel_frees_client_for_new_request() {
    let h = Harness::new(10);
    let first = h
        .engine
        .request_payout(payout(dec!(100)), SettlementWindowPolicy::open())
        .await
        .unwrap();
    h.engine.cancel_payout(&client(), &first.transaction_id).await.unwrap();

    let second = h
        .engine
        .request_payout(payout(dec!(150)), SettlementWindowPolicy::open())
        .await
        .unwrap();
    assert_ne!(first.transaction_id, second.transaction_id);
    assert_eq!(h.queue.hlen(TODAY).await, 1);
}

#[tokio::test]
async fn cancel_unknown_transaction_is_validation() {
    let h = Harness::new(10);
    let err = h
        .engine
        .cancel_payout(&client(), &TransactionId("missing".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn cancel_bucket_follows_cancel_time() {
    let store = InMemoryPayoutStore::new();
    let queue = InMemoryQueueStore::new();
    let engine_at = |hour: u32| {
        Engine::new(
            Settings::default(),
            Collaborators::in_memory(market_data(), store.clone(), queue.clone(), Arc::new(FixedClock(at(hour)))),
        )
    };

    let receipt = engine_at(10)
        .request_payout(payout(dec!(100)), SettlementWindowPolicy::open())
        .await
        .unwrap();

    // after the cutoff the cancel looks in tomorrow's bucket
    engine_at(16)
        .cancel_payout(&client(), &receipt.transaction_id)
        .await
        .unwrap();

    let stored = store.get_transaction(&receipt.transaction_id).await.unwrap().unwrap();
    assert_eq!(stored.status, PayoutStatus::Cancelled);
    assert_eq!(queue.hlen(TODAY).await, 1);
}
