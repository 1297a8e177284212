//! Payout engine simulation.
//!
//! Runs charge, eligibility, payout and cancel scenarios end to end against the
//! in-memory collaborators. Set `RUST_LOG=debug` to see the engine's own logs.

use brokerage_core::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Brokerage Charge & Payout Simulation\n");

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    scenario_1_charge_breakdowns(&settings);
    scenario_2_batch_all_or_nothing(&settings);
    scenario_3_eligibility(&settings).await;
    scenario_4_request_and_cancel(&settings).await;
    scenario_5_closed_window(&settings).await;
    scenario_6_cancel_after_settlement(&settings).await;

    println!("\nAll simulations completed.");
}

fn charge_request(segment: &str, sub_segment: &str, exchange: &str, process: &str, price: Decimal, quantity: Decimal) -> ChargeRequest {
    ChargeRequest {
        client_id: "SIM001".to_string(),
        segment: segment.to_string(),
        sub_segment: sub_segment.to_string(),
        exchange: exchange.to_string(),
        process: process.to_string(),
        price,
        quantity,
        group_info: "normal".to_string(),
        agri: false,
        product: String::new(),
    }
}

fn print_breakdown(label: &str, b: &ChargeBreakdown) {
    println!("  {label}");
    println!(
        "    brokerage {} | stt/ctt {} | txn {} | sebi {} | gst {} | stamp {}",
        b.brokerage, b.stt_or_ctt, b.transaction_charges, b.sebi_charges, b.gst, b.stamp_charges
    );
    println!("    total {} on turnover {}", b.total_charge, b.gross_price);
}

/// One fill per formula branch, plus MTF.
fn scenario_1_charge_breakdowns(settings: &Settings) {
    println!("Scenario 1: Charge Breakdown per Segment\n");

    let engine = Engine::new(settings.clone(), Collaborators::default());

    let fills = [
        ("equity delivery BUY NSE", charge_request("equity", "delivery", "NSE", "BUY", dec!(100), dec!(10))),
        ("equity intraday SELL NSE", charge_request("equity", "intraday", "NSE", "SELL", dec!(500), dec!(100))),
        ("equity futures SELL NFO", charge_request("equity", "futures", "NFO", "SELL", dec!(22000), dec!(25))),
        ("equity options BUY NFO", charge_request("equity", "options", "NFO", "BUY", dec!(120), dec!(50))),
        ("currency futures BUY CDS", charge_request("currency", "futures", "CDS", "BUY", dec!(83.25), dec!(1000))),
        ("commodity futures SELL MCX", charge_request("commodity", "futures", "MCX", "SELL", dec!(6200), dec!(100))),
        ("commodity options BUY MCX", charge_request("commodity", "options", "MCX", "BUY", dec!(45), dec!(100))),
    ];

    for (label, request) in &fills {
        match engine.compute_broker_charges(request) {
            Ok(breakdown) => print_breakdown(label, &breakdown),
            Err(e) => println!("  {label}: rejected ({e})"),
        }
    }

    let mut mtf = charge_request("equity", "delivery", "NSE", "BUY", dec!(1000), dec!(10));
    mtf.product = MTF_PRODUCT.to_string();
    if let Ok(breakdown) = engine.compute_broker_charges(&mtf) {
        print_breakdown("MTF BUY NSE (brokerage capped)", &breakdown);
    }

    let unknown = charge_request("bonds", "delivery", "NSE", "BUY", dec!(100), dec!(10));
    if let Ok(breakdown) = engine.compute_broker_charges(&unknown) {
        println!("  unknown segment charges: {}\n", breakdown.total_charge);
    }
}

fn scenario_2_batch_all_or_nothing(settings: &Settings) {
    println!("Scenario 2: Batch Charges, All or Nothing\n");

    let engine = Engine::new(settings.clone(), Collaborators::default());
    let good = charge_request("equity", "intraday", "BSE", "BUY", dec!(2000), dec!(100));
    let mut bad = good.clone();
    bad.quantity = dec!(-5);

    match engine.combine_broker_charges(&[good.clone(), good.clone()]) {
        Ok(batch) => println!("  two valid fills -> {} breakdowns", batch.len()),
        Err(e) => println!("  unexpected failure: {e}"),
    }
    match engine.combine_broker_charges(&[good, bad]) {
        Ok(batch) => println!("  unexpected success with {} breakdowns", batch.len()),
        Err(e) => println!("  one bad fill -> {} ({})\n", e.public_message(), e),
    }
}

fn sample_market_data(client: &ClientId) -> StaticMarketData {
    StaticMarketData::new()
        .with_funds(
            client.clone(),
            vec![
                FundsRow::new("openingBalance", "4423.23"),
                FundsRow::new("marginUsed", "32.42"),
                FundsRow::new("payIn", "0"),
                FundsRow::new("equityCreditSell", "0"),
                FundsRow::new("collateral", "n/a"),
            ],
        )
        .with_positions(
            client.clone(),
            vec![Position {
                exchange: "NSE".to_string(),
                trading_symbol: "TATASTEEL".to_string(),
                product: "MIS".to_string(),
                net_quantity: 0,
                net_amount: dec!(-50),
            }],
        )
        .with_orders(
            client.clone(),
            vec![CompletedOrder {
                order_id: "240001".to_string(),
                exchange: "NSE".to_string(),
                trading_symbol: "TATASTEEL".to_string(),
                product: "MIS".to_string(),
                transaction_type: "SELL".to_string(),
                status: "COMPLETE".to_string(),
                average_price: dec!(500),
                filled_quantity: dec!(100),
            }],
        )
}

fn sim_engine(settings: &Settings, client: &ClientId, store: InMemoryPayoutStore, queue: InMemoryQueueStore) -> Engine {
    Engine::new(
        settings.clone(),
        Collaborators::in_memory(sample_market_data(client), store, queue, Arc::new(SystemClock)),
    )
}

async fn scenario_3_eligibility(settings: &Settings) {
    println!("Scenario 3: Payout Eligibility\n");

    let client = ClientId::new("SIM001");
    let engine = sim_engine(settings, &client, InMemoryPayoutStore::new(), InMemoryQueueStore::new());

    match engine.compute_payout_eligibility(&client).await {
        Ok(decision) => {
            println!("  opening balance     {}", decision.funds.opening_balance);
            println!("  margin used         {}", decision.funds.margin_used);
            println!("  loss on closed      {}", decision.positions.loss_on_closed_positions);
            println!("  charges on trades   {}", decision.charges_on_trades);
            println!("  calculated payout   {}", decision.calculated_payout_amount);
            println!("  payout amount       {}", decision.payout_amount);
            println!("  extra payout        {}\n", decision.extra_payout_amount);
        }
        Err(e) => println!("  eligibility failed: {}\n", e.public_message()),
    }

    let unknown = ClientId::new("NOBODY");
    if let Err(e) = engine.compute_payout_eligibility(&unknown).await {
        println!("  unknown client -> {} {}\n", e.status_code(), e.public_message());
    }
}

fn bank() -> BankDetails {
    BankDetails {
        ifsc: "HDFC0001234".to_string(),
        account_number: "50100099887766".to_string(),
        bank_name: "HDFC Bank".to_string(),
    }
}

async fn scenario_4_request_and_cancel(settings: &Settings) {
    println!("Scenario 4: Request, Duplicate, Over-limit, Cancel\n");

    let client = ClientId::new("SIM001");
    let queue = InMemoryQueueStore::new();
    let engine = sim_engine(settings, &client, InMemoryPayoutStore::new(), queue.clone());

    let request = PayoutRequest {
        client_id: client.clone(),
        amount: dec!(5000),
        bank: bank(),
    };
    if let Err(e) = engine.request_payout(request, SettlementWindowPolicy::open()).await {
        println!("  5000.00 -> {} {}", e.status_code(), e.public_message());
    }

    let request = PayoutRequest {
        client_id: client.clone(),
        amount: dec!(1000),
        bank: bank(),
    };
    let receipt = match engine.request_payout(request.clone(), SettlementWindowPolicy::open()).await {
        Ok(receipt) => receipt,
        Err(e) => {
            println!("  request failed: {e}");
            return;
        }
    };
    let bucket_key = receipt.bucket.key(&settings.payout.queue_key_prefix);
    println!(
        "  1000.00 -> {} ({:?}), queued in {} ({} entries)",
        receipt.transaction_id,
        receipt.status,
        bucket_key,
        queue.hlen(&bucket_key).await
    );

    if let Err(e) = engine.request_payout(request, SettlementWindowPolicy::open()).await {
        println!("  duplicate -> {} {}", e.status_code(), e.public_message());
    }

    match engine.cancel_payout(&client, &receipt.transaction_id).await {
        Ok(outcome) => println!("  cancel -> {}", outcome.message()),
        Err(e) => println!("  cancel failed: {e}"),
    }
    println!("  queue entries left: {}\n", queue.hlen(&bucket_key).await);
}

async fn scenario_5_closed_window(settings: &Settings) {
    println!("Scenario 5: Withdrawal Window Closed\n");

    let client = ClientId::new("SIM001");
    let store = InMemoryPayoutStore::new();
    let queue = InMemoryQueueStore::new();
    queue.set(&settings.payout.window_flag_key, "0").await;
    let engine = sim_engine(settings, &client, store.clone(), queue.clone());

    let window = match engine.settlement_window().await {
        Ok(window) => window,
        Err(e) => {
            println!("  window read failed: {e}");
            return;
        }
    };
    let request = PayoutRequest {
        client_id: client.clone(),
        amount: dec!(250),
        bank: bank(),
    };
    match engine.request_payout(request, window).await {
        Ok(receipt) => {
            let key = receipt.bucket.key(&settings.payout.queue_key_prefix);
            let queued = queue
                .hget(&key, client.as_str())
                .await
                .and_then(|raw| PayoutQueueEntry::from_json(&raw).ok())
                .map(|entry| entry.amount);
            println!(
                "  recorded {:?} for {} paise, queued amount {:?}\n",
                receipt.status, receipt.amount, queued
            );
        }
        Err(e) => println!("  request failed: {e}\n"),
    }
}

async fn scenario_6_cancel_after_settlement(settings: &Settings) {
    println!("Scenario 6: Cancel After Settlement\n");

    let client = ClientId::new("SIM001");
    let store = InMemoryPayoutStore::new();
    let engine = sim_engine(settings, &client, store.clone(), InMemoryQueueStore::new());

    let request = PayoutRequest {
        client_id: client.clone(),
        amount: dec!(100),
        bank: bank(),
    };
    let Ok(receipt) = engine.request_payout(request, SettlementWindowPolicy::open()).await else {
        println!("  request failed");
        return;
    };

    if store.mark_proceeded(&receipt.transaction_id, engine.now()).await.is_err() {
        println!("  settlement step failed");
        return;
    }
    match engine.cancel_payout(&client, &receipt.transaction_id).await {
        Ok(outcome) => println!("  cancel -> {}", outcome.message()),
        Err(e) => println!("  cancel failed: {e}"),
    }
}
