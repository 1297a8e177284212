// 8.3 engine/eligibility.rs: how much a client may withdraw.
// 8.3.1 funds, positions and orders are fetched concurrently; any failure aborts.
// 8.3.2 payout never exceeds the opening balance and never goes below zero.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use super::core::Engine;
use super::results::{EngineError, PayoutDecision};
use crate::funds::FundsSnapshot;
use crate::order::CompletedOrder;
use crate::position::{aggregate_positions, PositionAggregate};
use crate::sources::UpstreamError;
use crate::types::ClientId;

impl Engine {
    pub async fn compute_payout_eligibility(&self, client_id: &ClientId) -> Result<PayoutDecision, EngineError> {
        let fetched = tokio::try_join!(
            self.funds.fetch_funds(client_id),
            self.positions.historical_positions(client_id),
            self.orders.completed_orders(client_id),
        );
        let (rows, positions, orders) = fetched.map_err(|e| {
            warn!(client_id = %client_id, error = %e, "eligibility fetch failed");
            e
        })?;

        let funds = FundsSnapshot::from_rows(&rows).map_err(|e| {
            warn!(client_id = %client_id, error = %e, "funds feed unparsable");
            e
        })?;
        let aggregate = aggregate_positions(&positions, self.settings.dp_charge_per_scrip);
        let trade_charges = self.charges_on_orders(client_id, &orders)?;

        let decision = decide_payout(&funds, &aggregate, trade_charges, self.settings.cm_profit_factor);
        debug!(
            client_id = %client_id,
            payout_amount = %decision.payout_amount,
            extra_payout_amount = %decision.extra_payout_amount,
            charges_on_trades = %decision.charges_on_trades,
            "payout eligibility computed"
        );
        Ok(decision)
    }

    // sum of the six rounded components over every completed order
    fn charges_on_orders(&self, client_id: &ClientId, orders: &[CompletedOrder]) -> Result<Decimal, EngineError> {
        let mut total = Decimal::ZERO;
        for order in orders.iter().filter(|order| order.is_completed()) {
            let Some(fill) = order.to_fill(client_id) else {
                debug!(order_id = %order.order_id, exchange = %order.exchange, "order not priceable, skipped");
                continue;
            };

            // figures this large only come from a corrupt order feed
            let charges = self
                .aggregator
                .compute_fill(&fill)
                .map_err(|e| malformed_order(order, e))?;
            total = total
                .checked_add(charges.component_sum())
                .ok_or_else(|| malformed_order(order, "charge total out of range"))?;
        }
        Ok(total)
    }
}

fn malformed_order(order: &CompletedOrder, reason: impl std::fmt::Display) -> EngineError {
    warn!(order_id = %order.order_id, reason = %reason, "order feed unusable");
    EngineError::Upstream(UpstreamError::Malformed(format!("order {}: {reason}", order.order_id)))
}

/// The arithmetic half of eligibility, with no I/O. `trade_charges` excludes
/// DP charges; those come from `positions`.
pub fn decide_payout(
    funds: &FundsSnapshot,
    positions: &PositionAggregate,
    trade_charges: Decimal,
    cm_profit_factor: Decimal,
) -> PayoutDecision {
    let charges_on_trades = trade_charges + positions.dp_charges;
    let total_pnl = positions.total_pnl_on_closed_positions(cm_profit_factor);
    let opening = funds.opening_balance;

    let calculated = opening + funds.pay_in
        - funds.margin_used
        - positions.loss_on_closed_positions.abs()
        - charges_on_trades;

    // a negative opening balance leaves nothing to pay out
    let ceiling = opening.max(Decimal::ZERO);
    let payout_amount = opening.min(calculated).max(Decimal::ZERO).min(ceiling);

    let extra = opening + funds.pay_in - funds.margin_used + total_pnl + funds.equity_credit_sell
        - charges_on_trades;

    PayoutDecision {
        payout_amount,
        extra_payout_amount: extra.max(Decimal::ZERO),
        calculated_payout_amount: calculated,
        charges_on_trades,
        total_pnl_on_closed_positions: total_pnl,
        funds: *funds,
        positions: *positions,
    }
}
