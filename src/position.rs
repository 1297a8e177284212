// 4.0: historical positions from the back office and the closed-position scan
// that feeds the payout decision.
// 4.1 a position is closed when its net quantity is zero; its net amount is realized pnl.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub exchange: String,
    pub trading_symbol: String,
    pub product: String,
    pub net_quantity: i64,
    pub net_amount: Decimal,
}

impl Position {
    pub fn is_closed(&self) -> bool {
        self.net_quantity == 0
    }

    // NFO and MCX pnl is not cash-market pnl
    pub fn is_cash_market(&self) -> bool {
        let exchange = self.exchange.trim();
        !exchange.eq_ignore_ascii_case("NFO") && !exchange.eq_ignore_ascii_case("MCX")
    }

    // a net sell of delivery stock debits the demat account
    pub fn attracts_dp_charge(&self) -> bool {
        self.net_quantity < 0 && self.product.trim().eq_ignore_ascii_case("CNC")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionAggregate {
    pub cm_pnl_on_closed_positions: Decimal,
    pub pnl_on_closed_positions: Decimal,
    pub loss_on_closed_positions: Decimal,
    pub dp_charges: Decimal,
}

impl PositionAggregate {
    /// Realized pnl credited towards the extra payout: losses in full, cash-market
    /// profit only after the haircut `cm_profit_factor` (e.g. 0.95).
    pub fn total_pnl_on_closed_positions(&self, cm_profit_factor: Decimal) -> Decimal {
        if self.pnl_on_closed_positions < Decimal::ZERO {
            self.pnl_on_closed_positions
        } else {
            self.cm_pnl_on_closed_positions * cm_profit_factor
        }
    }
}

pub fn aggregate_positions(positions: &[Position], dp_charge_per_scrip: Decimal) -> PositionAggregate {
    let mut aggregate = PositionAggregate::default();

    for position in positions {
        if position.is_closed() {
            aggregate.pnl_on_closed_positions += position.net_amount;
            if position.net_amount < Decimal::ZERO {
                aggregate.loss_on_closed_positions += position.net_amount;
            }
            if position.is_cash_market() {
                aggregate.cm_pnl_on_closed_positions += position.net_amount;
            }
        }

        if position.attracts_dp_charge() {
            aggregate.dp_charges += dp_charge_per_scrip;
        }
    }

    aggregate
}
