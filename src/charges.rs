//! Per-segment charge formulas.
//!
//! `compute_segment_charges` is pure: a fill and a schedule in, unrounded charge
//! components out. Every product of turnover and a rate is floored to 10 decimal
//! places before it enters a sum; rounding up to currency units happens later, in
//! the aggregator.
//!
//! The eight formulas are rows of a table keyed by [`ChargeKey`]. Each row says how
//! a component is derived; the row for a key is chosen by an exhaustive match.
//!
//! An exchange or side the engine does not know only zeroes the terms gated on it
//! (exchange-specific transaction rates, sell-side STT, buy-side stamp).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::commodity::CommodityGroup;
use crate::config::{ChargeSchedule, RateCard};
use crate::rounding::{floored_product, ArithmeticOverflow};
use crate::types::{ChargeKey, ClientId, Exchange, Process, Segment, SubSegment, Venue};

pub const MTF_PRODUCT: &str = "MTF";

/// A fill that has been parsed into typed market coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeOrderFill {
    pub client_id: ClientId,
    pub segment: Segment,
    pub sub_segment: SubSegment,
    pub exchange: Option<Exchange>,
    pub process: Option<Process>,
    pub price: Decimal,
    pub quantity: Decimal,
    pub group: CommodityGroup,
    pub agri: bool,
    pub product: String,
}

impl TradeOrderFill {
    pub fn is_mtf(&self) -> bool {
        self.product.trim().eq_ignore_ascii_case(MTF_PRODUCT)
    }
}

/// Charge components before the aggregator's rounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCharges {
    pub brokerage: Decimal,
    pub stt_or_ctt: Decimal,
    pub transaction_charges: Decimal,
    pub sebi_charges: Decimal,
    pub gst: Decimal,
    pub stamp_charges: Decimal,
    pub gross_price: Decimal,
}

impl SegmentCharges {
    pub fn zero() -> Self {
        Self {
            brokerage: Decimal::ZERO,
            stt_or_ctt: Decimal::ZERO,
            transaction_charges: Decimal::ZERO,
            sebi_charges: Decimal::ZERO,
            gst: Decimal::ZERO,
            stamp_charges: Decimal::ZERO,
            gross_price: Decimal::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BrokerageRule {
    Flat,
    // min(turnover * rate, flat)
    TurnoverCapped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SttRule {
    BothSides,
    SellOnly,
    SellOnlyNonAgri,
    FlatAmount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransactionRule {
    NseOrBse,
    NseOnly,
    ByCommodityGroup,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SebiRule {
    Turnover,
    AgriAware,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StampRule {
    BuyOnly,
    Always,
}

#[derive(Debug, Clone, Copy)]
struct Formula {
    brokerage: BrokerageRule,
    stt: SttRule,
    transaction: TransactionRule,
    sebi: SebiRule,
    gst_includes_sebi: bool,
    stamp: StampRule,
}

fn formula(key: ChargeKey) -> Formula {
    match key {
        ChargeKey::EquityDelivery => Formula {
            brokerage: BrokerageRule::Flat,
            stt: SttRule::BothSides,
            transaction: TransactionRule::NseOrBse,
            sebi: SebiRule::Turnover,
            gst_includes_sebi: true,
            stamp: StampRule::BuyOnly,
        },
        ChargeKey::EquityIntraday => Formula {
            brokerage: BrokerageRule::TurnoverCapped,
            stt: SttRule::SellOnly,
            transaction: TransactionRule::NseOrBse,
            sebi: SebiRule::Turnover,
            gst_includes_sebi: true,
            stamp: StampRule::BuyOnly,
        },
        ChargeKey::EquityFutures => Formula {
            brokerage: BrokerageRule::TurnoverCapped,
            stt: SttRule::SellOnly,
            transaction: TransactionRule::NseOnly,
            sebi: SebiRule::Turnover,
            gst_includes_sebi: true,
            stamp: StampRule::BuyOnly,
        },
        ChargeKey::EquityOptions => Formula {
            brokerage: BrokerageRule::Flat,
            stt: SttRule::SellOnly,
            transaction: TransactionRule::NseOnly,
            sebi: SebiRule::Turnover,
            gst_includes_sebi: true,
            stamp: StampRule::BuyOnly,
        },
        ChargeKey::CurrencyFutures => Formula {
            brokerage: BrokerageRule::TurnoverCapped,
            stt: SttRule::FlatAmount,
            transaction: TransactionRule::NseOrBse,
            sebi: SebiRule::Turnover,
            gst_includes_sebi: false,
            stamp: StampRule::BuyOnly,
        },
        ChargeKey::CurrencyOptions => Formula {
            brokerage: BrokerageRule::Flat,
            stt: SttRule::FlatAmount,
            transaction: TransactionRule::NseOrBse,
            sebi: SebiRule::Turnover,
            gst_includes_sebi: false,
            stamp: StampRule::BuyOnly,
        },
        ChargeKey::CommodityFutures => Formula {
            brokerage: BrokerageRule::TurnoverCapped,
            stt: SttRule::SellOnlyNonAgri,
            transaction: TransactionRule::ByCommodityGroup,
            sebi: SebiRule::AgriAware,
            gst_includes_sebi: false,
            stamp: StampRule::BuyOnly,
        },
        // stamp is charged on both sides here, unlike every other row
        ChargeKey::CommodityOptions => Formula {
            brokerage: BrokerageRule::Flat,
            stt: SttRule::SellOnly,
            transaction: TransactionRule::Single,
            sebi: SebiRule::Turnover,
            gst_includes_sebi: false,
            stamp: StampRule::Always,
        },
    }
}

/// Unrounded charges for one fill. Pairs without a formula (e.g. currency
/// delivery) charge nothing. Fails only when a product leaves `Decimal` range.
pub fn compute_segment_charges(
    fill: &TradeOrderFill,
    schedule: &ChargeSchedule,
) -> Result<SegmentCharges, ArithmeticOverflow> {
    if fill.is_mtf() {
        return mtf_charges(fill, schedule);
    }

    match ChargeKey::resolve(fill.segment, fill.sub_segment) {
        Some(key) => apply_formula(fill, schedule, schedule.rate_card(key), formula(key), None),
        None => Ok(SegmentCharges::zero()),
    }
}

// delivery formula with turnover-based brokerage capped at the MTF maximum
fn mtf_charges(fill: &TradeOrderFill, schedule: &ChargeSchedule) -> Result<SegmentCharges, ArithmeticOverflow> {
    let turnover = floored_product(fill.price, fill.quantity)?;
    let brokerage = floored_product(turnover, schedule.mtf.brokerage_rate)?.min(schedule.mtf.brokerage_cap);

    apply_formula(
        fill,
        schedule,
        &schedule.equity_delivery,
        formula(ChargeKey::EquityDelivery),
        Some(brokerage),
    )
}

fn apply_formula(
    fill: &TradeOrderFill,
    schedule: &ChargeSchedule,
    card: &RateCard,
    formula: Formula,
    brokerage_override: Option<Decimal>,
) -> Result<SegmentCharges, ArithmeticOverflow> {
    let turnover = floored_product(fill.price, fill.quantity)?;
    let sell = fill.process == Some(Process::Sell);
    let buy = fill.process == Some(Process::Buy);

    let brokerage = match (brokerage_override, formula.brokerage) {
        (Some(brokerage), _) => brokerage,
        (None, BrokerageRule::Flat) => card.brokerage_flat,
        (None, BrokerageRule::TurnoverCapped) => {
            floored_product(turnover, card.brokerage_rate)?.min(card.brokerage_flat)
        }
    };

    let stt_or_ctt = match formula.stt {
        SttRule::BothSides => floored_product(turnover, card.stt_rate)?,
        SttRule::SellOnly if sell => floored_product(turnover, card.stt_rate)?,
        SttRule::SellOnlyNonAgri if sell && !fill.agri => floored_product(turnover, card.stt_rate)?,
        SttRule::FlatAmount => card.stt_flat,
        _ => Decimal::ZERO,
    };

    let venue = fill.exchange.map(|exchange| exchange.venue());
    let transaction_charges = match formula.transaction {
        TransactionRule::NseOrBse => match venue {
            Some(Venue::Nse) => floored_product(turnover, card.transaction_rate)?,
            Some(Venue::Bse) => floored_product(turnover, card.transaction_rate_bse)?,
            Some(Venue::Mcx) | None => Decimal::ZERO,
        },
        TransactionRule::NseOnly if venue == Some(Venue::Nse) => {
            floored_product(turnover, card.transaction_rate)?
        }
        TransactionRule::NseOnly => Decimal::ZERO,
        TransactionRule::ByCommodityGroup => {
            floored_product(turnover, schedule.commodity_groups.rate_for(fill.group))?
        }
        TransactionRule::Single => floored_product(turnover, card.transaction_rate)?,
    };

    let sebi_rate = match formula.sebi {
        SebiRule::AgriAware if fill.agri => schedule.commodity_agri_sebi_rate,
        _ => card.sebi_rate,
    };
    let sebi_charges = floored_product(turnover, sebi_rate)?;

    let mut gst_base = brokerage + transaction_charges;
    if formula.gst_includes_sebi {
        gst_base += sebi_charges;
    }
    let gst = floored_product(gst_base, schedule.gst_rate)?;

    let stamp_charges = match formula.stamp {
        StampRule::BuyOnly if !buy => Decimal::ZERO,
        _ => floored_product(turnover, card.stamp_rate)?,
    };

    Ok(SegmentCharges {
        brokerage,
        stt_or_ctt,
        transaction_charges,
        sebi_charges,
        gst,
        stamp_charges,
        gross_price: turnover,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn fill(
        segment: Segment,
        sub_segment: SubSegment,
        exchange: Exchange,
        process: Process,
        price: Decimal,
        quantity: Decimal,
    ) -> TradeOrderFill {
        TradeOrderFill {
            client_id: ClientId::new("C1"),
            segment,
            sub_segment,
            exchange: Some(exchange),
            process: Some(process),
            price,
            quantity,
            group: CommodityGroup::Normal,
            agri: false,
            product: "CNC".to_string(),
        }
    }

    #[test]
    fn delivery_buy_charges_stt_and_stamp() {
        let schedule = ChargeSchedule::default();
        let f = fill(Segment::Equity, SubSegment::Delivery, Exchange::Nse, Process::Buy, dec!(100), dec!(10));
        let c = compute_segment_charges(&f, &schedule).unwrap();

        assert_eq!(c.gross_price, dec!(1000));
        assert_eq!(c.brokerage, Decimal::ZERO);
        assert_eq!(c.stt_or_ctt, dec!(1.000));
        assert_eq!(c.transaction_charges, dec!(0.0297));
        assert_eq!(c.sebi_charges, dec!(0.001));
        // (0 + 0.001 + 0.0297) * 0.18
        assert_eq!(c.gst, dec!(0.005526));
        assert_eq!(c.stamp_charges, dec!(0.15));
    }

    #[test]
    fn delivery_sell_skips_stamp_but_keeps_stt() {
        let schedule = ChargeSchedule::default();
        let f = fill(Segment::Equity, SubSegment::Delivery, Exchange::Bse, Process::Sell, dec!(100), dec!(10));
        let c = compute_segment_charges(&f, &schedule).unwrap();

        assert_eq!(c.stt_or_ctt, dec!(1));
        assert_eq!(c.transaction_charges, dec!(0.0375));
        assert_eq!(c.stamp_charges, Decimal::ZERO);
    }

    #[test]
    fn intraday_brokerage_capped() {
        let schedule = ChargeSchedule::default();
        let small = fill(Segment::Equity, SubSegment::Intraday, Exchange::Nse, Process::Sell, dec!(500), dec!(100));
        assert_eq!(compute_segment_charges(&small, &schedule).unwrap().brokerage, dec!(15));

        let large = fill(Segment::Equity, SubSegment::Intraday, Exchange::Nse, Process::Buy, dec!(2000), dec!(100));
        let c = compute_segment_charges(&large, &schedule).unwrap();
        assert_eq!(c.brokerage, dec!(20));
        assert_eq!(c.stt_or_ctt, Decimal::ZERO);
    }

    #[test]
    fn equity_futures_has_no_bse_transaction_rate() {
        let schedule = ChargeSchedule::default();
        let bse = fill(Segment::Equity, SubSegment::Futures, Exchange::Bse, Process::Buy, dec!(100), dec!(50));
        assert_eq!(compute_segment_charges(&bse, &schedule).unwrap().transaction_charges, Decimal::ZERO);

        let nfo = fill(Segment::Equity, SubSegment::Futures, Exchange::Nfo, Process::Buy, dec!(100), dec!(50));
        assert_eq!(compute_segment_charges(&nfo, &schedule).unwrap().transaction_charges, dec!(0.0865));
    }

    #[test]
    fn currency_gst_excludes_sebi() {
        let schedule = ChargeSchedule::default();
        let f = fill(Segment::Currency, SubSegment::Futures, Exchange::Cds, Process::Buy, dec!(83.5), dec!(1000));
        let c = compute_segment_charges(&f, &schedule).unwrap();

        assert_eq!(c.brokerage, dec!(20));
        assert_eq!(c.transaction_charges, dec!(0.29225));
        assert_eq!(c.sebi_charges, dec!(0.0835));
        assert_eq!(c.gst, dec!(3.652605));
    }

    #[test]
    fn currency_stt_is_flat() {
        let mut schedule = ChargeSchedule::default();
        schedule.currency_options.stt_flat = dec!(5);
        let buy = fill(Segment::Currency, SubSegment::Options, Exchange::Cds, Process::Buy, dec!(1), dec!(1000));
        let sell = fill(Segment::Currency, SubSegment::Options, Exchange::Bse, Process::Sell, dec!(9), dec!(1000));

        assert_eq!(compute_segment_charges(&buy, &schedule).unwrap().stt_or_ctt, dec!(5));
        assert_eq!(compute_segment_charges(&sell, &schedule).unwrap().stt_or_ctt, dec!(5));
    }

    #[test]
    fn commodity_futures_agri_skips_ctt_and_uses_agri_sebi() {
        let schedule = ChargeSchedule::default();
        let mut f = fill(Segment::Commodity, SubSegment::Futures, Exchange::Mcx, Process::Sell, dec!(1500), dec!(200));
        f.group = CommodityGroup::Kapas;
        f.agri = true;
        let c = compute_segment_charges(&f, &schedule).unwrap();

        assert_eq!(c.stt_or_ctt, Decimal::ZERO);
        assert_eq!(c.transaction_charges, dec!(1.5));
        assert_eq!(c.sebi_charges, dec!(0.03));
        assert_eq!(c.gst, dec!(3.87));
    }

    #[test]
    fn commodity_options_stamp_on_sell() {
        let schedule = ChargeSchedule::default();
        let f = fill(Segment::Commodity, SubSegment::Options, Exchange::Mcx, Process::Sell, dec!(1000), dec!(100));
        let c = compute_segment_charges(&f, &schedule).unwrap();

        assert_eq!(c.stamp_charges, dec!(3));
        assert_eq!(c.stt_or_ctt, dec!(50));
        assert_eq!(c.transaction_charges, dec!(41.8));
    }

    #[test]
    fn mtf_brokerage_capped() {
        let schedule = ChargeSchedule::default();
        let mut f = fill(Segment::Equity, SubSegment::Intraday, Exchange::Nse, Process::Buy, dec!(1000), dec!(10));
        f.product = "mtf".to_string();
        let c = compute_segment_charges(&f, &schedule).unwrap();

        assert_eq!(c.brokerage, dec!(20));
        // delivery stt, not intraday
        assert_eq!(c.stt_or_ctt, dec!(10));
    }

    #[test]
    fn unsupported_pair_is_zero() {
        let schedule = ChargeSchedule::default();
        let f = fill(Segment::Currency, SubSegment::Delivery, Exchange::Cds, Process::Buy, dec!(80), dec!(100));
        assert_eq!(compute_segment_charges(&f, &schedule).unwrap(), SegmentCharges::zero());
    }

    #[test]
    fn unknown_exchange_keeps_ungated_terms() {
        let schedule = ChargeSchedule::default();
        let mut f = fill(Segment::Equity, SubSegment::Delivery, Exchange::Nse, Process::Buy, dec!(100), dec!(10));
        f.exchange = None;
        let c = compute_segment_charges(&f, &schedule).unwrap();

        assert_eq!(c.stt_or_ctt, dec!(1));
        assert_eq!(c.sebi_charges, dec!(0.001));
        assert_eq!(c.transaction_charges, Decimal::ZERO);
        assert_eq!(c.gst, dec!(0.00018));
        assert_eq!(c.stamp_charges, dec!(0.15));
    }

    #[test]
    fn unknown_side_drops_side_gated_terms() {
        let schedule = ChargeSchedule::default();
        let mut f = fill(Segment::Equity, SubSegment::Intraday, Exchange::Nse, Process::Sell, dec!(500), dec!(100));
        f.process = None;
        let c = compute_segment_charges(&f, &schedule).unwrap();

        assert_eq!(c.brokerage, dec!(15));
        assert_eq!(c.stt_or_ctt, Decimal::ZERO);
        assert_eq!(c.stamp_charges, Decimal::ZERO);
        assert_eq!(c.transaction_charges, dec!(1.485));
    }

    #[test]
    fn oversized_fill_is_an_error() {
        let schedule = ChargeSchedule::default();
        let huge = Decimal::from(1_000_000_000_000_000i64);
        let f = fill(Segment::Equity, SubSegment::Delivery, Exchange::Nse, Process::Buy, huge, huge);
        assert!(compute_segment_charges(&f, &schedule).is_err());
    }

    #[test]
    fn intermediate_terms_are_floored() {
        let schedule = ChargeSchedule::default();
        let f = fill(Segment::Equity, SubSegment::Delivery, Exchange::Nse, Process::Buy, dec!(0.33333333333), dec!(3));
        let c = compute_segment_charges(&f, &schedule).unwrap();

        assert_eq!(c.gross_price, dec!(0.9999999999));
        assert!(c.sebi_charges.scale() <= 10);
        assert!(c.gst.scale() <= 10);
    }
}
