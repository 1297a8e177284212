// 2.0 aggregator.rs: wire-form fills in, rounded charge breakdowns out.
// 2.1 segment/sub-segment/exchange/process are matched case-insensitively. an
//     unmatched segment pair yields an all-zero breakdown rather than an error; an
//     unmatched exchange or side only zeroes the terms gated on it.
// 2.2 canonical rounding: each component ceiled to paise on its own, stamp then
//     floored to whole rupees, total ceiled over the rounded parts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::charges::{compute_segment_charges, SegmentCharges, TradeOrderFill};
use crate::commodity::CommodityGroup;
use crate::config::ChargeSchedule;
use crate::rounding::{ceil_to_cents, stamp_whole_units, ArithmeticOverflow};
use crate::types::{ClientId, Exchange, Process, Segment, SubSegment};

/// A fill as callers send it: market coordinates are free-form strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    pub client_id: String,
    pub segment: String,
    pub sub_segment: String,
    pub exchange: String,
    pub process: String,
    pub price: Decimal,
    pub quantity: Decimal,
    #[serde(default)]
    pub group_info: String,
    #[serde(default)]
    pub agri: bool,
    #[serde(default)]
    pub product: String,
}

impl ChargeRequest {
    pub fn validate(&self) -> Result<(), ChargeError> {
        if self.price < Decimal::ZERO {
            return Err(ChargeError::Validation(format!("price {} is negative", self.price)));
        }
        if self.quantity < Decimal::ZERO {
            return Err(ChargeError::Validation(format!(
                "quantity {} is negative",
                self.quantity
            )));
        }
        Ok(())
    }

    /// Typed view of the request, or None when the segment pair has no match.
    /// MTF fills skip segment matching and always price as equity delivery.
    pub fn to_fill(&self) -> Option<TradeOrderFill> {
        let mut fill = TradeOrderFill {
            client_id: ClientId::new(self.client_id.clone()),
            segment: Segment::Equity,
            sub_segment: SubSegment::Delivery,
            exchange: Exchange::parse(&self.exchange),
            process: Process::parse(&self.process),
            price: self.price,
            quantity: self.quantity,
            group: CommodityGroup::parse(&self.group_info).unwrap_or(CommodityGroup::Normal),
            agri: self.agri,
            product: self.product.clone(),
        };

        if !fill.is_mtf() {
            fill.segment = Segment::parse(&self.segment)?;
            fill.sub_segment = SubSegment::parse(&self.sub_segment)?;
        }
        Some(fill)
    }
}

/// Charges for one fill after canonical rounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeBreakdown {
    pub brokerage: Decimal,
    pub stt_or_ctt: Decimal,
    pub transaction_charges: Decimal,
    pub sebi_charges: Decimal,
    pub gst: Decimal,
    pub stamp_charges: Decimal,
    pub total_charge: Decimal,
    pub gross_price: Decimal,
}

impl ChargeBreakdown {
    pub fn zero() -> Self {
        Self::from_raw(&SegmentCharges::zero())
    }

    pub fn from_raw(raw: &SegmentCharges) -> Self {
        let brokerage = ceil_to_cents(raw.brokerage);
        let stt_or_ctt = ceil_to_cents(raw.stt_or_ctt);
        let transaction_charges = ceil_to_cents(raw.transaction_charges);
        let sebi_charges = ceil_to_cents(raw.sebi_charges);
        let gst = ceil_to_cents(raw.gst);
        let stamp_charges = stamp_whole_units(raw.stamp_charges);

        let total_charge = ceil_to_cents(
            brokerage + stt_or_ctt + transaction_charges + sebi_charges + gst + stamp_charges,
        );

        Self {
            brokerage,
            stt_or_ctt,
            transaction_charges,
            sebi_charges,
            gst,
            stamp_charges,
            total_charge,
            gross_price: raw.gross_price,
        }
    }

    // the six charge components, as stored
    pub fn component_sum(&self) -> Decimal {
        self.brokerage
            + self.stt_or_ctt
            + self.transaction_charges
            + self.sebi_charges
            + self.gst
            + self.stamp_charges
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChargeError {
    #[error("invalid fill: {0}")]
    Validation(String),

    #[error("invalid fill at position {index}: {reason}")]
    InvalidBatchItem { index: usize, reason: String },
}

impl From<ArithmeticOverflow> for ChargeError {
    fn from(error: ArithmeticOverflow) -> Self {
        ChargeError::Validation(format!("price x quantity out of range: {error}"))
    }
}

/// Segment dispatch plus rounding over a shared schedule.
#[derive(Debug, Clone)]
pub struct BrokerChargeAggregator {
    schedule: Arc<ChargeSchedule>,
}

impl BrokerChargeAggregator {
    pub fn new(schedule: Arc<ChargeSchedule>) -> Self {
        Self { schedule }
    }

    pub fn schedule(&self) -> &ChargeSchedule {
        &self.schedule
    }

    pub fn compute_fill(&self, fill: &TradeOrderFill) -> Result<ChargeBreakdown, ChargeError> {
        let raw = compute_segment_charges(fill, &self.schedule)?;
        Ok(ChargeBreakdown::from_raw(&raw))
    }

    pub fn compute_charges(&self, request: &ChargeRequest) -> Result<ChargeBreakdown, ChargeError> {
        request.validate()?;

        match request.to_fill() {
            Some(fill) => self.compute_fill(&fill),
            None => {
                debug!(
                    segment = %request.segment,
                    sub_segment = %request.sub_segment,
                    exchange = %request.exchange,
                    process = %request.process,
                    "no charge formula for fill, charging nothing"
                );
                Ok(ChargeBreakdown::zero())
            }
        }
    }

    /// All or nothing: one bad fill rejects the batch.
    pub fn combine_broker_charges(
        &self,
        requests: &[ChargeRequest],
    ) -> Result<Vec<ChargeBreakdown>, ChargeError> {
        requests
            .iter()
            .enumerate()
            .map(|(index, request)| {
                self.compute_charges(request).map_err(|e| ChargeError::InvalidBatchItem {
                    index,
                    reason: e.to_string(),
                })
            })
            .collect()
    }
}
