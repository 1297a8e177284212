//! Completed orders from the order book feed, and their translation into fills
//! the charge engine can price.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::charges::TradeOrderFill;
use crate::commodity::{CommodityClass, CommodityGroup};
use crate::types::{ClientId, Exchange, Process, Segment, SubSegment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedOrder {
    pub order_id: String,
    pub exchange: String,
    pub trading_symbol: String,
    pub product: String,
    pub transaction_type: String,
    pub status: String,
    pub average_price: Decimal,
    pub filled_quantity: Decimal,
}

impl CompletedOrder {
    pub fn is_completed(&self) -> bool {
        let status = self.status.trim();
        status.eq_ignore_ascii_case("Completed") || status.eq_ignore_ascii_case("Complete")
    }

    /// Segment the charge engine should price this order under.
    ///
    /// CDS is priced as equity, not currency. That is how the back office books
    /// these orders today, so the charges here match what clients were billed.
    pub fn segment(exchange: Exchange) -> Segment {
        match exchange {
            Exchange::Nse | Exchange::Bse | Exchange::Nfo | Exchange::Cds => Segment::Equity,
            Exchange::Mcx => Segment::Commodity,
        }
    }

    fn sub_segment(&self, exchange: Exchange) -> SubSegment {
        match exchange {
            Exchange::Nse | Exchange::Bse => {
                match self.product.trim().to_ascii_uppercase().as_str() {
                    "MIS" => SubSegment::Intraday,
                    _ => SubSegment::Delivery,
                }
            }
            _ => {
                if self.trading_symbol.trim().to_ascii_uppercase().ends_with("FUT") {
                    SubSegment::Futures
                } else {
                    SubSegment::Options
                }
            }
        }
    }

    /// None when the exchange is unknown, since the segment comes from it. An
    /// unknown side still prices, without its side-gated terms.
    pub fn to_fill(&self, client_id: &ClientId) -> Option<TradeOrderFill> {
        let exchange = Exchange::parse(&self.exchange)?;
        let process = Process::parse(&self.transaction_type);

        let class = match exchange {
            Exchange::Mcx => CommodityGroup::classify(&self.trading_symbol),
            _ => CommodityClass {
                group: CommodityGroup::Normal,
                agri: false,
            },
        };

        Some(TradeOrderFill {
            client_id: client_id.clone(),
            segment: Self::segment(exchange),
            sub_segment: self.sub_segment(exchange),
            exchange: Some(exchange),
            process,
            price: self.average_price,
            quantity: self.filled_quantity,
            group: class.group,
            agri: class.agri,
            product: self.product.trim().to_string(),
        })
    }
}
