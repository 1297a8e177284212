// 1.0: all the primitives live here. ids, market coordinates, the clock.
// ids are newtypes so a client id never gets passed where a transaction id belongs.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(pub String);

impl ClientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// 1.1: market segment. the charge formula is picked by (segment, sub-segment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Segment {
    Equity,
    Currency,
    Commodity,
}

impl Segment {
    // case-insensitive; None means "no formula", not an error
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "EQUITY" => Some(Segment::Equity),
            "CURRENCY" => Some(Segment::Currency),
            "COMMODITY" => Some(Segment::Commodity),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Equity => "EQUITY",
            Segment::Currency => "CURRENCY",
            Segment::Commodity => "COMMODITY",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SubSegment {
    Delivery,
    Intraday,
    Futures,
    Options,
}

impl SubSegment {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "DELIVERY" => Some(SubSegment::Delivery),
            "INTRADAY" => Some(SubSegment::Intraday),
            "FUTURES" => Some(SubSegment::Futures),
            "OPTIONS" => Some(SubSegment::Options),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubSegment::Delivery => "DELIVERY",
            SubSegment::Intraday => "INTRADAY",
            SubSegment::Futures => "FUTURES",
            SubSegment::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for SubSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 1.2: the formula table key. only these eight pairs carry a formula;
// anything else (e.g. currency delivery) charges nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChargeKey {
    EquityDelivery,
    EquityIntraday,
    EquityFutures,
    EquityOptions,
    CurrencyFutures,
    CurrencyOptions,
    CommodityFutures,
    CommodityOptions,
}

impl ChargeKey {
    pub fn resolve(segment: Segment, sub_segment: SubSegment) -> Option<Self> {
        match (segment, sub_segment) {
            (Segment::Equity, SubSegment::Delivery) => Some(ChargeKey::EquityDelivery),
            (Segment::Equity, SubSegment::Intraday) => Some(ChargeKey::EquityIntraday),
            (Segment::Equity, SubSegment::Futures) => Some(ChargeKey::EquityFutures),
            (Segment::Equity, SubSegment::Options) => Some(ChargeKey::EquityOptions),
            (Segment::Currency, SubSegment::Futures) => Some(ChargeKey::CurrencyFutures),
            (Segment::Currency, SubSegment::Options) => Some(ChargeKey::CurrencyOptions),
            (Segment::Commodity, SubSegment::Futures) => Some(ChargeKey::CommodityFutures),
            (Segment::Commodity, SubSegment::Options) => Some(ChargeKey::CommodityOptions),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    Nse,
    Bse,
    Mcx,
    Cds,
    Nfo,
}

/// Exchange operator, used where a transaction rate differs by exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Venue {
    Nse,
    Bse,
    Mcx,
}

impl Exchange {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "NSE" => Some(Exchange::Nse),
            "BSE" => Some(Exchange::Bse),
            "MCX" => Some(Exchange::Mcx),
            "CDS" => Some(Exchange::Cds),
            "NFO" => Some(Exchange::Nfo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Nse => "NSE",
            Exchange::Bse => "BSE",
            Exchange::Mcx => "MCX",
            Exchange::Cds => "CDS",
            Exchange::Nfo => "NFO",
        }
    }

    // NFO and CDS are NSE's derivative segments
    pub fn venue(&self) -> Venue {
        match self {
            Exchange::Nse | Exchange::Nfo | Exchange::Cds => Venue::Nse,
            Exchange::Bse => Venue::Bse,
            Exchange::Mcx => Venue::Mcx,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Process {
    Buy,
    Sell,
}

impl Process {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BUY" | "B" => Some(Process::Buy),
            "SELL" | "S" => Some(Process::Sell),
            _ => None,
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Process::Buy)
    }

    pub fn is_sell(&self) -> bool {
        matches!(self, Process::Sell)
    }
}

// 1.3: wall clock. injected so queue bucketing can be pinned in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
