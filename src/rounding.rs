//! Rounding contract for charge arithmetic.
//!
//! Intermediate products are floored to 10 decimal places before they feed any
//! later sum. Only the aggregation step rounds up, to 2 decimal places.

use rust_decimal::{Decimal, RoundingStrategy};

pub const INTERMEDIATE_DP: u32 = 10;
pub const CURRENCY_DP: u32 = 2;

pub fn floor_intermediate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(INTERMEDIATE_DP, RoundingStrategy::ToNegativeInfinity)
}

/// A product too large for `Decimal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{lhs} x {rhs} overflows")]
pub struct ArithmeticOverflow {
    pub lhs: Decimal,
    pub rhs: Decimal,
}

/// `a * b`, floored to the intermediate precision.
pub fn floored_product(a: Decimal, b: Decimal) -> Result<Decimal, ArithmeticOverflow> {
    a.checked_mul(b)
        .map(floor_intermediate)
        .ok_or(ArithmeticOverflow { lhs: a, rhs: b })
}

pub fn ceil_to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DP, RoundingStrategy::ToPositiveInfinity)
}

// stamp duty is rounded up to paise, then the paise are dropped
pub fn stamp_whole_units(value: Decimal) -> Decimal {
    ceil_to_cents(value).floor()
}
