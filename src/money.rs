//! Fixed-precision decimal helpers. All money and multiplier arithmetic
//! goes through `rust_decimal::Decimal`; the wire only ever sees decimal
//! strings, never binary floating point.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

/// Round a multiplier down to two decimal places, the precision the crash
/// point and every cashout comparison is defined at.
pub fn floor_to_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Serialize a multiplier as a two-fractional-digit decimal string, e.g.
/// "2.00".
pub fn multiplier_to_wire(value: Decimal) -> String {
    format!("{:.2}", floor_to_cents(value))
}

/// Serialize a monetary amount at full precision.
pub fn amount_to_wire(value: Decimal) -> String {
    value.normalize().to_string()
}
