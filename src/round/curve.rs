//! Multiplier-over-time math for a single running curve: `M(t) = exp(k·t)`
//! with `t` in milliseconds since RUNNING start and `k ≈ 6e-5`, calibrated
//! so `M(10s) ≈ 1.82` and `M(11.5s) ≈ 2.0`.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;

pub const GROWTH_RATE_K: f64 = 6e-5;

/// One independent crash curve within a round (slot 1 or 2 in dual mode).
#[derive(Debug, Clone)]
pub struct Curve {
    pub slot: u8,
    pub crash_point: Decimal,
    pub current_multiplier: Decimal,
    pub crashed: bool,
}

impl Curve {
    pub fn new(slot: u8, crash_point: Decimal) -> Self {
        Self {
            slot,
            crash_point,
            current_multiplier: Decimal::ONE,
            crashed: false,
        }
    }

    /// Exact exponential value at `elapsed_ms`, never below 1.00.
    pub fn multiplier_at(elapsed_ms: u64) -> Decimal {
        let value = (GROWTH_RATE_K * elapsed_ms as f64).exp();
        Decimal::from_f64(value).unwrap_or(Decimal::ONE).max(Decimal::ONE)
    }

    /// Advance this curve to `elapsed_ms`. Returns true if this tick is the
    /// one that crashes the curve (current_multiplier >= crash_point at
    /// two-decimal precision).
    pub fn advance(&mut self, elapsed_ms: u64) -> bool {
        if self.crashed {
            return false;
        }
        let raw = Self::multiplier_at(elapsed_ms);
        self.current_multiplier = crate::money::floor_to_cents(raw).max(Decimal::ONE);
        if self.current_multiplier >= self.crash_point {
            self.current_multiplier = self.crash_point;
            self.crashed = true;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn multiplier_matches_calibration_points() {
        let m10 = Curve::multiplier_at(10_000);
        assert!((m10 - dec!(1.82)).abs() < dec!(0.05), "M(10s) = {m10}");

        let m11_5 = Curve::multiplier_at(11_500);
        assert!((m11_5 - dec!(2.00)).abs() < dec!(0.05), "M(11.5s) = {m11_5}");
    }

    #[test]
    fn advance_crashes_exactly_at_crash_point() {
        let mut curve = Curve::new(1, dec!(1.00));
        let crashed_now = curve.advance(0);
        assert!(crashed_now);
        assert!(curve.crashed);
        assert_eq!(curve.current_multiplier, dec!(1.00));
    }

    #[test]
    fn advance_after_crash_is_a_no_op() {
        let mut curve = Curve::new(1, dec!(1.00));
        curve.advance(0);
        let crashed_again = curve.advance(100);
        assert!(!crashed_again);
        assert_eq!(curve.current_multiplier, dec!(1.00));
    }

    #[test]
    fn is_monotone_non_decreasing() {
        let mut curve = Curve::new(1, dec!(5000.00));
        let mut prev = curve.current_multiplier;
        for ms in (0..20_000).step_by(100) {
            curve.advance(ms);
            assert!(curve.current_multiplier >= prev);
            prev = curve.current_multiplier;
        }
    }
}
