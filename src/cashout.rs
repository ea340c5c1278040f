//! Cashout decision logic: the tie-break rules and payout math, kept pure
//! and synchronous so they're trivially unit-testable. The round actor
//! calls these to decide what to do, then performs the wallet/persistence
//! side effects itself.

use rust_decimal::Decimal;

use crate::bet::calculate_payout;
use crate::error::ErrorCode;
use crate::money::floor_to_cents;

pub struct CashoutDecision {
    pub settle_at: Decimal,
    pub payout: Decimal,
    pub profit: Decimal,
}

/// Decide whether a cashout attempt (manual or auto-triggered) settles,
/// and at what multiplier.
///
/// `claimed` is the client's optimistic multiplier for a manual cashout, or
/// the bet's `autoCashoutTarget` for an auto-triggered one. `current` is
/// the slot's live multiplier at evaluation time; `crash_point` is the
/// slot's (possibly not-yet-revealed) crash point.
pub fn decide_cashout(
    amount: Decimal,
    claimed: Option<Decimal>,
    current: Decimal,
    crash_point: Decimal,
) -> Result<CashoutDecision, ErrorCode> {
    let claimed = claimed.unwrap_or(current);

    if claimed > crash_point {
        return Err(ErrorCode::TooLate);
    }

    let settle_at = floor_to_cents(claimed.min(current));
    let payout = calculate_payout(amount, settle_at);
    let profit = payout - amount;

    Ok(CashoutDecision { settle_at, payout, profit })
}

/// Auto-cashout firing condition: `target <= current` AND `target <=
/// crash_point` — a target above the slot's crash point never fires; the
/// bet rides to a LOST settlement instead.
pub fn auto_cashout_should_fire(target: Decimal, current: Decimal, crash_point: Decimal) -> bool {
    target <= current && target <= crash_point
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn manual_cashout_settles_at_min_of_claimed_and_current() {
        let decision = decide_cashout(dec!(100), Some(dec!(2.00)), dec!(2.30), dec!(5.00)).unwrap();
        assert_eq!(decision.settle_at, dec!(2.00));
        assert_eq!(decision.payout, dec!(200));
        assert_eq!(decision.profit, dec!(100));
    }

    #[test]
    fn claimed_above_crash_point_is_too_late() {
        let result = decide_cashout(dec!(100), Some(dec!(6.00)), dec!(2.30), dec!(5.00));
        assert_eq!(result.unwrap_err(), ErrorCode::TooLate);
    }

    #[test]
    fn claimed_exactly_equal_to_crash_point_settles_inclusively() {
        let decision = decide_cashout(dec!(100), Some(dec!(5.00)), dec!(5.00), dec!(5.00)).unwrap();
        assert_eq!(decision.settle_at, dec!(5.00));
    }

    #[test]
    fn omitted_claimed_uses_current_multiplier() {
        let decision = decide_cashout(dec!(100), None, dec!(2.30), dec!(5.00)).unwrap();
        assert_eq!(decision.settle_at, dec!(2.30));
    }

    #[test]
    fn auto_cashout_fires_only_below_crash_point() {
        assert!(auto_cashout_should_fire(dec!(2.00), dec!(2.30), dec!(5.00)));
        assert!(!auto_cashout_should_fire(dec!(6.00), dec!(6.10), dec!(5.00)));
    }
}
