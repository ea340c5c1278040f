//! The `Bet` entity (data model) and the payout/limit math ported from the
//! teacher's `crash_backend::game` helpers (`calculate_payout`,
//! `calculate_max_bet`), generalised from the teacher's integer-cents ckUSDT
//! scale to `Decimal` and from a single rocket slot to the multi-slot bet
//! book one round actually runs.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetStatus {
    Pending,
    CashedOut,
    Busted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub bet_id: Uuid,
    pub user_id: String,
    /// Which curve this bet is riding; always 0 in single-curve mode, 0 or
    /// 1 in dual-curve ("dragon") mode.
    pub slot: u8,
    pub amount: Decimal,
    pub auto_cashout_target: Option<Decimal>,
    pub status: BetStatus,
    pub cashed_out_at: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    /// Set true if a cashout settled the player's fate but the wallet
    /// credit itself failed; see `cashout::CashoutOutcome`.
    pub ledger_diverged: bool,
}

impl Bet {
    pub fn new(user_id: impl Into<String>, slot: u8, amount: Decimal, auto_cashout_target: Option<Decimal>) -> Self {
        Self {
            bet_id: Uuid::new_v4(),
            user_id: user_id.into(),
            slot,
            amount,
            auto_cashout_target,
            status: BetStatus::Pending,
            cashed_out_at: None,
            profit: None,
            placed_at: Utc::now(),
            settled_at: None,
            ledger_diverged: false,
        }
    }
}

/// Payout for a bet cashed out at `multiplier`, using the teacher's scaled
/// multiplication technique but over `Decimal` so there's no precision loss
/// to begin with.
pub fn calculate_payout(bet_amount: Decimal, multiplier: Decimal) -> Decimal {
    bet_amount * multiplier
}

/// Clamp a configured bet ceiling to what the house can safely cover if
/// every seat in the round busts at `max_crash_point` — the crash-shaped
/// analogue of the teacher's `calculate_max_bet`.
pub fn max_bet_from_reserve(max_allowed_payout: Decimal, max_crash_point: Decimal) -> Decimal {
    if max_crash_point <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    max_allowed_payout / max_crash_point
}
