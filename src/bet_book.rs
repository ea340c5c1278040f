//! The live bet book for a single round: every placed bet, keyed so a user
//! can hold at most one open bet per slot (`DUPLICATE_BET`).

use dashmap::DashMap;
use uuid::Uuid;

use crate::bet::{Bet, BetStatus};
use crate::error::ErrorCode;

#[derive(Default)]
pub struct BetBook {
    bets: DashMap<(String, u8), Bet>,
}

impl BetBook {
    pub fn new() -> Self {
        Self { bets: DashMap::new() }
    }

    pub fn place(&self, bet: Bet) -> Result<Uuid, ErrorCode> {
        let key = (bet.user_id.clone(), bet.slot);
        if self.bets.contains_key(&key) {
            return Err(ErrorCode::DuplicateBet);
        }
        let bet_id = bet.bet_id;
        self.bets.insert(key, bet);
        Ok(bet_id)
    }

    pub fn get(&self, user_id: &str, slot: u8) -> Option<Bet> {
        self.bets.get(&(user_id.to_string(), slot)).map(|b| b.clone())
    }

    /// Mark a bet cashed out, returning the updated copy. Fails with
    /// `NO_BET` if the user never placed one on this slot this round, or
    /// `ALREADY_SETTLED` if it's already resolved.
    pub fn settle_cashout(
        &self,
        user_id: &str,
        slot: u8,
        multiplier: rust_decimal::Decimal,
        profit: rust_decimal::Decimal,
        settled_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Bet, ErrorCode> {
        let mut entry = self.bets.get_mut(&(user_id.to_string(), slot)).ok_or(ErrorCode::NoBet)?;
        if entry.status != BetStatus::Pending {
            return Err(ErrorCode::AlreadySettled);
        }
        entry.status = BetStatus::CashedOut;
        entry.cashed_out_at = Some(multiplier);
        entry.profit = Some(profit);
        entry.settled_at = Some(settled_at);
        Ok(entry.clone())
    }

    /// Bust every still-pending bet on a slot once its curve crashes.
    pub fn bust_slot(&self, slot: u8, settled_at: chrono::DateTime<chrono::Utc>) -> Vec<Bet> {
        let mut busted = Vec::new();
        for mut entry in self.bets.iter_mut() {
            if entry.key().1 != slot || entry.status != BetStatus::Pending {
                continue;
            }
            entry.status = BetStatus::Busted;
            entry.profit = Some(-entry.amount);
            entry.settled_at = Some(settled_at);
            busted.push(entry.clone());
        }
        busted
    }

    pub fn pending_on_slot(&self, slot: u8) -> Vec<Bet> {
        self.bets
            .iter()
            .filter(|e| e.key().1 == slot && e.status == BetStatus::Pending)
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn all(&self) -> Vec<Bet> {
        self.bets.iter().map(|e| e.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.bets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bets.is_empty()
    }
}
