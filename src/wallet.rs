//! Wallet port and the per-user operation guard that serialises wagering
//! operations against it.
//!
//! The guard pattern is carried over from the teacher's
//! `defi_accounting::guard::OperationGuard`: RAII, backed by a set of
//! "currently operating" user ids, with an emergency clear escape hatch for
//! a guard that fails to drop (process crash between acquire and release).
//! The teacher's set is a `thread_local!<RefCell<BTreeSet<Principal>>>`
//! because a canister call runs to completion on one thread; this gateway
//! is multi-threaded async, so the set becomes a `DashSet<String>` guarded
//! for `Send + Sync` access instead.

use dashmap::DashSet;
use rust_decimal::Decimal;
use std::sync::{Arc, OnceLock};

use crate::error::ErrorCode;

static PENDING_OPERATIONS: OnceLock<DashSet<String>> = OnceLock::new();

fn pending_operations() -> &'static DashSet<String> {
    PENDING_OPERATIONS.get_or_init(DashSet::new)
}

/// RAII guard preventing two in-flight wallet operations for the same user
/// from racing each other. Dropped automatically when the bet/cashout call
/// completes, successfully or not.
pub struct OperationGuard {
    user_id: String,
}

impl OperationGuard {
    pub fn acquire(user_id: &str) -> Result<Self, ErrorCode> {
        let ops = pending_operations();
        if !ops.insert(user_id.to_string()) {
            return Err(ErrorCode::RateLimited);
        }
        Ok(Self { user_id: user_id.to_string() })
    }
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        pending_operations().remove(&self.user_id);
    }
}

/// Emergency safety valve mirroring the teacher's `clear_guard_for_principal`:
/// only for operator use when a guard is confirmed stuck (process crash
/// mid-operation), never as a routine unlock.
pub fn clear_guard_for_user(user_id: &str) -> bool {
    pending_operations().remove(user_id).is_some()
}

pub fn has_active_guard(user_id: &str) -> bool {
    pending_operations().contains(user_id)
}

/// The boundary between the engine and whatever holds real user balances.
/// The round actor and cashout coordinator never touch storage directly —
/// everything passes through this port so the in-memory test adapter and a
/// production ledger adapter are interchangeable.
#[async_trait::async_trait]
pub trait WalletPort: Send + Sync {
    async fn balance(&self, user_id: &str) -> Result<Decimal, ErrorCode>;
    async fn debit(&self, user_id: &str, amount: Decimal) -> Result<Decimal, ErrorCode>;
    async fn credit(&self, user_id: &str, amount: Decimal) -> Result<Decimal, ErrorCode>;
    /// Sum of balances currently held across all users, for the solvency
    /// gate and the reconciliation query.
    async fn total_liabilities(&self) -> Result<Decimal, ErrorCode>;
    /// Total reserve backing the house's side of the book. `max_allowed
    /// payout` for a round is this minus `total_liabilities`.
    async fn house_bankroll(&self) -> Result<Decimal, ErrorCode>;
}

pub type SharedWallet = Arc<dyn WalletPort>;

/// Read-only reconciliation check: the house's reserve must still cover
/// every outstanding user balance. Grounded on
/// `dice_backend::defi_accounting::accounting::audit_balances`'s
/// `house + deposits == canister` invariant, adapted to this engine's
/// reserve/liabilities split (there's no single pooled canister balance
/// here, just a configured bankroll and a sum of user balances). Never
/// called from the hot path; for operator/monitoring use only.
pub async fn audit_wallet_conservation(wallet: &dyn WalletPort) -> Result<String, String> {
    let liabilities = wallet.total_liabilities().await.map_err(|e| format!("audit failed reading liabilities: {e}"))?;
    let bankroll = wallet.house_bankroll().await.map_err(|e| format!("audit failed reading bankroll: {e}"))?;

    if bankroll >= liabilities {
        Ok(format!("audit passed: bankroll ({bankroll}) covers liabilities ({liabilities})"))
    } else {
        Err(format!("audit FAILED: bankroll ({bankroll}) is below outstanding liabilities ({liabilities})"))
    }
}

/// In-memory wallet used by tests and local development.
pub struct InMemoryWallet {
    balances: dashmap::DashMap<String, Decimal>,
    bankroll: parking_lot::RwLock<Decimal>,
}

impl InMemoryWallet {
    pub fn new() -> Self {
        Self {
            balances: dashmap::DashMap::new(),
            bankroll: parking_lot::RwLock::new(Decimal::from(1_000_000)),
        }
    }

    pub fn seed(&self, user_id: &str, amount: Decimal) {
        self.balances.insert(user_id.to_string(), amount);
    }

    pub fn set_bankroll(&self, amount: Decimal) {
        *self.bankroll.write() = amount;
    }
}

impl Default for InMemoryWallet {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WalletPort for InMemoryWallet {
    async fn balance(&self, user_id: &str) -> Result<Decimal, ErrorCode> {
        Ok(self.balances.get(user_id).map(|b| *b).unwrap_or(Decimal::ZERO))
    }

    async fn debit(&self, user_id: &str, amount: Decimal) -> Result<Decimal, ErrorCode> {
        let mut entry = self.balances.entry(user_id.to_string()).or_insert(Decimal::ZERO);
        if *entry < amount {
            return Err(ErrorCode::InsufficientFunds);
        }
        *entry -= amount;
        Ok(*entry)
    }

    async fn credit(&self, user_id: &str, amount: Decimal) -> Result<Decimal, ErrorCode> {
        let mut entry = self.balances.entry(user_id.to_string()).or_insert(Decimal::ZERO);
        *entry += amount;
        Ok(*entry)
    }

    async fn total_liabilities(&self) -> Result<Decimal, ErrorCode> {
        Ok(self.balances.iter().map(|e| *e.value()).sum())
    }

    async fn house_bankroll(&self) -> Result<Decimal, ErrorCode> {
        Ok(*self.bankroll.read())
    }
}
