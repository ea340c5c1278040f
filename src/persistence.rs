//! Persistence port: fire-and-forget settlement records. The durable
//! store's own implementation is out of scope; this module only fixes the
//! contract the round actor and cashout coordinator call against, shaped
//! after the create/update split a bet-settlement repository exposes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::bet::BetStatus;

#[derive(Debug, Clone)]
pub struct SettledBet {
    pub bet_id: Uuid,
    pub user_id: String,
    pub slot: u8,
    pub amount: Decimal,
    pub status: BetStatus,
    pub cashed_out_at: Option<Decimal>,
    pub profit: Option<Decimal>,
    pub sequence_number: u64,
    pub settled_at: DateTime<Utc>,
    pub ledger_diverged: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PendingBetUpdate {
    pub status: Option<BetStatus>,
    pub cashed_out_at: Option<Decimal>,
    pub profit: Option<Decimal>,
}

/// Writes never abort a tick, a cashout, or a round transition: failures
/// are logged by the caller and retried out of band, never surfaced to the
/// player.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    async fn create_settled_bet(&self, bet: SettledBet) -> anyhow::Result<()>;
    async fn update_pending_bet(&self, bet_id: Uuid, fields: PendingBetUpdate) -> anyhow::Result<()>;
}

/// Dev/test adapter: logs at `tracing::debug!` and keeps nothing. Stands in
/// for the durable relational store that's out of scope here.
pub struct LoggingPersistence;

#[async_trait]
impl PersistenceAdapter for LoggingPersistence {
    async fn create_settled_bet(&self, bet: SettledBet) -> anyhow::Result<()> {
        tracing::debug!(bet_id = %bet.bet_id, user_id = %bet.user_id, "settled bet recorded");
        Ok(())
    }

    async fn update_pending_bet(&self, bet_id: Uuid, fields: PendingBetUpdate) -> anyhow::Result<()> {
        tracing::debug!(bet_id = %bet_id, ?fields, "pending bet updated");
        Ok(())
    }
}

pub type SharedPersistence = std::sync::Arc<dyn PersistenceAdapter>;
