//! The round actor: the single serialisation point for all round-internal
//! mutations (§5 CONCURRENCY & RESOURCE MODEL). One `tokio::task` owns an
//! `mpsc::UnboundedReceiver<RoundCommand>` and runs the WAITING → RUNNING →
//! CRASHED loop; nothing else is allowed to touch the bet book, the
//! curves, or the sequence counter.

pub mod curve;
pub mod history;
pub mod view;

use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use uuid::Uuid;

use crate::bet::{self, Bet, BetStatus};
use crate::bet_book::BetBook;
use crate::cashout;
use crate::config::Config;
use crate::error::ErrorCode;
use crate::events::{BalanceReason, Event, EventBus, RoundState};
use crate::money::{amount_to_wire, multiplier_to_wire};
use crate::persistence::{PendingBetUpdate, SettledBet, SharedPersistence};
use crate::rate_limit::RateLimiter;
use crate::rng::seed::RngEngine;
use crate::wallet::SharedWallet;

use curve::Curve;
use history::{History, HistoryEntry};
use view::RoundView;

/// Read-only snapshot of the crash-history ring, kept outside the actor's
/// channel so the gateway can serve it to newly connected sockets without
/// round-tripping a command.
pub type SharedHistory = Arc<parking_lot::RwLock<Vec<HistoryEntry>>>;

pub struct CashoutAck {
    pub multiplier: String,
    pub payout: String,
    pub profit: String,
}

enum RoundCommand {
    PlaceBet {
        user_id: String,
        slot: u8,
        amount: Decimal,
        auto_cashout_target: Option<Decimal>,
        reply: oneshot::Sender<Result<Uuid, ErrorCode>>,
    },
    Cashout {
        user_id: String,
        slot: u8,
        claimed_multiplier: Option<Decimal>,
        reply: oneshot::Sender<Result<CashoutAck, ErrorCode>>,
    },
    GetView {
        reply: oneshot::Sender<RoundView>,
    },
}

/// Cheap, cloneable front door to the round actor. Every wagering
/// operation goes through here and across the actor's channel, so two
/// calls can never race each other inside round-internal state.
#[derive(Clone)]
pub struct RoundHandle {
    tx: mpsc::UnboundedSender<RoundCommand>,
    shared_history: SharedHistory,
}

impl RoundHandle {
    pub async fn place_bet(
        &self,
        user_id: String,
        slot: u8,
        amount: Decimal,
        auto_cashout_target: Option<Decimal>,
    ) -> Result<Uuid, ErrorCode> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoundCommand::PlaceBet { user_id, slot, amount, auto_cashout_target, reply })
            .map_err(|_| ErrorCode::NoActiveRound)?;
        rx.await.map_err(|_| ErrorCode::NoActiveRound)?
    }

    pub async fn cashout(&self, user_id: String, slot: u8, claimed_multiplier: Option<Decimal>) -> Result<CashoutAck, ErrorCode> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RoundCommand::Cashout { user_id, slot, claimed_multiplier, reply })
            .map_err(|_| ErrorCode::NoActiveRound)?;
        rx.await.map_err(|_| ErrorCode::NoActiveRound)?
    }

    pub async fn view(&self) -> Option<RoundView> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(RoundCommand::GetView { reply }).ok()?;
        rx.await.ok()
    }

    pub fn history(&self) -> Vec<HistoryEntry> {
        self.shared_history.read().clone()
    }
}

/// Owns every piece of state a round touches: curves, bet book, history,
/// the rate limiter, and the ports out to the wallet/persistence/event bus.
pub struct RoundActor {
    config: Config,
    rng: Arc<RngEngine>,
    wallet: SharedWallet,
    persistence: SharedPersistence,
    events: Arc<EventBus>,
    rate_limiter: RateLimiter,

    sequence_number: u64,
    state: RoundState,
    curves: Vec<Curve>,
    bet_book: BetBook,
    history: History,
    server_seed: String,
    commitment: String,
    max_bet: Decimal,
    betting_paused: bool,
    phase_started_at: Instant,
    running_started_at: Instant,

    shared_history: SharedHistory,
    rx: mpsc::UnboundedReceiver<RoundCommand>,
}

impl RoundActor {
    pub fn spawn(
        config: Config,
        rng: Arc<RngEngine>,
        wallet: SharedWallet,
        persistence: SharedPersistence,
        events: Arc<EventBus>,
    ) -> RoundHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let rate_limiter = RateLimiter::new(config.bet_cooldown_ms);
        let max_history = config.max_history;
        let shared_history: SharedHistory = Arc::new(parking_lot::RwLock::new(Vec::new()));

        let actor = RoundActor {
            config,
            rng,
            wallet,
            persistence,
            events,
            rate_limiter,
            sequence_number: 0,
            state: RoundState::Waiting,
            curves: Vec::new(),
            bet_book: BetBook::new(),
            history: History::new(max_history),
            server_seed: String::new(),
            commitment: String::new(),
            max_bet: Decimal::ZERO,
            betting_paused: true,
            phase_started_at: Instant::now(),
            running_started_at: Instant::now(),
            shared_history: shared_history.clone(),
            rx,
        };

        tokio::spawn(actor.run());
        RoundHandle { tx, shared_history }
    }

    async fn run(mut self) {
        self.enter_waiting().await;

        loop {
            let deadline = self.next_deadline();
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => {
                    self.on_deadline().await;
                }
                maybe_cmd = self.rx.recv() => {
                    match maybe_cmd {
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            tracing::info!("round actor shutting down: handle dropped");
                            return;
                        }
                    }
                }
            }
        }
    }

    fn next_deadline(&self) -> Instant {
        match self.state {
            RoundState::Waiting => self.phase_started_at + Duration::from_millis(self.config.waiting_ms),
            RoundState::Running => self.running_started_at + self.next_tick_offset(),
            RoundState::Crashed => self.phase_started_at + Duration::from_millis(self.config.crashed_ms),
        }
    }

    fn next_tick_offset(&self) -> Duration {
        let elapsed_ms = self.phase_started_at.elapsed().as_millis() as u64;
        let tick_ms = self.config.tick_ms.max(1);
        let ticks_elapsed = elapsed_ms / tick_ms + 1;
        Duration::from_millis(ticks_elapsed * tick_ms)
    }

    async fn on_deadline(&mut self) {
        match self.state {
            RoundState::Waiting => self.enter_running().await,
            RoundState::Running => self.on_tick().await,
            RoundState::Crashed => self.enter_waiting().await,
        }
    }

    async fn handle_command(&mut self, cmd: RoundCommand) {
        match cmd {
            RoundCommand::PlaceBet { user_id, slot, amount, auto_cashout_target, reply } => {
                let result = self.place_bet(user_id, slot, amount, auto_cashout_target).await;
                let _ = reply.send(result);
            }
            RoundCommand::Cashout { user_id, slot, claimed_multiplier, reply } => {
                let result = self.manual_cashout(user_id, slot, claimed_multiplier).await;
                let _ = reply.send(result);
            }
            RoundCommand::GetView { reply } => {
                let _ = reply.send(self.view());
            }
        }
    }

    // -- phase transitions ------------------------------------------------

    async fn enter_waiting(&mut self) {
        self.sequence_number += 1;
        self.rng.note_round_started();
        self.bet_book = BetBook::new();
        self.server_seed = self.rng.round_server_seed(self.sequence_number);
        self.commitment = self.rng.round_commitment(self.sequence_number);

        let curve_count = self.config.curve_count();
        let crash_points = self.rng.round_crash_points(self.sequence_number, curve_count);
        self.curves = crash_points.into_iter().enumerate().map(|(i, cp)| Curve::new(i as u8, cp)).collect();

        let liabilities = self.wallet.total_liabilities().await.unwrap_or(Decimal::ZERO);
        let bankroll = self.wallet.house_bankroll().await.unwrap_or(Decimal::ZERO);
        let max_allowed_payout = (bankroll - liabilities).max(Decimal::ZERO);
        self.betting_paused = max_allowed_payout <= Decimal::ZERO;
        self.max_bet = bet::max_bet_from_reserve(max_allowed_payout, self.config.max_crash_point).min(self.config.max_bet);

        self.state = RoundState::Waiting;
        self.phase_started_at = Instant::now();

        tracing::info!(sequence_number = self.sequence_number, betting_paused = self.betting_paused, "round entered WAITING");
        self.events.publish(Event::StateChange { state: RoundState::Waiting, round: self.view() });
    }

    async fn enter_running(&mut self) {
        self.state = RoundState::Running;
        self.phase_started_at = Instant::now();
        self.running_started_at = self.phase_started_at;

        tracing::info!(sequence_number = self.sequence_number, "round entered RUNNING");
        self.events.publish(Event::StateChange { state: RoundState::Running, round: self.view() });
    }

    async fn on_tick(&mut self) {
        let elapsed_ms = self.running_started_at.elapsed().as_millis() as u64;

        let mut crashed_flags = Vec::with_capacity(self.curves.len());
        let mut newly_crashed_slots = Vec::new();
        for curve in &mut self.curves {
            let just_crashed = curve.advance(elapsed_ms);
            crashed_flags.push(curve.crashed);
            if just_crashed {
                newly_crashed_slots.push(curve.slot);
            }
        }

        let multipliers: Vec<String> = self.curves.iter().map(|c| multiplier_to_wire(c.current_multiplier)).collect();
        self.events.publish(Event::Tick { multipliers, elapsed_ms, crashed_flags });

        self.run_auto_cashouts().await;

        for slot in newly_crashed_slots {
            self.settle_crashed_slot(slot).await;
        }

        if self.curves.iter().all(|c| c.crashed) {
            self.enter_crashed().await;
        }
    }

    async fn settle_crashed_slot(&mut self, slot: u8) {
        let crash_point = self.curves.iter().find(|c| c.slot == slot).map(|c| c.crash_point).unwrap_or(Decimal::ONE);
        let now = chrono::Utc::now();
        let busted = self.bet_book.bust_slot(slot, now);

        for bet in busted {
            self.persist_settlement(&bet, self.sequence_number).await;
        }

        // curve_crashed is a dual-curve-only event (§4.5): a single-curve
        // round's one slot crashing IS the round crashing, so that case is
        // reported only via `crashed`, not a redundant `curve_crashed`.
        if self.curves.len() > 1 {
            self.events.publish(Event::CurveCrashed { slot: slot + 1, crash_point: multiplier_to_wire(crash_point), sequence_number: self.sequence_number });
        }
    }

    async fn enter_crashed(&mut self) {
        self.state = RoundState::Crashed;
        self.phase_started_at = Instant::now();

        let crash_points: Vec<Decimal> = self.curves.iter().map(|c| c.crash_point).collect();
        self.history.push(self.sequence_number, crash_points.clone());
        *self.shared_history.write() = self.history.recent();

        tracing::info!(sequence_number = self.sequence_number, "round entered CRASHED");
        // §5's ordering guarantee: curve_crashed/crashed precede
        // state_change(CRASHED), not the other way around.
        self.events.publish(Event::Crashed { round: self.view() });
        self.events.publish(Event::StateChange { state: RoundState::Crashed, round: self.view() });
    }

    // -- bet placement ------------------------------------------------

    async fn place_bet(&mut self, user_id: String, slot: u8, amount: Decimal, auto_cashout_target: Option<Decimal>) -> Result<Uuid, ErrorCode> {
        if self.state != RoundState::Waiting {
            return Err(ErrorCode::BettingClosed);
        }
        if self.betting_paused {
            return Err(ErrorCode::BettingClosed);
        }
        let curve_count = self.config.curve_count();
        if slot == 0 || slot > curve_count {
            return Err(ErrorCode::InvalidSlot);
        }
        if self.bet_book.get(&user_id, slot - 1).is_some() {
            return Err(ErrorCode::DuplicateBet);
        }
        if !amount.is_sign_positive() || amount < self.config.min_bet {
            return Err(ErrorCode::BelowMin);
        }
        if amount > self.max_bet {
            return Err(ErrorCode::AboveMax);
        }
        if let Some(target) = auto_cashout_target {
            if target < Decimal::new(101, 2) {
                return Err(ErrorCode::InvalidAutoTarget);
            }
        }
        if !self.rate_limiter.check_and_record(&user_id, slot) {
            return Err(ErrorCode::RateLimited);
        }

        let _guard = crate::wallet::OperationGuard::acquire(&user_id).map_err(|_| ErrorCode::RateLimited)?;
        self.wallet.debit(&user_id, amount).await?;

        let bet = Bet::new(user_id.clone(), slot - 1, amount, auto_cashout_target);
        let bet_id = match self.bet_book.place(bet) {
            Ok(id) => id,
            Err(e) => {
                // Roll back the debit: the call must be side-effect-atomic.
                let _ = self.wallet.credit(&user_id, amount).await;
                return Err(e);
            }
        };

        // Advance the user's own fairness-ledger nonce so rotate_seed/verify
        // later reflect a round this user actually played, independent of
        // what decided this round's own crash point.
        self.rng.record_user_bet(&user_id);

        self.events.publish(Event::BetPlaced { user_id: user_id.clone(), bet_id, amount: amount_to_wire(amount), slot, currency: "default".to_string() });
        self.events.publish(Event::BalanceUpdate { user_id, delta: -amount, reason: BalanceReason::BetPlaced });

        Ok(bet_id)
    }

    // -- cashout ------------------------------------------------

    async fn manual_cashout(&mut self, user_id: String, slot: u8, claimed_multiplier: Option<Decimal>) -> Result<CashoutAck, ErrorCode> {
        if self.state != RoundState::Running {
            return Err(ErrorCode::GameNotRunning);
        }
        let curve_count = self.config.curve_count();
        if slot == 0 || slot > curve_count {
            return Err(ErrorCode::InvalidSlot);
        }
        let curve_idx = slot - 1;
        let curve = self.curves.iter().find(|c| c.slot == curve_idx).ok_or(ErrorCode::InvalidSlot)?;
        if curve.crashed {
            return Err(ErrorCode::CurveAlreadyCrashed);
        }
        let (current, crash_point) = (curve.current_multiplier, curve.crash_point);

        let existing = self.bet_book.get(&user_id, curve_idx).ok_or(ErrorCode::NoBet)?;
        if existing.status != BetStatus::Pending {
            return Err(ErrorCode::AlreadySettled);
        }

        self.settle_cashout(user_id, curve_idx, existing.amount, claimed_multiplier, current, crash_point, true).await
    }

    /// Scans every curve's still-pending bets for an auto-cashout trigger,
    /// including a curve that crashed on *this* tick: `Curve::advance` pins
    /// `current_multiplier` to `crash_point` the instant it crashes, so a
    /// target `<= crash_point` still fires here (settling CASHED_OUT) before
    /// `settle_crashed_slot` busts whatever's left to LOST. A curve that
    /// crashed on an earlier tick has no pending bets left on its slot, so
    /// scanning it again is a no-op, not a second settlement attempt.
    async fn run_auto_cashouts(&mut self) {
        let candidates: Vec<Bet> = self
            .curves
            .iter()
            .flat_map(|c| self.bet_book.pending_on_slot(c.slot))
            .filter(|b| b.auto_cashout_target.is_some())
            .collect();

        for bet in candidates {
            let Some(curve) = self.curves.iter().find(|c| c.slot == bet.slot) else { continue };
            let target = bet.auto_cashout_target.expect("filtered above");
            if !cashout::auto_cashout_should_fire(target, curve.current_multiplier, curve.crash_point) {
                continue;
            }
            let (current, crash_point) = (curve.current_multiplier, curve.crash_point);
            let _ = self.settle_cashout(bet.user_id.clone(), bet.slot, bet.amount, Some(target), current, crash_point, false).await;
        }
    }

    async fn settle_cashout(
        &mut self,
        user_id: String,
        slot: u8,
        amount: Decimal,
        claimed_multiplier: Option<Decimal>,
        current: Decimal,
        crash_point: Decimal,
        manual: bool,
    ) -> Result<CashoutAck, ErrorCode> {
        let decision = cashout::decide_cashout(amount, claimed_multiplier, current, crash_point)?;

        let _guard = crate::wallet::OperationGuard::acquire(&user_id).ok();
        let mut ledger_diverged = false;
        if let Err(err) = self.wallet.credit(&user_id, decision.payout).await {
            tracing::error!(user_id = %user_id, error = ?err, "wallet credit failed on cashout; marking settled anyway");
            ledger_diverged = true;
        }

        let now = chrono::Utc::now();
        let mut bet = self.bet_book.settle_cashout(&user_id, slot, decision.settle_at, decision.profit, now)?;
        bet.ledger_diverged = ledger_diverged;

        self.events.publish(Event::Cashout {
            user_id: user_id.clone(),
            slot: slot + 1,
            multiplier: multiplier_to_wire(decision.settle_at),
            profit: amount_to_wire(decision.profit),
            manual,
        });
        if !ledger_diverged {
            self.events.publish(Event::BalanceUpdate { user_id: user_id.clone(), delta: decision.payout, reason: BalanceReason::Cashout });
        }

        self.persist_settlement(&bet, self.sequence_number).await;

        Ok(CashoutAck {
            multiplier: multiplier_to_wire(decision.settle_at),
            payout: amount_to_wire(decision.payout),
            profit: amount_to_wire(decision.profit),
        })
    }

    async fn persist_settlement(&self, bet: &Bet, sequence_number: u64) {
        let settled = SettledBet {
            bet_id: bet.bet_id,
            user_id: bet.user_id.clone(),
            slot: bet.slot,
            amount: bet.amount,
            status: bet.status,
            cashed_out_at: bet.cashed_out_at,
            profit: bet.profit,
            sequence_number,
            settled_at: bet.settled_at.unwrap_or_else(chrono::Utc::now),
            ledger_diverged: bet.ledger_diverged,
        };
        if let Err(err) = self.persistence.create_settled_bet(settled).await {
            tracing::error!(bet_id = %bet.bet_id, error = %err, "persistence write failed, retryable out of band");
        }
        let _ = self
            .persistence
            .update_pending_bet(bet.bet_id, PendingBetUpdate { status: Some(bet.status), cashed_out_at: bet.cashed_out_at, profit: bet.profit })
            .await;
    }

    fn view(&self) -> RoundView {
        let (crash_points, revealed_seeds) = if self.state == RoundState::Crashed {
            (Some(self.curves.iter().map(|c| multiplier_to_wire(c.crash_point)).collect()), vec![self.server_seed.clone()])
        } else {
            (None, Vec::new())
        };

        RoundView {
            sequence_number: self.sequence_number,
            state: self.state,
            commitments: vec![self.commitment.clone()],
            curve_count: self.config.curve_count(),
            revealed_seeds,
            crash_points,
            max_bet: amount_to_wire(self.max_bet),
            betting_paused: self.betting_paused,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CurveMode;
    use crate::persistence::LoggingPersistence;
    use crate::wallet::InMemoryWallet;
    use rust_decimal_macros::dec;

    fn test_config() -> Config {
        Config {
            waiting_ms: 30,
            crashed_ms: 30,
            tick_ms: 10,
            max_crash_point: dec!(5000.00),
            curve_mode: CurveMode::Single,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn bet_placed_in_waiting_then_round_reaches_crashed() {
        let in_memory = InMemoryWallet::new();
        in_memory.seed("alice", dec!(100));
        let wallet: SharedWallet = Arc::new(in_memory);

        let rng = Arc::new(RngEngine::with_master_seed("test-master", 0.04, dec!(5000.00)));
        let events = Arc::new(EventBus::new(256));
        let persistence: SharedPersistence = Arc::new(LoggingPersistence);

        let handle = RoundActor::spawn(test_config(), rng, wallet, persistence, events);

        tokio::time::sleep(Duration::from_millis(5)).await;
        let result = handle.place_bet("alice".to_string(), 1, dec!(10), None).await;
        assert!(result.is_ok(), "{result:?}");

        tokio::time::sleep(Duration::from_secs(2)).await;
        let view = handle.view().await.expect("actor alive");
        assert!(view.sequence_number >= 1);
    }
}
