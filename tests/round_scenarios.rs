//! Full-round integration scenarios: these drive a real `RoundActor` end to
//! end rather than exercising its pure helpers in isolation. Curves run on
//! wall-clock time (per `round::curve`), so every scenario here caps
//! `max_crash_point` tightly enough that a round crashes in well under a
//! second regardless of which crash point the seed happens to produce.

use std::sync::Arc;
use std::time::Duration;

use rust_decimal_macros::dec;
use tokio::time::sleep;

use crash_engine::config::{Config, CurveMode};
use crash_engine::error::ErrorCode;
use crash_engine::events::{Event, EventBus, RoundState};
use crash_engine::persistence::{LoggingPersistence, SharedPersistence};
use crash_engine::rng::seed::RngEngine;
use crash_engine::rng::commitment_matches;
use crash_engine::round::RoundActor;
use crash_engine::wallet::{InMemoryWallet, SharedWallet, WalletPort};

fn fast_config() -> Config {
    Config {
        waiting_ms: 40,
        crashed_ms: 2_000,
        tick_ms: 20,
        max_crash_point: dec!(1.10),
        curve_mode: CurveMode::Single,
        ..Config::default()
    }
}

async fn poll_until_state(handle: &crash_engine::round::RoundHandle, want: RoundState, timeout: Duration) -> crash_engine::round::view::RoundView {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(view) = handle.view().await {
            if view.state == want {
                return view;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for round state {want:?}");
        }
        sleep(Duration::from_millis(5)).await;
    }
}

fn spawn_round(config: Config, master_seed: &str) -> (crash_engine::round::RoundHandle, Arc<InMemoryWallet>, Arc<EventBus>) {
    let wallet = Arc::new(InMemoryWallet::new());
    let rng = Arc::new(RngEngine::with_master_seed(master_seed, config.house_edge, config.max_crash_point));
    let events = Arc::new(EventBus::new(256));
    let persistence: SharedPersistence = Arc::new(LoggingPersistence);
    let wallet_port: SharedWallet = wallet.clone();
    let handle = RoundActor::spawn(config, rng, wallet_port, persistence, events.clone());
    (handle, wallet, events)
}

#[tokio::test]
async fn round_reaches_crashed_and_reveals_seed_matching_its_commitment() {
    let (handle, _wallet, _events) = spawn_round(fast_config(), "reveal-master");

    let waiting_view = poll_until_state(&handle, RoundState::Waiting, Duration::from_millis(200)).await;
    assert_eq!(waiting_view.commitments.len(), 1);
    assert!(waiting_view.revealed_seeds.is_empty(), "seed must not be revealed before the round crashes");

    let crashed_view = poll_until_state(&handle, RoundState::Crashed, Duration::from_secs(3)).await;
    assert_eq!(crashed_view.revealed_seeds.len(), 1);
    assert!(
        commitment_matches(&crashed_view.revealed_seeds[0], &waiting_view.commitments[0]),
        "revealed seed must hash back to the commitment published during WAITING"
    );
    let crash_points = crashed_view.crash_points.expect("crash points published once CRASHED");
    assert_eq!(crash_points.len(), 1);
}

#[tokio::test]
async fn dual_curve_round_runs_two_independent_curves_under_one_commitment() {
    let config = Config { curve_mode: CurveMode::Dual, ..fast_config() };
    let (handle, _wallet, _events) = spawn_round(config, "dual-master");

    let crashed_view = poll_until_state(&handle, RoundState::Crashed, Duration::from_secs(3)).await;
    assert_eq!(crashed_view.curve_count, 2);
    // One server seed covers both curves; the dragon2 tag is what keeps the
    // second curve's outcome independent, not a second commitment.
    assert_eq!(crashed_view.commitments.len(), 1);
    let crash_points = crashed_view.crash_points.expect("crash points published once CRASHED");
    assert_eq!(crash_points.len(), 2);
}

#[tokio::test]
async fn bet_is_accepted_in_waiting_then_rejected_once_betting_closes() {
    let config = Config { waiting_ms: 300, ..fast_config() };
    let (handle, wallet, _events) = spawn_round(config, "closes-master");
    wallet.seed("alice", dec!(100));

    poll_until_state(&handle, RoundState::Waiting, Duration::from_millis(200)).await;
    let placed = handle.place_bet("alice".to_string(), 1, dec!(10), None).await;
    assert!(placed.is_ok(), "{placed:?}");

    poll_until_state(&handle, RoundState::Running, Duration::from_millis(600)).await;
    let rejected = handle.place_bet("alice".to_string(), 1, dec!(10), None).await;
    assert_eq!(rejected.unwrap_err(), ErrorCode::BettingClosed);
}

#[tokio::test]
async fn duplicate_bet_on_the_same_slot_is_rejected() {
    let config = Config { waiting_ms: 300, ..fast_config() };
    let (handle, wallet, _events) = spawn_round(config, "dup-master");
    wallet.seed("bob", dec!(100));

    poll_until_state(&handle, RoundState::Waiting, Duration::from_millis(200)).await;
    assert!(handle.place_bet("bob".to_string(), 1, dec!(5), None).await.is_ok());
    let second = handle.place_bet("bob".to_string(), 1, dec!(5), None).await;
    assert_eq!(second.unwrap_err(), ErrorCode::DuplicateBet);
}

#[tokio::test]
async fn bet_below_minimum_and_above_maximum_are_rejected() {
    let config = Config { waiting_ms: 300, min_bet: dec!(1.00), max_bet: dec!(50), ..fast_config() };
    let (handle, wallet, _events) = spawn_round(config, "limits-master");
    wallet.seed("carol", dec!(1000));

    poll_until_state(&handle, RoundState::Waiting, Duration::from_millis(200)).await;
    let too_small = handle.place_bet("carol".to_string(), 1, dec!(0.50), None).await;
    assert_eq!(too_small.unwrap_err(), ErrorCode::BelowMin);

    let too_large = handle.place_bet("carol".to_string(), 1, dec!(500), None).await;
    assert_eq!(too_large.unwrap_err(), ErrorCode::AboveMax);
}

#[tokio::test]
async fn bet_larger_than_wallet_balance_fails_insufficient_funds() {
    let config = Config { waiting_ms: 300, ..fast_config() };
    let (handle, wallet, _events) = spawn_round(config, "poor-master");
    wallet.seed("dana", dec!(5));

    poll_until_state(&handle, RoundState::Waiting, Duration::from_millis(200)).await;
    let result = handle.place_bet("dana".to_string(), 1, dec!(10), None).await;
    assert_eq!(result.unwrap_err(), ErrorCode::InsufficientFunds);
}

#[tokio::test]
async fn rate_limit_rejects_a_second_bet_on_the_same_slot_within_the_cooldown() {
    let config = Config {
        waiting_ms: 500,
        bet_cooldown_ms: 5_000,
        ..fast_config()
    };
    let (handle, wallet, _events) = spawn_round(config, "cooldown-master");
    wallet.seed("erin", dec!(100));

    poll_until_state(&handle, RoundState::Waiting, Duration::from_millis(200)).await;
    // A failed attempt still stamps the cooldown, so a below-minimum bet on
    // slot 1 is enough to arm the rate limit without placing a real bet —
    // the retry on the same slot then hits RATE_LIMITED rather than
    // DUPLICATE_BET.
    let first = handle.place_bet("erin".to_string(), 1, dec!(0.01), None).await;
    assert_eq!(first.unwrap_err(), ErrorCode::BelowMin);
    let second = handle.place_bet("erin".to_string(), 1, dec!(5), None).await;
    assert_eq!(second.unwrap_err(), ErrorCode::RateLimited);
}

#[tokio::test]
async fn rate_limit_cooldown_is_independent_per_slot() {
    let config = Config {
        waiting_ms: 500,
        curve_mode: CurveMode::Dual,
        bet_cooldown_ms: 5_000,
        ..fast_config()
    };
    let (handle, wallet, _events) = spawn_round(config, "cooldown-dual-master");
    wallet.seed("erin", dec!(100));

    poll_until_state(&handle, RoundState::Waiting, Duration::from_millis(200)).await;
    let first = handle.place_bet("erin".to_string(), 1, dec!(5), None).await;
    assert!(first.is_ok(), "{first:?}");
    // A different slot has its own cooldown, so this must succeed even
    // though it lands within the window of the slot-1 attempt above.
    let second = handle.place_bet("erin".to_string(), 2, dec!(5), None).await;
    assert!(second.is_ok(), "{second:?}");
}

#[tokio::test]
async fn manual_cashout_before_the_curve_crashes_pays_out_and_credits_the_wallet() {
    let config = Config { waiting_ms: 60, tick_ms: 250, max_crash_point: dec!(3.00), ..fast_config() };
    let (handle, wallet, _events) = spawn_round(config, "cashout-master");
    wallet.seed("frank", dec!(100));

    poll_until_state(&handle, RoundState::Waiting, Duration::from_millis(200)).await;
    handle.place_bet("frank".to_string(), 1, dec!(20), None).await.expect("bet accepted");

    poll_until_state(&handle, RoundState::Running, Duration::from_millis(300)).await;
    // Cashing out with no claimed multiplier settles at the slot's current
    // multiplier, which is always <= its crash point, so this never races
    // TOO_LATE; the only way it can fail here is CURVE_ALREADY_CRASHED.
    let ack = handle.cashout("frank".to_string(), 1, None).await.expect("cashout settles before the curve crashes");

    let payout: rust_decimal::Decimal = ack.payout.parse().unwrap();
    assert!(payout >= dec!(20), "payout {payout} should be at least the stake at >= 1.00x");
    let balance = wallet.balance("frank").await.unwrap();
    assert_eq!(balance, dec!(80) + payout, "wallet must reflect the debit on bet placement plus the cashout credit");
}

#[tokio::test]
async fn cashing_out_a_slot_with_no_bet_fails() {
    let config = Config { waiting_ms: 40, tick_ms: 250, max_crash_point: dec!(3.00), ..fast_config() };
    let (handle, _wallet, _events) = spawn_round(config, "nobet-master");

    poll_until_state(&handle, RoundState::Running, Duration::from_millis(300)).await;
    let result = handle.cashout("ghost".to_string(), 1, None).await;
    assert_eq!(result.unwrap_err(), ErrorCode::NoBet);
}

#[tokio::test]
async fn event_bus_publishes_state_changes_and_a_final_crashed_event() {
    let (handle, _wallet, events) = spawn_round(fast_config(), "events-master");
    let mut rx = events.subscribe();

    poll_until_state(&handle, RoundState::Crashed, Duration::from_secs(3)).await;

    let mut saw_waiting = false;
    let mut saw_running = false;
    let mut saw_crashed_event = false;
    while let Ok(event) = rx.try_recv() {
        match event {
            Event::StateChange { state: RoundState::Waiting, .. } => saw_waiting = true,
            Event::StateChange { state: RoundState::Running, .. } => saw_running = true,
            Event::Crashed { .. } => saw_crashed_event = true,
            _ => {}
        }
    }
    assert!(saw_waiting && saw_running && saw_crashed_event, "expected to observe the full WAITING -> RUNNING -> CRASHED event sequence");
}

#[tokio::test]
async fn verify_reproduces_the_round_crash_point_and_rejects_a_mismatched_commitment() {
    let rng = RngEngine::with_master_seed("verify-master", 0.04, dec!(5000.00));
    let sequence_number = 9;
    let server_seed = rng.round_server_seed(sequence_number);
    let commitment = rng.round_commitment(sequence_number);
    let points = rng.round_crash_points(sequence_number, 1);

    let recomputed = rng.verify(&server_seed, "crash-engine-default", sequence_number, false);
    assert_eq!(points[0], recomputed);

    let bound = rng
        .verify_against_commitment(&commitment, &server_seed, "crash-engine-default", sequence_number, false)
        .expect("commitment matches the revealed seed");
    assert_eq!(bound, recomputed);

    let rejected = rng.verify_against_commitment("0000deadbeef", &server_seed, "crash-engine-default", sequence_number, false);
    assert!(rejected.is_err());
}
