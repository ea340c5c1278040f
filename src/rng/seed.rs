//! Seed storage, rotation and round-seed derivation. Two independent seed
//! timelines are tracked here, matching the resolution recorded in
//! `DESIGN.md`:
//!
//! - the **round** timeline: one server seed per round, derived
//!   deterministically from the process master seed and the round's
//!   `sequenceNumber`, so the full round history replays from
//!   `(masterSeed, sequenceNumber)` alone.
//! - the **per-user fairness ledger**: an independent HMAC seed/nonce pair
//!   per user, rotatable on demand, that lets a user audit that the engine
//!   isn't treating them specially — entirely separate from what decides
//!   a round's outcome.

use dashmap::DashMap;
use parking_lot::RwLock;
use rand::RngCore;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::ErrorCode;
use crate::rng::derive::{commitment_of, generate_crash_point};

const MAX_PROOF_HISTORY: usize = 64;

/// Rotation-reminder thresholds for the process master seed, mirroring
/// `dice_backend::seed`'s `SEED_ROTATION_INTERVAL_NS` / `MAX_GAMES_PER_SEED`.
/// Purely observability: the master seed is never rotated automatically,
/// since every past round's replayability depends on `(masterSeed,
/// sequenceNumber)` staying fixed — this only logs a reminder for an
/// operator to restart the process with a fresh one.
const SEED_ROTATION_REMINDER_ROUNDS: u64 = 10_000;
const SEED_ROTATION_REMINDER_AGE: Duration = Duration::from_secs(300);

fn random_hex_seed() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// One user's independent fairness-ledger seed state.
struct UserSeedState {
    server_seed: String,
    client_seed: String,
    nonce: u64,
    /// Bounded history of `(nonce, crash_point)` proofs computed against
    /// this user's own seed/nonce pair, for later `verify` replay.
    proofs: VecDeque<(u64, Decimal)>,
}

impl UserSeedState {
    fn fresh(default_client_seed: &str) -> Self {
        Self {
            server_seed: random_hex_seed(),
            client_seed: default_client_seed.to_string(),
            nonce: 0,
            proofs: VecDeque::new(),
        }
    }
}

pub struct RotatedSeed {
    pub previous_seed: String,
    pub previous_commitment: String,
    pub previous_nonce: u64,
    pub new_commitment: String,
}

pub struct SeedInfo {
    pub commitment: String,
    pub nonce: u64,
}

/// Owns the process master seed, derives per-round server seeds, and runs
/// the per-user fairness ledger described above.
pub struct RngEngine {
    master_seed: String,
    default_client_seed: RwLock<String>,
    house_edge: f64,
    max_crash_point: Decimal,
    user_seeds: DashMap<String, UserSeedState>,
    booted_at: Instant,
    rounds_served: AtomicU64,
    rotation_reminder_logged: std::sync::atomic::AtomicBool,
}

impl RngEngine {
    pub fn new(house_edge: f64, max_crash_point: Decimal) -> Self {
        Self {
            master_seed: random_hex_seed(),
            default_client_seed: RwLock::new("crash-engine-default".to_string()),
            house_edge,
            max_crash_point,
            user_seeds: DashMap::new(),
            booted_at: Instant::now(),
            rounds_served: AtomicU64::new(0),
            rotation_reminder_logged: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Builds an engine around an explicit master seed rather than one drawn
    /// from the OS RNG. Used by tests that need deterministic crash points,
    /// and legitimately by replay/verification tooling that already knows a
    /// retired round's master seed and wants to recompute its curve.
    pub fn with_master_seed(master_seed: impl Into<String>, house_edge: f64, max_crash_point: Decimal) -> Self {
        Self {
            master_seed: master_seed.into(),
            default_client_seed: RwLock::new("crash-engine-default".to_string()),
            house_edge,
            max_crash_point,
            user_seeds: DashMap::new(),
            booted_at: Instant::now(),
            rounds_served: AtomicU64::new(0),
            rotation_reminder_logged: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Called once per round entering WAITING. Logs a one-time reminder once
    /// the master seed has served enough rounds or aged past the rotation
    /// threshold; never rotates anything itself.
    pub fn note_round_started(&self) {
        let served = self.rounds_served.fetch_add(1, Ordering::Relaxed) + 1;
        let aged_out = self.booted_at.elapsed() >= SEED_ROTATION_REMINDER_AGE;
        let round_out = served >= SEED_ROTATION_REMINDER_ROUNDS;
        if (aged_out || round_out) && !self.rotation_reminder_logged.swap(true, Ordering::Relaxed) {
            tracing::warn!(
                rounds_served = served,
                age_secs = self.booted_at.elapsed().as_secs(),
                "master seed has served many rounds; consider restarting with a fresh one"
            );
        }
    }

    /// Derive the round's server seed deterministically from the master
    /// seed and sequence number: `HMAC(masterSeed, "round:" + sequence)`.
    pub fn round_server_seed(&self, sequence_number: u64) -> String {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;
        type HmacSha256 = Hmac<Sha256>;

        let mut mac = HmacSha256::new_from_slice(self.master_seed.as_bytes()).expect("HMAC accepts any key length");
        mac.update(format!("round:{sequence_number}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    pub fn round_commitment(&self, sequence_number: u64) -> String {
        commitment_of(&self.round_server_seed(sequence_number))
    }

    /// Crash point(s) for a round: curve 0 uses the plain message, curve 1
    /// (dual mode only) appends the `:dragon2` tag. Nonce is the round's
    /// own sequence number, so the formula is reproducible from
    /// `(serverSeed, defaultClientSeed, sequenceNumber)` alone.
    pub fn round_crash_points(&self, sequence_number: u64, curve_count: u8) -> Vec<Decimal> {
        let server_seed = self.round_server_seed(sequence_number);
        let client_seed = self.default_client_seed.read().clone();

        (0..curve_count)
            .map(|curve_idx| {
                generate_crash_point(
                    &server_seed,
                    &client_seed,
                    sequence_number,
                    self.house_edge,
                    curve_idx == 1,
                    self.max_crash_point,
                )
            })
            .collect()
    }

    /// Stateless re-computation used by the `verify` wire op.
    pub fn verify(
        &self,
        server_seed: &str,
        client_seed: &str,
        nonce: u64,
        second_curve: bool,
    ) -> Decimal {
        generate_crash_point(server_seed, client_seed, nonce, self.house_edge, second_curve, self.max_crash_point)
    }

    /// Commitment-bound verifier: asserts `SHA-256(serverSeed) == commitment`
    /// before trusting the recomputed crash point.
    pub fn verify_against_commitment(
        &self,
        commitment: &str,
        server_seed: &str,
        client_seed: &str,
        nonce: u64,
        second_curve: bool,
    ) -> Result<Decimal, ErrorCode> {
        if !crate::rng::derive::commitment_matches(server_seed, commitment) {
            return Err(ErrorCode::InvalidVariant);
        }
        Ok(self.verify(server_seed, client_seed, nonce, second_curve))
    }

    /// Record a bet against a user's personal fairness ledger, advancing
    /// their nonce and storing the resulting proof for later replay.
    pub fn record_user_bet(&self, user_id: &str) -> (u64, Decimal) {
        let default_client_seed = self.default_client_seed.read().clone();
        let mut entry = self
            .user_seeds
            .entry(user_id.to_string())
            .or_insert_with(|| UserSeedState::fresh(&default_client_seed));

        let nonce = entry.nonce;
        let proof = generate_crash_point(
            &entry.server_seed,
            &entry.client_seed,
            nonce,
            self.house_edge,
            false,
            self.max_crash_point,
        );
        entry.proofs.push_back((nonce, proof));
        if entry.proofs.len() > MAX_PROOF_HISTORY {
            entry.proofs.pop_front();
        }
        entry.nonce += 1;

        (nonce, proof)
    }

    pub fn set_client_seed(&self, user_id: &str, client_seed: String) -> Result<(), ErrorCode> {
        if client_seed.is_empty() || client_seed.len() > 64 {
            return Err(ErrorCode::InvalidSeedLength);
        }
        let default_client_seed = self.default_client_seed.read().clone();
        let mut entry = self
            .user_seeds
            .entry(user_id.to_string())
            .or_insert_with(|| UserSeedState::fresh(&default_client_seed));
        entry.client_seed = client_seed;
        Ok(())
    }

    pub fn seed_info(&self, user_id: &str) -> SeedInfo {
        let default_client_seed = self.default_client_seed.read().clone();
        let entry = self
            .user_seeds
            .entry(user_id.to_string())
            .or_insert_with(|| UserSeedState::fresh(&default_client_seed));
        SeedInfo {
            commitment: commitment_of(&entry.server_seed),
            nonce: entry.nonce,
        }
    }

    /// Reveal the user's current seed, generate a fresh one, and reset
    /// their nonce to zero.
    pub fn rotate_user_seed(&self, user_id: &str) -> RotatedSeed {
        let default_client_seed = self.default_client_seed.read().clone();
        let mut entry = self
            .user_seeds
            .entry(user_id.to_string())
            .or_insert_with(|| UserSeedState::fresh(&default_client_seed));

        let previous_seed = entry.server_seed.clone();
        let previous_commitment = commitment_of(&previous_seed);
        let previous_nonce = entry.nonce;

        entry.server_seed = random_hex_seed();
        entry.nonce = 0;
        entry.proofs.clear();
        let new_commitment = commitment_of(&entry.server_seed);

        RotatedSeed {
            previous_seed,
            previous_commitment,
            previous_nonce,
            new_commitment,
        }
    }

    /// Replay a user's previously recorded proof at a given nonce, used by
    /// tests and the reconciliation tooling to confirm the round-trip
    /// property holds after a rotation.
    #[cfg(test)]
    pub fn user_proof_at(&self, user_id: &str, nonce: u64) -> Option<Decimal> {
        self.user_seeds
            .get(user_id)
            .and_then(|entry| entry.proofs.iter().find(|(n, _)| *n == nonce).map(|(_, p)| *p))
    }
}
