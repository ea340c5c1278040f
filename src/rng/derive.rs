//! HMAC-based crash-point derivation. Byte-identical across
//! implementations: this module is pure, deterministic and carries no
//! state of its own — the RNG's statefulness (seed storage/rotation)
//! lives in `rng::seed`.

use hmac::{Hmac, Mac};
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Suffix appended to the HMAC message for the dual-curve variant's second
/// curve, guaranteeing independence between curves under the HMAC security
/// assumption.
pub const DRAGON2_TAG: &str = ":dragon2";

/// 2^52, the domain of the 52-bit integer extracted from the digest.
const TWO_POW_52: f64 = 4_503_599_627_370_496.0;

/// Compute `SHA-256(serverSeed)` as a lowercase hex commitment.
pub fn commitment_of(server_seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(server_seed.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a revealed seed against a previously published commitment.
pub fn commitment_matches(server_seed: &str, commitment: &str) -> bool {
    commitment_of(server_seed).eq_ignore_ascii_case(commitment)
}

/// Build the HMAC message: `clientSeed ":" nonce [":dragon2"]`.
fn build_message(client_seed: &str, nonce: u64, second_curve: bool) -> String {
    if second_curve {
        format!("{client_seed}:{nonce}{DRAGON2_TAG}")
    } else {
        format!("{client_seed}:{nonce}")
    }
}

/// Extract the first 52 bits (13 hex chars) of the digest as an unsigned
/// integer, then normalise to a uniform real in `[0, 1)`.
fn uniform_from_digest(digest: &[u8]) -> f64 {
    let hex_digest = hex::encode(digest);
    let first_13 = &hex_digest[0..13];
    let h = u64::from_str_radix(first_13, 16).expect("13 hex chars fit in u64");
    h as f64 / TWO_POW_52
}

/// Compute the crash point for one curve from `(serverSeed, clientSeed,
/// nonce)` under the given house edge. Pure, deterministic function.
pub fn generate_crash_point(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    house_edge: f64,
    second_curve: bool,
    max_crash_point: Decimal,
) -> Decimal {
    let message = build_message(client_seed, nonce, second_curve);

    let mut mac = HmacSha256::new_from_slice(server_seed.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message.as_bytes());
    let digest = mac.finalize().into_bytes();

    let r = uniform_from_digest(&digest);
    let raw = (1.0 - house_edge) / (1.0 - r);

    // floor(raw * 100) / 100, computed in f64 then lifted into Decimal so
    // the result is exactly representable at two decimal places.
    let floored_cents = (raw * 100.0).floor();
    let crash_point = Decimal::from_f64(floored_cents / 100.0).unwrap_or(Decimal::ONE);

    crash_point.max(Decimal::ONE).min(max_crash_point)
}
