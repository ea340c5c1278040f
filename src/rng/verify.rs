//! Request/response shapes for the `verify` and `verify_against_commitment`
//! wire operations. The actual math lives in `rng::derive` and
//! `rng::seed::RngEngine`; this module just gives the gateway typed,
//! serde-friendly structs to decode into and encode back out.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::rng::seed::RngEngine;

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub server_seed: String,
    pub client_seed: String,
    pub nonce: u64,
    #[serde(default)]
    pub second_curve: bool,
    /// If present, the recomputed crash point is only trusted when
    /// `SHA-256(serverSeed)` matches this commitment.
    #[serde(default)]
    pub commitment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub crash_point: String,
}

pub fn handle_verify(engine: &RngEngine, request: VerifyRequest) -> Result<VerifyResponse, ErrorCode> {
    let crash_point: Decimal = match request.commitment {
        Some(commitment) => engine.verify_against_commitment(
            &commitment,
            &request.server_seed,
            &request.client_seed,
            request.nonce,
            request.second_curve,
        )?,
        None => engine.verify(&request.server_seed, &request.client_seed, request.nonce, request.second_curve),
    };

    Ok(VerifyResponse {
        crash_point: crate::money::multiplier_to_wire(crash_point),
    })
}
