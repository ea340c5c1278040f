//! Wire message shapes (§6.1). Inbound messages are tagged by `type`;
//! outbound messages map 1:1 to bus events plus the request/response
//! shapes for the stateful RNG ops.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Authenticate { token: String },
    PlaceBet { amount: Decimal, #[serde(default)] auto_cashout_at: Option<Decimal>, #[serde(default)] slot: Option<u8> },
    Cashout { #[serde(default)] slot: Option<u8>, #[serde(default)] at_multiplier: Option<Decimal> },
    SetClientSeed { client_seed: String },
    RotateSeed {},
    GetSeedInfo {},
    Verify {
        server_seed: String,
        client_seed: String,
        nonce: u64,
        variant: String,
        #[serde(default)]
        variant_params: Option<serde_json::Value>,
        /// Optional: when present, the recomputed crash point is only
        /// trusted once `SHA-256(serverSeed)` matches this commitment
        /// (the commitment-bound verifier spec.md's Open Question asks
        /// for, §9/DESIGN.md).
        #[serde(default)]
        commitment: Option<String>,
    },
    ChatJoin { room: String },
    ChatSend { room: String, message: String },
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Ok(serde_json::Value),
    Err { success: bool, error: String },
}

impl OutboundMessage {
    pub fn error(code: &str) -> Self {
        OutboundMessage::Err { success: false, error: code.to_string() }
    }

    pub fn ok(value: serde_json::Value) -> Self {
        OutboundMessage::Ok(value)
    }
}

/// `variant` values accepted by the stateless `verify` op: single-curve or
/// the second ("dragon2") curve of a dual-curve round.
pub fn second_curve_from_variant(variant: &str) -> Result<bool, crate::error::ErrorCode> {
    match variant {
        "single" | "curve1" => Ok(false),
        "curve2" | "dragon2" => Ok(true),
        _ => Err(crate::error::ErrorCode::InvalidVariant),
    }
}
