//! Wire-stable error taxonomy. Each variant's `Display` is the exact code
//! a client sees in `{success: false, error: <CODE>}`; these strings are
//! part of the protocol and must not drift once published.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ErrorCode {
    #[error("NO_ACTIVE_ROUND")]
    NoActiveRound,
    #[error("BETTING_CLOSED")]
    BettingClosed,
    #[error("GAME_NOT_RUNNING")]
    GameNotRunning,
    #[error("CURVE_ALREADY_CRASHED")]
    CurveAlreadyCrashed,

    #[error("INVALID_SLOT")]
    InvalidSlot,
    #[error("BELOW_MIN")]
    BelowMin,
    #[error("ABOVE_MAX")]
    AboveMax,
    #[error("INVALID_AUTO_TARGET")]
    InvalidAutoTarget,
    #[error("INVALID_VARIANT")]
    InvalidVariant,
    #[error("INVALID_SEED_LENGTH")]
    InvalidSeedLength,

    #[error("DUPLICATE_BET")]
    DuplicateBet,
    #[error("NO_BET")]
    NoBet,
    #[error("ALREADY_SETTLED")]
    AlreadySettled,
    #[error("TOO_LATE")]
    TooLate,

    #[error("RATE_LIMITED")]
    RateLimited,

    #[error("INSUFFICIENT_FUNDS")]
    InsufficientFunds,

    #[error("AUTH_REQUIRED")]
    AuthRequired,
    #[error("ADMIN_REQUIRED")]
    AdminRequired,

    /// Treated as INSUFFICIENT_FUNDS-equivalent to the caller; logged
    /// separately at ERROR by whoever raises it.
    #[error("WALLET_UNAVAILABLE")]
    WalletUnavailable,
}

impl ErrorCode {
    /// The code surfaced to the wire, collapsing `WALLET_UNAVAILABLE` into
    /// its user-facing equivalent.
    pub fn wire_code(self) -> &'static str {
        match self {
            ErrorCode::WalletUnavailable => "INSUFFICIENT_FUNDS",
            other => other.code_str(),
        }
    }

    fn code_str(self) -> &'static str {
        match self {
            ErrorCode::NoActiveRound => "NO_ACTIVE_ROUND",
            ErrorCode::BettingClosed => "BETTING_CLOSED",
            ErrorCode::GameNotRunning => "GAME_NOT_RUNNING",
            ErrorCode::CurveAlreadyCrashed => "CURVE_ALREADY_CRASHED",
            ErrorCode::InvalidSlot => "INVALID_SLOT",
            ErrorCode::BelowMin => "BELOW_MIN",
            ErrorCode::AboveMax => "ABOVE_MAX",
            ErrorCode::InvalidAutoTarget => "INVALID_AUTO_TARGET",
            ErrorCode::InvalidVariant => "INVALID_VARIANT",
            ErrorCode::InvalidSeedLength => "INVALID_SEED_LENGTH",
            ErrorCode::DuplicateBet => "DUPLICATE_BET",
            ErrorCode::NoBet => "NO_BET",
            ErrorCode::AlreadySettled => "ALREADY_SETTLED",
            ErrorCode::TooLate => "TOO_LATE",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::InsufficientFunds => "INSUFFICIENT_FUNDS",
            ErrorCode::AuthRequired => "AUTH_REQUIRED",
            ErrorCode::AdminRequired => "ADMIN_REQUIRED",
            ErrorCode::WalletUnavailable => "WALLET_UNAVAILABLE",
        }
    }
}
