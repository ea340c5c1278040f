//! The public, wallet-free projection of round state sent to every client
//! on `state_change` and `crashed` events.

use serde::Serialize;

use crate::events::RoundState;

#[derive(Debug, Clone, Serialize)]
pub struct RoundView {
    pub sequence_number: u64,
    pub state: RoundState,
    pub commitments: Vec<String>,
    pub curve_count: u8,
    /// Revealed only once the round reaches CRASHED.
    pub revealed_seeds: Vec<String>,
    pub crash_points: Option<Vec<String>>,
    pub max_bet: String,
    pub betting_paused: bool,
}

impl Default for RoundView {
    fn default() -> Self {
        Self {
            sequence_number: 0,
            state: RoundState::Waiting,
            commitments: Vec::new(),
            curve_count: 1,
            revealed_seeds: Vec::new(),
            crash_points: None,
            max_bet: "0".to_string(),
            betting_paused: true,
        }
    }
}
