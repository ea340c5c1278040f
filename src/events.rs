//! The event bus: a typed `Event` enum fanned out to every connection, plus
//! a private lane for balance updates that only the owning user's socket(s)
//! should see. Grounded on the teacher's broadcast-to-many shape but built
//! on `tokio::sync::broadcast`, the channel the socket-serving repos in the
//! retrieval pack use for exactly this kind of one-to-many fan-out.

use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::round::view::RoundView;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BalanceReason {
    BetPlaced,
    Cashout,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    StateChange { state: RoundState, round: RoundView },
    Tick { multipliers: Vec<String>, elapsed_ms: u64, crashed_flags: Vec<bool> },
    BetPlaced { user_id: String, bet_id: Uuid, amount: String, slot: u8, currency: String },
    Cashout { user_id: String, slot: u8, multiplier: String, profit: String, manual: bool },
    CurveCrashed { slot: u8, crash_point: String, sequence_number: u64 },
    Crashed { round: RoundView },
    /// Out of core-correctness scope, but reuses this same fan-out path.
    Chat { room: String, user_id: String, message: String },
    /// Private: delivered only to the owning user's connection(s), never
    /// broadcast to the public room.
    #[serde(skip)]
    BalanceUpdate { user_id: String, delta: Decimal, reason: BalanceReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoundState {
    Waiting,
    Running,
    Crashed,
}

/// Public fan-out room plus a lookup the gateway uses to route private
/// events to the right connection(s).
pub struct EventBus {
    public: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (public, _) = broadcast::channel(capacity);
        Self { public }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.public.subscribe()
    }

    /// Broadcast an event to every subscriber. Private `BalanceUpdate`
    /// events still flow through this channel — the gateway filters them
    /// to the owning user's connection(s) at delivery time rather than at
    /// publish time, so there's one ordered event stream per round instead
    /// of a second channel to keep in lockstep.
    pub fn publish(&self, event: Event) {
        // A send error just means there are currently no subscribers.
        let _ = self.public.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_published_events() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        bus.publish(Event::Tick { multipliers: vec!["1.23".to_string()], elapsed_ms: 100, crashed_flags: vec![false] });
        let received = rx.try_recv().unwrap();
        matches!(received, Event::Tick { .. });
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = EventBus::new(16);
        bus.publish(Event::Crashed { round: RoundView::default() });
    }
}
