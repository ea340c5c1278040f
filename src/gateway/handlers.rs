//! The WebSocket endpoint: one task per connection, reading inbound ops
//! off the socket and writing both the public event fan-out and private
//! balance updates back onto it.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::Config;
use crate::events::{Event, EventBus};
use crate::gateway::auth::validate_token;
use crate::gateway::connection::{Connection, ConnectionRegistry, Role};
use crate::gateway::protocol::{second_curve_from_variant, InboundMessage, OutboundMessage};
use crate::rng::seed::RngEngine;
use crate::rng::verify::{handle_verify, VerifyRequest};
use crate::round::RoundHandle;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub round: RoundHandle,
    pub rng: Arc<RngEngine>,
    pub events: Arc<EventBus>,
    pub connections: Arc<ConnectionRegistry>,
}

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// The public broadcast channel carries `BalanceUpdate` events too (§events
/// docs), but they must never reach anyone but the owning user. This task is
/// the other half of that contract: it is the only subscriber that acts on
/// them, routing each one through the connection registry's primary-socket
/// map into the recipient's private per-connection channel. Every
/// per-connection task filters `BalanceUpdate` back out of its own public
/// subscription, so without this router the event is simply never delivered.
pub async fn run_private_balance_router(events: Arc<EventBus>, connections: Arc<ConnectionRegistry>) {
    let mut rx = events.subscribe();
    loop {
        match rx.recv().await {
            Ok(Event::BalanceUpdate { user_id, delta, reason }) => {
                connections.send_to_user(&user_id, Event::BalanceUpdate { user_id: user_id.clone(), delta, reason });
            }
            Ok(_) => {}
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "private balance router lagged behind the event bus");
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let connection_id = Uuid::new_v4();

    state.connections.register(Connection { connection_id, role: Role::Guest, user_id: None, sender: event_tx });

    let mut public_rx = state.events.subscribe();

    if let Some(view) = state.round.view().await {
        let snapshot = serde_json::json!({ "type": "state_change", "state": view.state, "round": view });
        let _ = sender.send(Message::Text(snapshot.to_string())).await;
    }
    let history_payload = serde_json::json!({ "type": "history", "entries": state.round.history() });
    let _ = sender.send(Message::Text(history_payload.to_string())).await;

    loop {
        tokio::select! {
            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        let response = dispatch(&text, connection_id, &state).await;
                        if let Ok(payload) = serde_json::to_string(&response) {
                            let _ = sender.send(Message::Text(payload)).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            event = public_rx.recv() => {
                if let Ok(event) = event {
                    if matches!(event, Event::BalanceUpdate { .. }) {
                        continue;
                    }
                    if let Ok(payload) = serde_json::to_string(&event) {
                        let _ = sender.send(Message::Text(payload)).await;
                    }
                }
            }
            private = event_rx.recv() => {
                if let Some(event) = private {
                    if let Ok(payload) = serde_json::to_string(&event) {
                        let _ = sender.send(Message::Text(payload)).await;
                    }
                }
            }
        }
    }

    state.connections.deregister(connection_id);
}

async fn dispatch(raw: &str, connection_id: Uuid, state: &AppState) -> OutboundMessage {
    let message: InboundMessage = match serde_json::from_str(raw) {
        Ok(m) => m,
        Err(_) => return OutboundMessage::error("INVALID_VARIANT"),
    };

    let role = state.connections.role_of(connection_id);
    let user_id = state.connections.user_id_of(connection_id);

    match message {
        InboundMessage::Authenticate { token } => match validate_token(&token, &state.config.auth_secret) {
            Some(identity) => {
                state.connections.attach_identity(connection_id, identity.user_id.clone(), identity.role);
                OutboundMessage::ok(serde_json::json!({ "success": true, "userId": identity.user_id }))
            }
            None => {
                // Leave the connection as an unauthenticated GUEST; the
                // handshake failing never drops the socket.
                OutboundMessage::error("AUTH_REQUIRED")
            }
        },

        InboundMessage::PlaceBet { amount, auto_cashout_at, slot } => {
            let Some(user_id) = require_user(role, user_id) else { return OutboundMessage::error("AUTH_REQUIRED") };
            let slot = slot.unwrap_or(1);
            match state.round.place_bet(user_id, slot, amount, auto_cashout_at).await {
                Ok(bet_id) => OutboundMessage::ok(serde_json::json!({ "success": true, "betId": bet_id })),
                Err(err) => OutboundMessage::error(err.wire_code()),
            }
        }

        InboundMessage::Cashout { slot, at_multiplier } => {
            let Some(user_id) = require_user(role, user_id) else { return OutboundMessage::error("AUTH_REQUIRED") };
            let slot = slot.unwrap_or(1);
            match state.round.cashout(user_id, slot, at_multiplier).await {
                Ok(ack) => OutboundMessage::ok(serde_json::json!({ "success": true, "multiplier": ack.multiplier, "payout": ack.payout, "profit": ack.profit })),
                Err(err) => OutboundMessage::error(err.wire_code()),
            }
        }

        InboundMessage::SetClientSeed { client_seed } => {
            let Some(user_id) = require_user(role, user_id) else { return OutboundMessage::error("AUTH_REQUIRED") };
            match state.rng.set_client_seed(&user_id, client_seed) {
                Ok(()) => OutboundMessage::ok(serde_json::json!({ "success": true })),
                Err(err) => OutboundMessage::error(err.wire_code()),
            }
        }

        InboundMessage::RotateSeed {} => {
            let Some(user_id) = require_user(role, user_id) else { return OutboundMessage::error("AUTH_REQUIRED") };
            let rotated = state.rng.rotate_user_seed(&user_id);
            OutboundMessage::ok(serde_json::json!({
                "success": true,
                "previousSeed": rotated.previous_seed,
                "previousCommitment": rotated.previous_commitment,
                "previousNonce": rotated.previous_nonce,
                "newCommitment": rotated.new_commitment,
            }))
        }

        InboundMessage::GetSeedInfo {} => {
            let Some(user_id) = require_user(role, user_id) else { return OutboundMessage::error("AUTH_REQUIRED") };
            let info = state.rng.seed_info(&user_id);
            OutboundMessage::ok(serde_json::json!({ "commitment": info.commitment, "nonce": info.nonce }))
        }

        InboundMessage::Verify { server_seed, client_seed, nonce, variant, variant_params: _, commitment } => {
            let second_curve = match second_curve_from_variant(&variant) {
                Ok(flag) => flag,
                Err(err) => return OutboundMessage::error(err.wire_code()),
            };
            match handle_verify(&state.rng, VerifyRequest { server_seed, client_seed, nonce, second_curve, commitment }) {
                Ok(response) => OutboundMessage::ok(serde_json::json!({ "crashPoint": response.crash_point })),
                Err(err) => OutboundMessage::error(err.wire_code()),
            }
        }

        InboundMessage::ChatJoin { room } => OutboundMessage::ok(serde_json::json!({ "success": true, "room": room })),

        InboundMessage::ChatSend { room, message } => {
            let Some(user_id) = require_user(role, user_id) else { return OutboundMessage::error("AUTH_REQUIRED") };
            let message = truncate_to_byte_limit(&message, 200);
            state.events.publish(Event::Chat { room: room.clone(), user_id, message });
            OutboundMessage::ok(serde_json::json!({ "success": true, "room": room }))
        }
    }
}

fn require_user(role: Role, user_id: Option<String>) -> Option<String> {
    if role == Role::Guest {
        return None;
    }
    user_id
}

/// Truncate to at most `max_bytes` bytes without splitting a multi-byte
/// UTF-8 character (§6.1: chat messages are capped at 200 bytes).
fn truncate_to_byte_limit(message: &str, max_bytes: usize) -> String {
    if message.len() <= max_bytes {
        return message.to_string();
    }
    let mut end = max_bytes;
    while end > 0 && !message.is_char_boundary(end) {
        end -= 1;
    }
    message[..end].to_string()
}
