//! Live websocket transport speaking the Discord gateway protocol:
//! hello/identify, heartbeats on the advertised interval, and dispatch
//! decoding into [`DiscordEvent`]s.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, info, trace};

use crate::events::{ComponentInteractionEvent, DiscordEvent, MessageCreateEvent};
use crate::gateway::{GatewayTransport, TransportError};
use crate::rest::DiscordApi;

const OP_DISPATCH: u64 = 0;
const OP_HEARTBEAT: u64 = 1;
const OP_IDENTIFY: u64 = 2;
const OP_RECONNECT: u64 = 7;
const OP_INVALID_SESSION: u64 = 9;
const OP_HELLO: u64 = 10;
const OP_HEARTBEAT_ACK: u64 = 11;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct WsState {
    ws: WsStream,
    heartbeat_interval: Duration,
    next_heartbeat: Instant,
    seq: Option<u64>,
    identified: bool,
}

pub struct WsGatewayTransport {
    api: Arc<DiscordApi>,
    token: SecretString,
    intents: u64,
    state: Mutex<Option<WsState>>,
}

impl WsGatewayTransport {
    pub fn new(api: Arc<DiscordApi>, token: SecretString, intents: u64) -> Self {
        Self { api, token, intents, state: Mutex::new(None) }
    }

    fn identify_payload(&self) -> Value {
        json!({
            "op": OP_IDENTIFY,
            "d": {
                "token": self.token.expose_secret(),
                "intents": self.intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": "huddle",
                    "device": "huddle",
                },
            },
        })
    }
}

#[async_trait]
impl GatewayTransport for WsGatewayTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let url = self
            .api
            .gateway_url()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        let (ws, _response) = connect_async(&url)
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        info!(event_name = "gateway.connected", "gateway websocket open");

        let mut state = self.state.lock().await;
        *state = Some(WsState {
            ws,
            // Replaced by the interval from the hello frame.
            heartbeat_interval: Duration::from_secs(41),
            next_heartbeat: Instant::now() + Duration::from_secs(41),
            seq: None,
            identified: false,
        });
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<DiscordEvent>, TransportError> {
        let mut guard = self.state.lock().await;
        let state = guard
            .as_mut()
            .ok_or_else(|| TransportError::Receive("transport not connected".to_owned()))?;

        loop {
            let message = tokio::select! {
                message = state.ws.next() => message,
                _ = tokio::time::sleep_until(state.next_heartbeat) => {
                    let heartbeat = json!({ "op": OP_HEARTBEAT, "d": state.seq });
                    state
                        .ws
                        .send(Message::Text(heartbeat.to_string()))
                        .await
                        .map_err(|error| TransportError::Receive(error.to_string()))?;
                    trace!(seq = ?state.seq, "heartbeat sent");
                    state.next_heartbeat = Instant::now() + state.heartbeat_interval;
                    continue;
                }
            };

            let frame = match message {
                Some(Ok(Message::Text(text))) => text,
                Some(Ok(Message::Close(_))) | None => {
                    return Err(TransportError::Receive("closed by server".to_owned()));
                }
                Some(Ok(_)) => continue,
                Some(Err(error)) => return Err(TransportError::Receive(error.to_string())),
            };

            let payload: Value = serde_json::from_str(&frame)
                .map_err(|error| TransportError::Receive(error.to_string()))?;
            let op = payload.get("op").and_then(Value::as_u64).unwrap_or(OP_DISPATCH);
            if let Some(seq) = payload.get("s").and_then(Value::as_u64) {
                state.seq = Some(seq);
            }

            match op {
                OP_HELLO => {
                    let interval_ms = payload
                        .pointer("/d/heartbeat_interval")
                        .and_then(Value::as_u64)
                        .unwrap_or(41_250);
                    state.heartbeat_interval = Duration::from_millis(interval_ms);
                    state.next_heartbeat = Instant::now() + state.heartbeat_interval;

                    if !state.identified {
                        state
                            .ws
                            .send(Message::Text(self.identify_payload().to_string()))
                            .await
                            .map_err(|error| TransportError::Receive(error.to_string()))?;
                        state.identified = true;
                        debug!(intents = self.intents, "identify sent");
                    }
                }
                OP_HEARTBEAT_ACK => trace!("heartbeat acknowledged"),
                OP_RECONNECT => {
                    return Err(TransportError::Receive("reconnect requested".to_owned()));
                }
                OP_INVALID_SESSION => {
                    return Err(TransportError::Receive("invalid session".to_owned()));
                }
                OP_DISPATCH => {
                    let event_type =
                        payload.get("t").and_then(Value::as_str).unwrap_or("UNKNOWN");
                    if event_type == "READY" {
                        info!(event_name = "gateway.ready", "gateway session ready");
                        continue;
                    }
                    let data = payload.get("d").cloned().unwrap_or(Value::Null);
                    return Ok(Some(decode_dispatch(event_type, &data)));
                }
                other => trace!(op = other, "ignoring gateway opcode"),
            }
        }
    }

    async fn disconnect(&self) -> Result<(), TransportError> {
        let mut guard = self.state.lock().await;
        if let Some(mut state) = guard.take() {
            state
                .ws
                .close(None)
                .await
                .map_err(|error| TransportError::Disconnect(error.to_string()))?;
        }
        Ok(())
    }
}

/// Maps a dispatch frame to a typed event. Payloads missing required
/// fields fall back to `Unsupported` rather than failing the stream.
fn decode_dispatch(event_type: &str, data: &Value) -> DiscordEvent {
    let unsupported = || DiscordEvent::Unsupported { event_type: event_type.to_owned() };

    match event_type {
        "MESSAGE_CREATE" => {
            let (Some(message_id), Some(channel_id), Some(author_id)) = (
                data.get("id").and_then(Value::as_str),
                data.get("channel_id").and_then(Value::as_str),
                data.pointer("/author/id").and_then(Value::as_str),
            ) else {
                return unsupported();
            };

            DiscordEvent::MessageCreate(MessageCreateEvent {
                message_id: message_id.to_owned(),
                channel_id: channel_id.to_owned(),
                author_id: author_id.to_owned(),
                author_is_bot: data
                    .pointer("/author/bot")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
                content: data
                    .get("content")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_owned(),
            })
        }
        "INTERACTION_CREATE" => {
            // Only message-component interactions (type 3) are routed.
            if data.get("type").and_then(Value::as_u64) != Some(3) {
                return unsupported();
            }

            let user_id = data
                .pointer("/member/user/id")
                .or_else(|| data.pointer("/user/id"))
                .and_then(Value::as_str);
            let (
                Some(interaction_id),
                Some(interaction_token),
                Some(message_id),
                Some(channel_id),
                Some(user_id),
                Some(custom_id),
            ) = (
                data.get("id").and_then(Value::as_str),
                data.get("token").and_then(Value::as_str),
                data.pointer("/message/id").and_then(Value::as_str),
                data.get("channel_id").and_then(Value::as_str),
                user_id,
                data.pointer("/data/custom_id").and_then(Value::as_str),
            )
            else {
                return unsupported();
            };

            DiscordEvent::ComponentInteraction(ComponentInteractionEvent {
                interaction_id: interaction_id.to_owned(),
                interaction_token: interaction_token.to_owned(),
                message_id: message_id.to_owned(),
                channel_id: channel_id.to_owned(),
                user_id: user_id.to_owned(),
                custom_id: custom_id.to_owned(),
            })
        }
        _ => unsupported(),
    }
}
