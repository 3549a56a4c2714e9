//! Discord gateway listener: HELLO/heartbeat/IDENTIFY handshake, then a
//! dispatch loop that turns the payloads Vigil cares about into typed
//! events on an mpsc channel.

use futures::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use vigil_core::error::{Result, VigilError};
use vigil_core::types::{ChannelCreatedEvent, ChannelKind, MessageEvent, VoiceEvent};

use crate::cache::VoiceStateCache;
use crate::snowflake;

const GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// GUILDS | GUILD_VOICE_STATES | GUILD_MESSAGES | MESSAGE_CONTENT.
const INTENTS: u64 = (1 << 0) | (1 << 7) | (1 << 9) | (1 << 15);

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Events Vigil consumes from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Voice(VoiceEvent),
    Message(MessageEvent),
    ChannelCreated(ChannelCreatedEvent),
}

/// Gateway connection. `start` consumes it and yields the event stream.
pub struct DiscordGateway {
    token: String,
    cache: Arc<VoiceStateCache>,
}

impl DiscordGateway {
    pub fn new(token: &str, cache: Arc<VoiceStateCache>) -> Self {
        Self { token: token.to_string(), cache }
    }

    /// Spawn the connection loop and return the event stream. Reconnects
    /// with a short delay until the receiver is dropped.
    pub fn start(self) -> mpsc::UnboundedReceiver<GatewayEvent> {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            loop {
                if let Err(e) = self.run_once(&tx).await {
                    tracing::error!("gateway connection error: {e}");
                }
                if tx.is_closed() {
                    tracing::info!("gateway stopped (receiver dropped)");
                    return;
                }
                tracing::info!("reconnecting to gateway in {}s", RECONNECT_DELAY.as_secs());
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        });

        rx
    }

    /// One connection: handshake, then read until the socket closes or
    /// the server asks for a reconnect.
    async fn run_once(&self, tx: &mpsc::UnboundedSender<GatewayEvent>) -> Result<()> {
        let (ws, _) = tokio_tungstenite::connect_async(GATEWAY_URL)
            .await
            .map_err(|e| VigilError::Platform(format!("gateway connect failed: {e}")))?;
        tracing::info!("gateway connected");

        let (write, mut read) = ws.split();
        let write = Arc::new(tokio::sync::Mutex::new(write));
        let mut heartbeat: Option<tokio::task::JoinHandle<()>> = None;

        while let Some(message) = read.next().await {
            match message {
                Ok(WsMessage::Text(text)) => {
                    let payload: Value = match serde_json::from_str(&text) {
                        Ok(payload) => payload,
                        Err(e) => {
                            tracing::warn!("bad gateway payload: {e}");
                            continue;
                        }
                    };
                    match payload["op"].as_i64() {
                        // HELLO: start the heartbeat, then identify.
                        Some(10) => {
                            let interval =
                                payload["d"]["heartbeat_interval"].as_u64().unwrap_or(41_250);
                            heartbeat = Some(spawn_heartbeat(write.clone(), interval));
                            self.identify(&write).await?;
                        }
                        // Dispatch.
                        Some(0) => {
                            let event_type = payload["t"].as_str().unwrap_or("");
                            if let Some(event) =
                                self.handle_dispatch(event_type, &payload["d"])
                                && tx.send(event).is_err()
                            {
                                break;
                            }
                        }
                        // Heartbeat ack.
                        Some(11) => tracing::trace!("heartbeat acked"),
                        // Reconnect / invalid session: drop and redial.
                        Some(7) | Some(9) => {
                            tracing::info!("gateway requested reconnect");
                            break;
                        }
                        _ => {}
                    }
                }
                Ok(WsMessage::Close(frame)) => {
                    tracing::info!("gateway closed: {frame:?}");
                    break;
                }
                Err(e) => {
                    tracing::error!("gateway read error: {e}");
                    break;
                }
                _ => {}
            }
        }

        if let Some(task) = heartbeat {
            task.abort();
        }
        Ok(())
    }

    async fn identify(&self, write: &Arc<tokio::sync::Mutex<WsSink>>) -> Result<()> {
        let identify = serde_json::json!({
            "op": 2,
            "d": {
                "token": self.token,
                "intents": INTENTS,
                "properties": { "os": "linux", "browser": "vigil", "device": "vigil" },
            }
        });
        write
            .lock()
            .await
            .send(WsMessage::Text(identify.to_string().into()))
            .await
            .map_err(|e| VigilError::Platform(format!("identify failed: {e}")))
    }

    /// Map one dispatch payload to a typed event, updating the
    /// voice-state cache along the way. Unhandled types return `None`.
    fn handle_dispatch(&self, event_type: &str, data: &Value) -> Option<GatewayEvent> {
        match event_type {
            "VOICE_STATE_UPDATE" => {
                let group_id = snowflake(&data["guild_id"])?;
                let user_id = snowflake(&data["user_id"])?;
                let new_channel = snowflake(&data["channel_id"]);
                let is_bot = data["member"]["user"]["bot"].as_bool().unwrap_or(false);
                let previous_channel = self.cache.apply(group_id, user_id, new_channel, is_bot);
                Some(GatewayEvent::Voice(VoiceEvent {
                    group_id,
                    user_id,
                    previous_channel,
                    new_channel,
                }))
            }
            "MESSAGE_CREATE" => {
                // DMs carry no guild id and are not moderated.
                let group_id = snowflake(&data["guild_id"])?;
                Some(GatewayEvent::Message(MessageEvent {
                    group_id,
                    channel_id: snowflake(&data["channel_id"])?,
                    message_id: snowflake(&data["id"])?,
                    author_id: snowflake(&data["author"]["id"])?,
                    author_name: data["author"]["username"].as_str().unwrap_or("").to_string(),
                    author_is_bot: data["author"]["bot"].as_bool().unwrap_or(false),
                    content: data["content"].as_str().unwrap_or("").to_string(),
                }))
            }
            "CHANNEL_CREATE" => {
                let group_id = snowflake(&data["guild_id"])?;
                Some(GatewayEvent::ChannelCreated(ChannelCreatedEvent {
                    group_id,
                    channel_id: snowflake(&data["id"])?,
                    name: data["name"].as_str().unwrap_or("").to_string(),
                    kind: ChannelKind::from_discord(data["type"].as_i64().unwrap_or(-1)),
                }))
            }
            "READY" => {
                let user = data["user"]["username"].as_str().unwrap_or("unknown");
                tracing::info!("gateway ready as {user}");
                None
            }
            _ => None,
        }
    }
}

type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    WsMessage,
>;

fn spawn_heartbeat(
    write: Arc<tokio::sync::Mutex<WsSink>>,
    interval_ms: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1_000)));
        // The immediate first tick doubles as the initial heartbeat.
        loop {
            ticker.tick().await;
            let beat = serde_json::json!({ "op": 1, "d": null }).to_string();
            if write.lock().await.send(WsMessage::Text(beat.into())).await.is_err() {
                return;
            }
        }
    })
}
