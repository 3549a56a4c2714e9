//! # Vigil Discord
//!
//! Discord realization of the `ChatPlatform` contract: a REST client for
//! directory lookups and moderation actions, a gateway listener that
//! turns dispatch payloads into typed events, and the voice-state cache
//! that bridges the two (live voice state only exists on the gateway).

pub mod cache;
pub mod gateway;
pub mod rest;

pub use cache::VoiceStateCache;
pub use gateway::{DiscordGateway, GatewayEvent};
pub use rest::DiscordRest;

/// Discord ids arrive as decimal strings ("snowflakes"), occasionally as
/// bare numbers.
pub(crate) fn snowflake(value: &serde_json::Value) -> Option<u64> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_u64(),
        _ => None,
    }
}
