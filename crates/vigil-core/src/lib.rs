//! # Vigil Core
//!
//! Shared kernel for the Vigil moderation bot: error type, configuration,
//! the chat-platform contract, and the event/data types that flow between
//! the gateway, the watchdog, and the moderation features.

pub mod config;
pub mod error;
pub mod mock;
pub mod traits;
pub mod types;

pub use config::VigilConfig;
pub use error::{Result, VigilError};
pub use traits::{ChatPlatform, PlatformCallError};
