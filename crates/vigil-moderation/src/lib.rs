//! # Vigil Moderation
//!
//! Housekeeping features around the watchdog: the machine-code channel
//! filter and the scheduled notification mutes.

pub mod filter;
pub mod mute;

pub use filter::CodeFilter;
pub use mute::NotificationMuter;
