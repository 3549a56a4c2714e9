//! # Vigil Watch
//!
//! The voice-session watchdog. When the monitored participant leaves a
//! voice channel during the active hours, a grace timer starts for that
//! channel. If the participant has not returned by the time it fires,
//! everyone still in the channel (bots excepted) is disconnected and an
//! aggregate count is reported.
//!
//! ```text
//! gateway events ──► VoiceWatchdog ──► WatchRegistry (one timer per channel)
//!                        │                   │ grace period elapses
//!                        │                   ▼
//!                        └── ActiveWindow   re-check ──► SweepExecutor ──► report
//! ```

pub mod registry;
pub mod sweep;
pub mod watchdog;
pub mod window;

pub use registry::{WatchKey, WatchRegistry};
pub use sweep::{SweepExecutor, SweepResult};
pub use watchdog::{VoiceWatchdog, WatchOutcome};
pub use window::{parse_timezone, ActiveWindow};
