//! # Vigil — chat-platform moderation bot
//!
//! Watches a single participant's overnight voice sessions, sweeps
//! abandoned channels after a grace period, filters the machine-code
//! channel, and keeps notification mutes applied.
//!
//! Usage:
//!   vigil                        # Run with ~/.vigil/config.toml
//!   vigil --config vigil.toml    # Explicit config path
//!   vigil --verbose              # Debug logging

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use vigil_core::traits::ChatPlatform;
use vigil_core::VigilConfig;
use vigil_discord::{DiscordGateway, DiscordRest, GatewayEvent, VoiceStateCache};
use vigil_moderation::{CodeFilter, NotificationMuter};
use vigil_watch::VoiceWatchdog;

#[derive(Parser)]
#[command(name = "vigil", version, about = "Vigil — overnight voice watchdog & moderation bot")]
struct Cli {
    /// Config file path (default: ~/.vigil/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "vigil=debug,vigil_watch=debug,vigil_discord=debug,vigil_moderation=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => VigilConfig::load_from(path)?,
        None => VigilConfig::load()?,
    };
    if config.discord.bot_token.is_empty() {
        anyhow::bail!("no bot token configured (set [discord] bot_token)");
    }

    let cache = Arc::new(VoiceStateCache::new());
    let platform: Arc<dyn ChatPlatform> =
        Arc::new(DiscordRest::new(&config.discord.bot_token, cache.clone()));

    let watchdog = VoiceWatchdog::new(platform.clone(), &config.watch);
    if config.watch.target_user_id == 0 {
        tracing::info!("no target user configured, voice watchdog is inert");
    } else {
        tracing::info!(
            target_user = config.watch.target_user_id,
            start_hour = config.watch.active_start_hour,
            end_hour = config.watch.active_end_hour,
            grace_secs = config.watch.grace_secs,
            "voice watchdog armed"
        );
    }

    let code_filter = CodeFilter::new(
        platform.clone(),
        config.filter.code_channel_id,
        config.discord.admin_user_id,
    );

    // The muter shares the watchdog's timezone for its daily hour.
    let tz = vigil_watch::parse_timezone(&config.watch.timezone);
    let muter = Arc::new(NotificationMuter::new(
        platform.clone(),
        &config.mute,
        tz,
        config.discord.admin_user_id,
    ));
    tokio::spawn(muter.clone().daily_loop());

    // Single dispatch loop: events are handled in arrival order.
    let mut events = DiscordGateway::new(&config.discord.bot_token, cache).start();
    while let Some(event) = events.recv().await {
        match event {
            GatewayEvent::Voice(voice) => watchdog.handle_event(&voice),
            GatewayEvent::Message(message) => code_filter.handle_message(&message).await,
            GatewayEvent::ChannelCreated(created) => {
                muter.handle_channel_created(&created).await
            }
        }
    }

    tracing::info!("gateway stream ended, shutting down");
    Ok(())
}
