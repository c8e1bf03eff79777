//! Environment variable overrides for settings.
//!
//! Supports overriding stored settings with environment variables:
//! - `DISCORD_CHATTER_SETTINGS` - path of the host settings file
//! - `DISCORD_CHATTER_BOT_TOKEN` - Discord bot token
//! - `DISCORD_CHATTER_CHANNEL_ID` - Discord channel ID

use std::env;

use crate::config::types::BridgeSettings;

/// Environment variable prefix for all overrides.
const ENV_PREFIX: &str = "DISCORD_CHATTER";

/// Apply environment variable overrides to loaded settings.
///
/// Lets the token stay out of the settings file. Empty values are ignored.
pub fn apply_env_overrides(settings: BridgeSettings) -> BridgeSettings {
    apply_overrides(settings, |name| env::var(name).ok())
}

fn apply_overrides(
    mut settings: BridgeSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> BridgeSettings {
    if let Some(token) = lookup(&format!("{}_BOT_TOKEN", ENV_PREFIX)).filter(|v| !v.is_empty()) {
        settings.bot_token = token;
    }
    if let Some(channel_id) =
        lookup(&format!("{}_CHANNEL_ID", ENV_PREFIX)).filter(|v| !v.is_empty())
    {
        settings.channel_id = channel_id;
    }
    settings.normalized()
}

/// Get the settings file path from environment or use default.
///
/// Checks `DISCORD_CHATTER_SETTINGS`, otherwise returns "settings.json".
pub fn get_settings_path() -> String {
    env::var(format!("{}_SETTINGS", ENV_PREFIX)).unwrap_or_else(|_| "settings.json".to_string())
}
