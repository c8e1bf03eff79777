//! Settings validation.
//!
//! Validates bridge settings and provides helpful error messages.

use crate::common::error::SettingsError;
use crate::config::types::BridgeSettings;

/// Placeholder left in freshly generated settings files.
const PLACEHOLDER_TOKEN: &str = "YOUR_DISCORD_TOKEN_HERE";

/// Validate settings and return detailed errors.
pub fn validate_settings(settings: &BridgeSettings) -> Result<(), SettingsError> {
    let errors = collect_problems(settings);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(SettingsError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

/// Every problem found in `settings`, one line each.
pub fn collect_problems(settings: &BridgeSettings) -> Vec<String> {
    let mut errors = Vec::new();

    let token = settings.bot_token.trim();
    if token.is_empty() {
        errors.push("botToken is required".to_string());
    } else if token == PLACEHOLDER_TOKEN {
        errors.push("botToken has not been configured (still using placeholder)".to_string());
    }

    let channel_id = settings.channel_id.trim();
    if channel_id.is_empty() {
        errors.push("channelId is required".to_string());
    } else if !is_snowflake(channel_id) {
        errors.push(format!(
            "channelId '{}' is not a Discord channel ID (expected a number)",
            channel_id
        ));
    }

    errors
}

/// Quick check if settings have the minimum required fields populated.
pub fn has_required_fields(settings: &BridgeSettings) -> bool {
    !settings.bot_token.trim().is_empty() && !settings.channel_id.trim().is_empty()
}

fn is_snowflake(value: &str) -> bool {
    matches!(value.parse::<u64>(), Ok(id) if id != 0)
}
