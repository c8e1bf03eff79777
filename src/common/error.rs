//! Error types for the application.

use thiserror::Error;

/// Settings persistence and validation errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to access settings file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Settings validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors surfaced by the bridge controller and adapter.
///
/// None of these reach the host; the adapter logs them and moves on.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Bot token is not configured")]
    MissingToken,

    #[error("Login error: {0}")]
    Authentication(#[source] DiscordError),

    #[error("Discord channel not set up")]
    ChannelNotSet,

    #[error("Error sending message to Discord: {0}")]
    Delivery(#[source] DiscordError),

    #[error("Bridge adapter is no longer running")]
    AdapterClosed,

    #[error("Connect attempt cancelled")]
    Cancelled,
}

/// Discord-related errors.
#[derive(Debug, Error)]
pub enum DiscordError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serenity error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("Gateway closed: {reason}")]
    GatewayClosed { reason: String },

    #[error("Invalid channel id: '{value}'")]
    InvalidChannelId { value: String },

    #[error("Login rejected by Discord")]
    #[allow(dead_code)]
    LoginRejected,
}

/// Result type alias for bridge operations.
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

/// Result type alias for Discord operations.
pub type DiscordResult<T> = std::result::Result<T, DiscordError>;

/// Result type alias for settings operations.
pub type SettingsResult<T> = std::result::Result<T, SettingsError>;
