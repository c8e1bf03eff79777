//! Configuration type definitions.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::error::SettingsResult;
use crate::config::store::SettingsStore;

/// Key the bridge settings are stored under in the host settings store.
pub const EXTENSION_KEY: &str = "discordChatter";

/// Persisted bridge settings.
///
/// Both fields may be empty; the record is created with empty defaults on
/// first load and overwritten on every edit.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BridgeSettings {
    /// Discord bot token (secret).
    pub bot_token: String,
    /// Discord channel ID to relay into.
    pub channel_id: String,
}

impl BridgeSettings {
    /// Load settings stored under `key`, falling back to empty defaults.
    pub fn load_from(store: &dyn SettingsStore, key: &str) -> SettingsResult<Self> {
        match store.load(key)? {
            Some(value) => Ok(serde_json::from_value::<Self>(value)?.normalized()),
            None => Ok(Self::default()),
        }
    }

    /// Strip whitespace around the channel ID. Channel lookup and the inbound
    /// filter both compare against the stored value.
    pub fn normalized(mut self) -> Self {
        let trimmed = self.channel_id.trim();
        if trimmed.len() != self.channel_id.len() {
            self.channel_id = trimmed.to_string();
        }
        self
    }

    /// Persist settings under `key`.
    pub fn save_to(&self, store: &dyn SettingsStore, key: &str) -> SettingsResult<()> {
        store.save(key, serde_json::to_value(self)?)
    }
}

impl fmt::Debug for BridgeSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.bot_token.is_empty() {
            "<empty>"
        } else {
            "<redacted>"
        };
        f.debug_struct("BridgeSettings")
            .field("bot_token", &token)
            .field("channel_id", &self.channel_id)
            .finish()
    }
}
