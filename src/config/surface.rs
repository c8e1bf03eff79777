//! Configuration surface for the bridge.
//!
//! Two inputs (bot token, channel ID) and a connect action. Every edit is
//! written into [`BridgeSettings`] and scheduled for debounced persistence.

use crate::config::debounce::DebouncedSave;
use crate::config::types::BridgeSettings;

/// An editable settings field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    BotToken,
    ChannelId,
}

impl SettingsField {
    pub fn label(self) -> &'static str {
        match self {
            SettingsField::BotToken => "Bot Token",
            SettingsField::ChannelId => "Channel ID",
        }
    }

    /// Secret fields are masked when rendered.
    pub fn is_secret(self) -> bool {
        matches!(self, SettingsField::BotToken)
    }
}

/// Rendered state of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldView {
    pub field: SettingsField,
    pub label: &'static str,
    pub value: String,
}

/// The settings panel: owns the live settings and the debounced writer.
pub struct SettingsPanel {
    settings: BridgeSettings,
    saver: DebouncedSave,
}

impl SettingsPanel {
    pub fn new(settings: BridgeSettings, saver: DebouncedSave) -> Self {
        Self { settings, saver }
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// Apply an input change and schedule a save.
    pub fn edit(&mut self, field: SettingsField, value: String) {
        match field {
            SettingsField::BotToken => self.settings.bot_token = value,
            SettingsField::ChannelId => self.settings.channel_id = value.trim().to_string(),
        }
        self.saver.schedule(self.settings.clone());
    }

    /// Render both fields, masking secrets.
    pub fn fields(&self) -> Vec<FieldView> {
        [SettingsField::BotToken, SettingsField::ChannelId]
            .into_iter()
            .map(|field| {
                let raw = match field {
                    SettingsField::BotToken => &self.settings.bot_token,
                    SettingsField::ChannelId => &self.settings.channel_id,
                };
                let value = if field.is_secret() {
                    "*".repeat(raw.chars().count())
                } else {
                    raw.clone()
                };
                FieldView {
                    field,
                    label: field.label(),
                    value,
                }
            })
            .collect()
    }

    /// Flush pending writes.
    pub async fn close(self) {
        self.saver.flush().await;
    }
}
