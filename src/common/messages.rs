//! Canonical message types for bridge communication.
//!
//! This module defines the single source of truth for message types
//! flowing between the host chat application and Discord.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message emitted by the host on its "message sent" event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostMessage {
    /// Speaker name.
    pub name: String,
    /// Message body.
    pub mes: String,
    /// Whether the host generated this message itself.
    pub is_system: bool,
    /// Whether the local user authored this message.
    pub is_user: bool,
}

/// Author of a Discord message.
#[derive(Debug, Clone, PartialEq)]
pub struct Author {
    pub username: String,
    /// Automated accounts are never relayed.
    pub bot: bool,
}

/// A message created in a Discord channel the bot can see.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub channel_id: String,
    pub author: Author,
    pub content: String,
}

/// A resolved Discord text channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHandle {
    pub id: String,
    pub name: String,
}

/// Delivery receipt for a message posted to Discord.
#[derive(Debug, Clone)]
pub struct MessageReceipt {
    pub message_id: String,
    pub sent_at: DateTime<Utc>,
}

/// Events published by the bridge controller to its subscribers.
#[derive(Debug, Clone)]
pub enum BridgeEvent {
    /// A message was created in some channel the bot can see.
    Inbound(InboundMessage),
    /// The connection of the given generation dropped.
    Disconnected { generation: u64, reason: String },
}
