//! The slice of the Discord client surface the bridge relies on.

use serenity::async_trait;
use tokio::sync::mpsc;

use crate::common::error::DiscordResult;
use crate::common::{ChannelHandle, InboundMessage, MessageReceipt};

/// Events emitted by a live platform connection.
#[derive(Debug, Clone)]
pub enum PlatformEvent {
    /// Logged in and the channel cache is populated.
    Ready { user_tag: String },
    /// A message was created in a channel the bot can see.
    MessageCreate(InboundMessage),
    /// The gateway stopped and will not come back on its own.
    Disconnected { reason: String },
}

/// Sender half handed to the platform at login.
pub type PlatformEventSender = mpsc::UnboundedSender<PlatformEvent>;

/// A chat platform the bridge can log in to.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Authenticate with `token` and start the gateway.
    ///
    /// Returns once the client is built; readiness and gateway failures are
    /// reported through `events`.
    async fn login(
        &self,
        token: &str,
        events: PlatformEventSender,
    ) -> DiscordResult<Box<dyn PlatformConnection>>;
}

/// A live, logged-in platform connection.
#[async_trait]
pub trait PlatformConnection: Send + Sync {
    /// Look a channel up in the connection's channel cache.
    fn channel(&self, channel_id: &str) -> Option<ChannelHandle>;

    /// Send `text` to `channel` as a single message.
    async fn send(&self, channel: &ChannelHandle, text: &str) -> DiscordResult<MessageReceipt>;

    /// Close the gateway.
    async fn logout(&self);
}
