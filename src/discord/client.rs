//! Discord bot client abstraction.
//!
//! Implements [`ChatPlatform`] on top of serenity, hiding serenity
//! implementation details from the rest of the application.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serenity::async_trait;
use serenity::cache::Cache;
use serenity::gateway::ShardManager;
use serenity::http::{Http, HttpBuilder};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::{ChannelId, GuildId};
use serenity::prelude::*;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::common::error::{DiscordError, DiscordResult};
use crate::common::{Author, ChannelHandle, InboundMessage, MessageReceipt};
use crate::discord::platform::{
    ChatPlatform, PlatformConnection, PlatformEvent, PlatformEventSender,
};

/// Forwards serenity gateway events into the bridge's event channel.
struct EventForwarder {
    events_tx: PlatformEventSender,
}

impl EventForwarder {
    fn forward(&self, event: PlatformEvent) {
        if let Err(error) = self.events_tx.send(event) {
            warn!("Failed to process discord event: {}", error);
        }
    }
}

#[async_trait]
impl EventHandler for EventForwarder {
    async fn ready(&self, _context: Context, ready: Ready) {
        debug!(
            "Gateway ready as {} ({} guilds pending)",
            ready.user.name,
            ready.guilds.len()
        );
        // Without guilds there is no cache to wait for.
        if ready.guilds.is_empty() {
            self.forward(PlatformEvent::Ready {
                user_tag: ready.user.tag(),
            });
        }
    }

    async fn cache_ready(&self, context: Context, guilds: Vec<GuildId>) {
        debug!("Channel cache ready for {} guilds", guilds.len());
        let user_tag = context.cache.current_user().tag();
        self.forward(PlatformEvent::Ready { user_tag });
    }

    async fn message(&self, _context: Context, message: Message) {
        self.forward(PlatformEvent::MessageCreate(InboundMessage {
            channel_id: message.channel_id.to_string(),
            author: Author {
                username: message.author.name.clone(),
                bot: message.author.bot,
            },
            content: message.content,
        }));
    }
}

/// Serenity-backed Discord platform.
#[derive(Debug, Clone)]
pub struct SerenityPlatform {
    request_timeout: Duration,
    connect_timeout: Duration,
}

impl Default for SerenityPlatform {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl SerenityPlatform {
    /// Gateway capabilities: guild access, guild messages, message content.
    fn intents() -> GatewayIntents {
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT
    }
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    async fn login(
        &self,
        token: &str,
        events: PlatformEventSender,
    ) -> DiscordResult<Box<dyn PlatformConnection>> {
        // Build a custom reqwest client with timeout settings
        let reqwest_client = reqwest::Client::builder()
            .timeout(self.request_timeout)
            .connect_timeout(self.connect_timeout)
            .build()?;

        let http = HttpBuilder::new(token).client(reqwest_client).build();

        let forwarder = EventForwarder {
            events_tx: events.clone(),
        };
        let mut client = serenity::client::ClientBuilder::new_with_http(http, Self::intents())
            .event_handler(forwarder)
            .await?;

        let http = client.http.clone();
        let cache = client.cache.clone();
        let shard_manager = client.shard_manager.clone();

        let gateway = tokio::spawn(async move {
            let reason = match client.start().await {
                Ok(()) => "gateway closed".to_string(),
                Err(e) => e.to_string(),
            };
            info!("Discord client stopped: {}", reason);
            if let Err(error) = events.send(PlatformEvent::Disconnected { reason }) {
                debug!("Bridge no longer listening for discord events: {}", error);
            }
        });

        Ok(Box::new(SerenityConnection {
            http,
            cache,
            shard_manager,
            gateway,
        }))
    }
}

/// A running serenity client.
struct SerenityConnection {
    http: Arc<Http>,
    cache: Arc<Cache>,
    shard_manager: Arc<ShardManager>,
    gateway: JoinHandle<()>,
}

fn parse_channel_id(value: &str) -> DiscordResult<ChannelId> {
    match value.trim().parse::<u64>() {
        Ok(id) if id != 0 => Ok(ChannelId::new(id)),
        _ => Err(DiscordError::InvalidChannelId {
            value: value.to_string(),
        }),
    }
}

/// Find a guild channel in the cache.
fn cached_channel(cache: &Cache, id: ChannelId) -> Option<ChannelHandle> {
    cache.guilds().into_iter().find_map(|guild_id| {
        let guild = cache.guild(guild_id)?;
        let channel = guild.channels.get(&id)?;
        Some(ChannelHandle {
            id: channel.id.to_string(),
            name: channel.name.clone(),
        })
    })
}

#[async_trait]
impl PlatformConnection for SerenityConnection {
    fn channel(&self, channel_id: &str) -> Option<ChannelHandle> {
        let id = match parse_channel_id(channel_id) {
            Ok(id) => id,
            Err(e) => {
                debug!("{}", e);
                return None;
            }
        };

        cached_channel(&self.cache, id)
    }

    async fn send(&self, channel: &ChannelHandle, text: &str) -> DiscordResult<MessageReceipt> {
        let id = parse_channel_id(&channel.id)?;
        let message = id.say(&self.http, text).await?;
        Ok(MessageReceipt {
            message_id: message.id.to_string(),
            sent_at: Utc::now(),
        })
    }

    async fn logout(&self) {
        info!("Initiating graceful Discord shutdown...");
        self.shard_manager.shutdown_all().await;
        self.gateway.abort();
        info!("Discord shutdown complete");
    }
}
