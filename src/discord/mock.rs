//! In-process platform double for exercising the bridge without Discord.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use serenity::async_trait;

use crate::common::error::{DiscordError, DiscordResult};
use crate::common::{Author, ChannelHandle, InboundMessage, MessageReceipt};
use crate::discord::platform::{
    ChatPlatform, PlatformConnection, PlatformEvent, PlatformEventSender,
};

#[derive(Default)]
struct MockState {
    channels: Mutex<Vec<ChannelHandle>>,
    sent: Mutex<Vec<(String, String)>>,
    events_tx: Mutex<Option<PlatformEventSender>>,
    reject_login: AtomicBool,
    fail_send: AtomicBool,
    withhold_ready: AtomicBool,
    stall_ready: AtomicBool,
    logins: AtomicUsize,
    logouts: AtomicUsize,
}

/// Records sends and lets tests inject gateway events.
#[derive(Clone, Default)]
pub struct MockPlatform {
    state: Arc<MockState>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// A platform whose cache contains channel `id`.
    pub fn with_channel(id: &str) -> Self {
        let platform = Self::new();
        platform.state.channels.lock().push(ChannelHandle {
            id: id.to_string(),
            name: format!("channel-{}", id),
        });
        platform
    }

    pub fn reject_login(&self, reject: bool) {
        self.state.reject_login.store(reject, Ordering::SeqCst);
    }

    pub fn fail_send(&self, fail: bool) {
        self.state.fail_send.store(fail, Ordering::SeqCst);
    }

    /// Report a gateway failure instead of ready on the next login.
    pub fn withhold_ready(&self, withhold: bool) {
        self.state.withhold_ready.store(withhold, Ordering::SeqCst);
    }

    /// Send neither ready nor a failure on the next login.
    pub fn stall_ready(&self, stall: bool) {
        self.state.stall_ready.store(stall, Ordering::SeqCst);
    }

    /// `(channel_id, text)` of every successful send.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.sent.lock().clone()
    }

    pub fn logins(&self) -> usize {
        self.state.logins.load(Ordering::SeqCst)
    }

    pub fn logouts(&self) -> usize {
        self.state.logouts.load(Ordering::SeqCst)
    }

    /// Push a gateway event into the most recent connection.
    pub fn inject(&self, event: PlatformEvent) {
        if let Some(tx) = self.state.events_tx.lock().as_ref() {
            let _ = tx.send(event);
        }
    }

    /// Inject a message created by `username` in `channel_id`.
    pub fn inject_message(&self, channel_id: &str, username: &str, bot: bool, content: &str) {
        self.inject(PlatformEvent::MessageCreate(InboundMessage {
            channel_id: channel_id.to_string(),
            author: Author {
                username: username.to_string(),
                bot,
            },
            content: content.to_string(),
        }));
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn login(
        &self,
        _token: &str,
        events: PlatformEventSender,
    ) -> DiscordResult<Box<dyn PlatformConnection>> {
        self.state.logins.fetch_add(1, Ordering::SeqCst);
        if self.state.reject_login.load(Ordering::SeqCst) {
            return Err(DiscordError::LoginRejected);
        }

        if self.state.withhold_ready.load(Ordering::SeqCst) {
            let _ = events.send(PlatformEvent::Disconnected {
                reason: "Invalid authentication".to_string(),
            });
        } else if !self.state.stall_ready.load(Ordering::SeqCst) {
            let _ = events.send(PlatformEvent::Ready {
                user_tag: "chatter#0001".to_string(),
            });
        }
        *self.state.events_tx.lock() = Some(events);

        Ok(Box::new(MockConnection {
            state: self.state.clone(),
        }))
    }
}

struct MockConnection {
    state: Arc<MockState>,
}

#[async_trait]
impl PlatformConnection for MockConnection {
    fn channel(&self, channel_id: &str) -> Option<ChannelHandle> {
        self.state
            .channels
            .lock()
            .iter()
            .find(|c| c.id == channel_id)
            .cloned()
    }

    async fn send(&self, channel: &ChannelHandle, text: &str) -> DiscordResult<MessageReceipt> {
        if self.state.fail_send.load(Ordering::SeqCst) {
            return Err(DiscordError::GatewayClosed {
                reason: "Missing Permissions".to_string(),
            });
        }

        let mut sent = self.state.sent.lock();
        sent.push((channel.id.clone(), text.to_string()));
        Ok(MessageReceipt {
            message_id: sent.len().to_string(),
            sent_at: Utc::now(),
        })
    }

    async fn logout(&self) {
        self.state.logouts.fetch_add(1, Ordering::SeqCst);
    }
}
