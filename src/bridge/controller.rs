//! Bridge controller.
//!
//! Owns the single Discord connection and the single send path. Inbound
//! Discord events are published on the controller's event source from the
//! moment a connection is created.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::bridge::state::ConnectionState;
use crate::common::error::{BridgeError, BridgeResult, DiscordError};
use crate::common::{BridgeEvent, ChannelHandle, MessageReceipt};
use crate::config::BridgeSettings;
use crate::discord::platform::{ChatPlatform, PlatformConnection, PlatformEvent};
use crate::host::{EventSource, Subscription, DEFAULT_CAPACITY};

/// Name of the controller's inbound event source.
pub const MESSAGE_CREATE: &str = "messageCreate";

/// Result of a successful connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    /// Tag of the bot account we logged in as.
    pub user_tag: String,
    /// Target channel, `None` if it was not found in the cache.
    pub channel: Option<ChannelHandle>,
}

/// A live connection with its dispatcher.
struct Link {
    generation: u64,
    connection: Box<dyn PlatformConnection>,
    channel: Option<ChannelHandle>,
    dispatcher: JoinHandle<()>,
}

/// A login waiting for the session to become ready.
pub struct PendingLogin {
    generation: u64,
    connection: Box<dyn PlatformConnection>,
    events_rx: mpsc::UnboundedReceiver<PlatformEvent>,
    events: EventSource<BridgeEvent>,
}

impl PendingLogin {
    /// Wait for the ready event.
    ///
    /// Messages created before ready are published right away. Firing
    /// `cancel`, or dropping its sender, logs the session out.
    pub async fn ready(mut self, mut cancel: oneshot::Receiver<()>) -> BridgeResult<ReadyLogin> {
        let user_tag = loop {
            let event = tokio::select! {
                event = self.events_rx.recv() => event,
                _ = &mut cancel => {
                    info!("Connect attempt cancelled before ready");
                    self.connection.logout().await;
                    return Err(BridgeError::Cancelled);
                }
            };

            match event {
                Some(PlatformEvent::Ready { user_tag }) => break user_tag,
                Some(PlatformEvent::MessageCreate(message)) => {
                    self.events.emit(BridgeEvent::Inbound(message));
                }
                Some(PlatformEvent::Disconnected { reason }) => {
                    return Err(abort_login(self.connection.as_ref(), reason).await);
                }
                None => {
                    let reason = "event stream closed before ready".to_string();
                    return Err(abort_login(self.connection.as_ref(), reason).await);
                }
            }
        };

        Ok(ReadyLogin {
            generation: self.generation,
            connection: self.connection,
            events_rx: self.events_rx,
            user_tag,
        })
    }
}

/// A session that reported ready but is not installed yet.
pub struct ReadyLogin {
    generation: u64,
    connection: Box<dyn PlatformConnection>,
    events_rx: mpsc::UnboundedReceiver<PlatformEvent>,
    user_tag: String,
}

impl ReadyLogin {
    /// Discard the session.
    pub async fn logout(self) {
        self.connection.logout().await;
    }
}

async fn abort_login(connection: &dyn PlatformConnection, reason: String) -> BridgeError {
    error!("Login error: {}", reason);
    connection.logout().await;
    BridgeError::Authentication(DiscordError::GatewayClosed { reason })
}

/// Manages one outbound connection and one send path.
pub struct BridgeController {
    platform: Arc<dyn ChatPlatform>,
    link: Option<Link>,
    generation: u64,
    events: EventSource<BridgeEvent>,
    state_tx: watch::Sender<ConnectionState>,
}

impl BridgeController {
    pub fn new(platform: Arc<dyn ChatPlatform>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            platform,
            link: None,
            generation: 0,
            events: EventSource::new(MESSAGE_CREATE, DEFAULT_CAPACITY),
            state_tx,
        }
    }

    /// Attach to inbound messages and connection drops.
    pub fn subscribe(&self) -> Subscription<BridgeEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> ConnectionState {
        self.state_tx.borrow().clone()
    }

    fn set_state(&self, state: ConnectionState) {
        debug!("Bridge state: {}", state);
        self.state_tx.send_replace(state);
    }

    /// Log in with `settings.bot_token`. Any previous connection is logged
    /// out first.
    ///
    /// Returns once the platform accepted the token. The session is not
    /// usable until [`PendingLogin::ready`] resolves and the result is handed
    /// to [`BridgeController::finish_connect`].
    pub async fn begin_connect(&mut self, settings: &BridgeSettings) -> BridgeResult<PendingLogin> {
        info!("Setting up Discord bot...");
        self.disconnect().await;

        if settings.bot_token.trim().is_empty() {
            warn!("Bot token is not configured, not connecting");
            return Err(BridgeError::MissingToken);
        }

        self.generation += 1;
        self.set_state(ConnectionState::Connecting);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        match self.platform.login(&settings.bot_token, events_tx).await {
            Ok(connection) => Ok(PendingLogin {
                generation: self.generation,
                connection,
                events_rx,
                events: self.events.clone(),
            }),
            Err(e) => {
                error!("Login error: {}", e);
                self.set_state(ConnectionState::Disconnected);
                Err(BridgeError::Authentication(e))
            }
        }
    }

    /// Install a ready session and resolve `channel_id` from its cache.
    ///
    /// A missing channel is not an error: the connection stays up and
    /// relaying becomes a no-op. A session from a superseded attempt is
    /// logged out.
    pub async fn finish_connect(
        &mut self,
        login: BridgeResult<ReadyLogin>,
        channel_id: &str,
    ) -> BridgeResult<ConnectOutcome> {
        let ready = match login {
            Ok(ready) if ready.generation == self.generation && self.link.is_none() => ready,
            Ok(stale) => {
                debug!("Dropping session of superseded connect {}", stale.generation);
                stale.logout().await;
                return Err(BridgeError::Cancelled);
            }
            Err(e) => {
                if self.link.is_none() {
                    self.set_state(ConnectionState::Disconnected);
                }
                return Err(e);
            }
        };

        info!("Login successful");
        info!("Logged in as {}!", ready.user_tag);

        let channel = ready.connection.channel(channel_id);
        match &channel {
            Some(channel) => info!("Discord channel found and set up. (#{})", channel.name),
            None => warn!("Specified Discord channel not found! ({})", channel_id),
        }

        let dispatcher = tokio::spawn(dispatch(
            ready.generation,
            ready.events_rx,
            self.events.clone(),
        ));
        self.link = Some(Link {
            generation: ready.generation,
            connection: ready.connection,
            channel: channel.clone(),
            dispatcher,
        });
        self.set_state(ConnectionState::Connected {
            channel: channel.clone(),
        });

        Ok(ConnectOutcome {
            user_tag: ready.user_tag,
            channel,
        })
    }

    /// Send `text` to the configured channel as a single message.
    ///
    /// Without a resolved channel this logs and returns without touching
    /// the platform. Failures are terminal for the message.
    pub async fn relay_outbound(&self, text: &str) -> BridgeResult<MessageReceipt> {
        let Some((link, channel)) = self
            .link
            .as_ref()
            .and_then(|link| link.channel.as_ref().map(|channel| (link, channel)))
        else {
            warn!("Discord channel not set up");
            return Err(BridgeError::ChannelNotSet);
        };

        match link.connection.send(channel, text).await {
            Ok(receipt) => {
                info!("Message sent to Discord successfully");
                debug!("Host -> Discord [#{}]: {}", channel.name, text);
                Ok(receipt)
            }
            Err(e) => {
                error!("Error sending message to Discord: {}", e);
                Err(BridgeError::Delivery(e))
            }
        }
    }

    /// Mark the connection of `generation` as dropped.
    ///
    /// Returns `false` for a stale generation.
    pub fn handle_disconnect(&mut self, generation: u64) -> bool {
        match &self.link {
            Some(link) if link.generation == generation => {
                self.link = None;
                self.set_state(ConnectionState::Disconnected);
                true
            }
            _ => {
                debug!("Ignoring disconnect of stale connection {}", generation);
                false
            }
        }
    }

    /// Log out and stop dispatching inbound events.
    pub async fn disconnect(&mut self) {
        if let Some(link) = self.link.take() {
            link.dispatcher.abort();
            link.connection.logout().await;
            self.set_state(ConnectionState::Disconnected);
            info!("Disconnected from Discord");
        }
    }
}

/// Forward platform events of one connection to the controller's subscribers.
async fn dispatch(
    generation: u64,
    mut events_rx: mpsc::UnboundedReceiver<PlatformEvent>,
    events: EventSource<BridgeEvent>,
) {
    while let Some(event) = events_rx.recv().await {
        match event {
            PlatformEvent::MessageCreate(message) => {
                events.emit(BridgeEvent::Inbound(message));
            }
            PlatformEvent::Ready { user_tag } => {
                debug!("Discord session ready again as {}", user_tag);
            }
            PlatformEvent::Disconnected { reason } => {
                warn!("Discord connection lost: {}", reason);
                events.emit(BridgeEvent::Disconnected { generation, reason });
                return;
            }
        }
    }

    events.emit(BridgeEvent::Disconnected {
        generation,
        reason: "event stream closed".to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::mock::MockPlatform;
    use tokio_test::{assert_err, assert_ok};

    fn settings(token: &str, channel_id: &str) -> BridgeSettings {
        BridgeSettings {
            bot_token: token.to_string(),
            channel_id: channel_id.to_string(),
        }
    }

    /// Login, wait for ready and install the session in one go.
    async fn connect(
        controller: &mut BridgeController,
        settings: &BridgeSettings,
    ) -> BridgeResult<ConnectOutcome> {
        let login = controller.begin_connect(settings).await?;
        let (_cancel, cancel_rx) = oneshot::channel();
        let ready = login.ready(cancel_rx).await;
        controller.finish_connect(ready, &settings.channel_id).await
    }

    #[tokio::test]
    async fn test_connect_resolves_channel_and_relays() {
        let platform = MockPlatform::with_channel("C");
        let mut controller = BridgeController::new(Arc::new(platform.clone()));

        let outcome = assert_ok!(connect(&mut controller, &settings("T", "C")).await);
        assert_eq!(outcome.channel.as_ref().map(|c| c.id.as_str()), Some("C"));
        assert_eq!(controller.state().channel().map(|c| c.id.as_str()), Some("C"));

        assert_ok!(controller.relay_outbound("hi").await);
        assert_eq!(platform.sent(), vec![("C".to_string(), "hi".to_string())]);
    }

    #[tokio::test]
    async fn test_missing_channel_is_not_fatal() {
        let platform = MockPlatform::new();
        let mut controller = BridgeController::new(Arc::new(platform.clone()));

        let outcome = assert_ok!(connect(&mut controller, &settings("T", "C")).await);
        assert!(outcome.channel.is_none());
        assert_eq!(controller.state(), ConnectionState::Connected { channel: None });

        let result = controller.relay_outbound("hi").await;
        assert!(matches!(result, Err(BridgeError::ChannelNotSet)));
        assert!(platform.sent().is_empty());
    }

    #[tokio::test]
    async fn test_relay_before_connect_is_noop() {
        let platform = MockPlatform::with_channel("C");
        let controller = BridgeController::new(Arc::new(platform.clone()));

        assert!(matches!(
            controller.relay_outbound("hi").await,
            Err(BridgeError::ChannelNotSet)
        ));
        assert!(platform.sent().is_empty());
        assert_eq!(platform.logins(), 0);
    }

    #[tokio::test]
    async fn test_rejected_login_leaves_disconnected() {
        let platform = MockPlatform::with_channel("C");
        platform.reject_login(true);
        let mut controller = BridgeController::new(Arc::new(platform.clone()));

        let result = connect(&mut controller, &settings("bad", "C")).await;
        assert!(matches!(result, Err(BridgeError::Authentication(_))));
        assert_eq!(controller.state(), ConnectionState::Disconnected);
        assert_err!(controller.relay_outbound("hi").await);
    }

    #[tokio::test]
    async fn test_gateway_failure_before_ready() {
        let platform = MockPlatform::with_channel("C");
        platform.withhold_ready(true);
        let mut controller = BridgeController::new(Arc::new(platform.clone()));

        let result = connect(&mut controller, &settings("bad", "C")).await;
        assert!(matches!(result, Err(BridgeError::Authentication(_))));
        assert_eq!(platform.logouts(), 1);
        assert_eq!(controller.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_empty_token_skips_login() {
        let platform = MockPlatform::with_channel("C");
        let mut controller = BridgeController::new(Arc::new(platform.clone()));

        let result = connect(&mut controller, &settings("", "C")).await;
        assert!(matches!(result, Err(BridgeError::MissingToken)));
        assert_eq!(platform.logins(), 0);
    }

    #[tokio::test]
    async fn test_send_failure_is_reported() {
        let platform = MockPlatform::with_channel("C");
        let mut controller = BridgeController::new(Arc::new(platform.clone()));
        assert_ok!(connect(&mut controller, &settings("T", "C")).await);

        platform.fail_send(true);
        assert!(matches!(
            controller.relay_outbound("hi").await,
            Err(BridgeError::Delivery(_))
        ));
        assert!(platform.sent().is_empty());
    }

    #[tokio::test]
    async fn test_reconnect_replaces_previous_connection() {
        let platform = MockPlatform::with_channel("C");
        let mut controller = BridgeController::new(Arc::new(platform.clone()));

        assert_ok!(connect(&mut controller, &settings("T", "C")).await);
        assert_ok!(connect(&mut controller, &settings("T", "C")).await);

        assert_eq!(platform.logins(), 2);
        assert_eq!(platform.logouts(), 1);
    }

    #[tokio::test]
    async fn test_inbound_messages_are_published() {
        let platform = MockPlatform::with_channel("C");
        let mut controller = BridgeController::new(Arc::new(platform.clone()));
        let mut events = controller.subscribe();
        assert_ok!(connect(&mut controller, &settings("T", "C")).await);

        platform.inject_message("C", "Zed", false, "yo");

        match events.recv().await {
            Some(BridgeEvent::Inbound(message)) => {
                assert_eq!(message.author.username, "Zed");
                assert_eq!(message.content, "yo");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_disconnect_event_and_stale_generation() {
        let platform = MockPlatform::with_channel("C");
        let mut controller = BridgeController::new(Arc::new(platform.clone()));
        let mut events = controller.subscribe();
        assert_ok!(connect(&mut controller, &settings("T", "C")).await);

        platform.inject(PlatformEvent::Disconnected {
            reason: "reset".to_string(),
        });

        let generation = match events.recv().await {
            Some(BridgeEvent::Disconnected { generation, .. }) => generation,
            other => panic!("unexpected event: {:?}", other),
        };
        assert!(!controller.handle_disconnect(generation + 1));
        assert!(controller.state().is_connected());

        assert!(controller.handle_disconnect(generation));
        assert_eq!(controller.state(), ConnectionState::Disconnected);
        assert!(matches!(
            controller.relay_outbound("hi").await,
            Err(BridgeError::ChannelNotSet)
        ));
    }

    #[tokio::test]
    async fn test_disconnect_resets_state() {
        let platform = MockPlatform::with_channel("C");
        let mut controller = BridgeController::new(Arc::new(platform.clone()));

        assert_ok!(connect(&mut controller, &settings("T", "C")).await);
        assert!(controller.state().is_connected());

        controller.disconnect().await;
        assert_eq!(controller.state(), ConnectionState::Disconnected);
        assert_eq!(platform.logouts(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_login_logs_out() {
        let platform = MockPlatform::with_channel("C");
        platform.stall_ready(true);
        let mut controller = BridgeController::new(Arc::new(platform.clone()));

        let login = assert_ok!(controller.begin_connect(&settings("T", "C")).await);
        assert_eq!(controller.state(), ConnectionState::Connecting);

        let (cancel, cancel_rx) = oneshot::channel();
        let waiting = tokio::spawn(login.ready(cancel_rx));
        assert_ok!(cancel.send(()));

        let ready = assert_ok!(waiting.await);
        assert!(matches!(ready, Err(BridgeError::Cancelled)));
        assert_eq!(platform.logouts(), 1);

        let result = controller.finish_connect(ready, "C").await;
        assert!(matches!(result, Err(BridgeError::Cancelled)));
        assert_eq!(controller.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_superseded_session_is_dropped() {
        let platform = MockPlatform::with_channel("C");
        let mut controller = BridgeController::new(Arc::new(platform.clone()));

        let first = assert_ok!(controller.begin_connect(&settings("T", "C")).await);
        let (_cancel_first, cancel_rx) = oneshot::channel();
        let first_ready = first.ready(cancel_rx).await;

        assert_ok!(connect(&mut controller, &settings("T", "C")).await);

        let result = controller.finish_connect(first_ready, "C").await;
        assert!(matches!(result, Err(BridgeError::Cancelled)));
        assert_eq!(platform.logouts(), 1);
        assert!(controller.state().is_connected());
    }
}
