//! Host adapter.
//!
//! Translates host "message sent" events into controller relays, posts
//! inbound Discord messages into the host, owns the settings panel and
//! re-establishes dropped connections.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::bridge::controller::{BridgeController, ConnectOutcome, ReadyLogin};
use crate::bridge::filter::{inbound_text, outbound_text};
use crate::bridge::state::ConnectionState;
use crate::common::error::{BridgeError, BridgeResult};
use crate::common::reconnect::Backoff;
use crate::common::{BridgeEvent, HostMessage, InboundMessage, ReconnectPolicy};
use crate::config::validate::collect_problems;
use crate::config::{FieldView, SettingsField, SettingsPanel};
use crate::host::{EventSource, HostContext, Subscription};

/// Requests sent to the adapter loop.
enum AdapterCommand {
    Edit {
        field: SettingsField,
        value: String,
    },
    Connect {
        reply: oneshot::Sender<BridgeResult<ConnectOutcome>>,
    },
    Fields {
        reply: oneshot::Sender<Vec<FieldView>>,
    },
    Status {
        reply: oneshot::Sender<ConnectionState>,
    },
    Shutdown,
}

/// Cloneable handle used by the configuration surface.
#[derive(Clone)]
pub struct AdapterHandle {
    tx: mpsc::UnboundedSender<AdapterCommand>,
}

impl AdapterHandle {
    fn send(&self, command: AdapterCommand) -> BridgeResult<()> {
        self.tx.send(command).map_err(|_| BridgeError::AdapterClosed)
    }

    /// Bot Token input changed.
    pub fn edit_bot_token(&self, value: impl Into<String>) -> BridgeResult<()> {
        self.send(AdapterCommand::Edit {
            field: SettingsField::BotToken,
            value: value.into(),
        })
    }

    /// Channel ID input changed.
    pub fn edit_channel_id(&self, value: impl Into<String>) -> BridgeResult<()> {
        self.send(AdapterCommand::Edit {
            field: SettingsField::ChannelId,
            value: value.into(),
        })
    }

    /// Connect action. Resolves once the attempt finished.
    pub async fn connect(&self) -> BridgeResult<ConnectOutcome> {
        let (reply, rx) = oneshot::channel();
        self.send(AdapterCommand::Connect { reply })?;
        rx.await.map_err(|_| BridgeError::AdapterClosed)?
    }

    /// Current state of the settings fields, secrets masked.
    pub async fn fields(&self) -> BridgeResult<Vec<FieldView>> {
        let (reply, rx) = oneshot::channel();
        self.send(AdapterCommand::Fields { reply })?;
        rx.await.map_err(|_| BridgeError::AdapterClosed)
    }

    /// Current connection state.
    pub async fn status(&self) -> BridgeResult<ConnectionState> {
        let (reply, rx) = oneshot::channel();
        self.send(AdapterCommand::Status { reply })?;
        rx.await.map_err(|_| BridgeError::AdapterClosed)
    }

    /// Stop the adapter loop.
    pub fn shutdown(&self) {
        if self.send(AdapterCommand::Shutdown).is_err() {
            debug!("Adapter already stopped");
        }
    }
}

type ConnectReply = oneshot::Sender<BridgeResult<ConnectOutcome>>;

/// Reconnect bookkeeping for one outage.
struct Reconnect {
    backoff: Backoff,
    at: Instant,
}

/// A connect attempt waiting for the session to become ready.
struct PendingConnect {
    task: JoinHandle<BridgeResult<ReadyLogin>>,
    cancel: oneshot::Sender<()>,
    reply: Option<ConnectReply>,
    reconnect: Option<Reconnect>,
}

/// Glue between the host and the bridge controller.
pub struct HostAdapter {
    controller: BridgeController,
    panel: SettingsPanel,
    host: Arc<dyn HostContext>,
    host_events: Subscription<HostMessage>,
    bridge_events: Subscription<BridgeEvent>,
    commands: mpsc::UnboundedReceiver<AdapterCommand>,
    policy: ReconnectPolicy,
    reconnect: Option<Reconnect>,
    pending: Option<PendingConnect>,
}

impl HostAdapter {
    /// Attach to the host's message events and the controller's inbound
    /// events. Both subscriptions live until [`HostAdapter::run`] returns.
    pub fn new(
        controller: BridgeController,
        panel: SettingsPanel,
        host: Arc<dyn HostContext>,
        host_events: &EventSource<HostMessage>,
        policy: ReconnectPolicy,
    ) -> (Self, AdapterHandle) {
        let (tx, commands) = mpsc::unbounded_channel();
        let adapter = Self {
            host_events: host_events.subscribe(),
            bridge_events: controller.subscribe(),
            controller,
            panel,
            host,
            commands,
            policy,
            reconnect: None,
            pending: None,
        };
        (adapter, AdapterHandle { tx })
    }

    /// Process events until shutdown, then tear down.
    pub async fn run(mut self) {
        info!("Discord Chatter extension loaded");

        loop {
            let reconnect_at = self.reconnect.as_ref().map(|r| r.at);

            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(AdapterCommand::Shutdown) | None => {
                        info!("Shutdown requested, stopping bridge adapter");
                        break;
                    }
                    Some(command) => self.handle_command(command).await,
                },

                message = self.host_events.recv() => match message {
                    Some(message) => self.handle_host_message(&message).await,
                    None => {
                        warn!("Host event source closed");
                        break;
                    }
                },

                event = self.bridge_events.recv() => match event {
                    Some(BridgeEvent::Inbound(message)) => self.handle_inbound(&message),
                    Some(BridgeEvent::Disconnected { generation, reason }) => {
                        if self.controller.handle_disconnect(generation) {
                            self.schedule_reconnect(&reason);
                        }
                    }
                    None => {
                        warn!("Bridge event source closed");
                        break;
                    }
                },

                login = wait_ready(&mut self.pending) => self.finish_pending(login).await,

                _ = wait_until(reconnect_at) => self.attempt_reconnect().await,
            }
        }

        self.teardown().await;
    }

    async fn handle_command(&mut self, command: AdapterCommand) {
        match command {
            AdapterCommand::Edit { field, value } => {
                debug!("{} edited", field.label());
                self.panel.edit(field, value);
            }
            AdapterCommand::Connect { reply } => {
                // A manual connect supersedes any pending reconnect.
                self.reconnect = None;
                self.cancel_pending().await;
                self.start_connect(Some(reply), None).await;
            }
            AdapterCommand::Fields { reply } => {
                if reply.send(self.panel.fields()).is_err() {
                    debug!("Fields requester went away");
                }
            }
            AdapterCommand::Status { reply } => {
                if reply.send(self.controller.state()).is_err() {
                    debug!("Status requester went away");
                }
            }
            AdapterCommand::Shutdown => {}
        }
    }

    /// Log in and leave the wait for ready to the event loop.
    async fn start_connect(&mut self, reply: Option<ConnectReply>, reconnect: Option<Reconnect>) {
        let settings = self.panel.settings().clone();
        for problem in collect_problems(&settings) {
            warn!("Settings problem: {}", problem);
        }

        match self.controller.begin_connect(&settings).await {
            Ok(login) => {
                let (cancel, cancel_rx) = oneshot::channel();
                self.pending = Some(PendingConnect {
                    task: tokio::spawn(login.ready(cancel_rx)),
                    cancel,
                    reply,
                    reconnect,
                });
            }
            Err(e) => self.connect_finished(Err(e), reply, reconnect),
        }
    }

    async fn finish_pending(&mut self, login: BridgeResult<ReadyLogin>) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        let channel_id = self.panel.settings().channel_id.clone();
        let result = self.controller.finish_connect(login, &channel_id).await;
        self.connect_finished(result, pending.reply, pending.reconnect);
    }

    /// Abandon a connect that is still waiting for ready.
    async fn cancel_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.cancel.send(()).is_err() {
            debug!("Connect attempt already finished");
        }

        let login = match pending.task.await {
            Ok(Ok(ready)) => {
                ready.logout().await;
                Err(BridgeError::Cancelled)
            }
            Ok(Err(e)) => Err(e),
            Err(e) => {
                warn!("Connect task failed: {}", e);
                Err(BridgeError::Cancelled)
            }
        };
        let channel_id = self.panel.settings().channel_id.clone();
        let result = self.controller.finish_connect(login, &channel_id).await;
        self.connect_finished(result, pending.reply, None);
    }

    fn connect_finished(
        &mut self,
        result: BridgeResult<ConnectOutcome>,
        reply: Option<ConnectReply>,
        reconnect: Option<Reconnect>,
    ) {
        if let Some(mut reconnect) = reconnect {
            match &result {
                Ok(_) => info!("Reconnected to Discord"),
                Err(e) => match reconnect.backoff.next() {
                    Some(delay) => {
                        warn!("Reconnect failed: {}. Retrying in {:.1}s...", e, delay.as_secs_f64());
                        reconnect.at = Instant::now() + delay;
                        self.reconnect = Some(reconnect);
                    }
                    None => warn!("Reconnect failed: {}. Giving up", e),
                },
            }
        }

        if let Some(reply) = reply {
            if reply.send(result).is_err() {
                debug!("Connect requester went away");
            }
        }
    }

    async fn handle_host_message(&self, message: &HostMessage) {
        let Some(text) = outbound_text(message) else {
            return;
        };

        if let Err(e) = self.controller.relay_outbound(&text).await {
            debug!("Outbound message dropped: {}", e);
        }
    }

    fn handle_inbound(&self, message: &InboundMessage) {
        let Some(text) = inbound_text(message, &self.panel.settings().channel_id) else {
            return;
        };

        info!("Message received from Discord: {}", message.content);
        self.host.send_system_message(&text);
    }

    fn schedule_reconnect(&mut self, reason: &str) {
        let mut backoff = self.policy.backoff();
        match backoff.next() {
            Some(delay) => {
                warn!(
                    "Discord disconnected ({}). Reconnecting in {:.1}s...",
                    reason,
                    delay.as_secs_f64()
                );
                self.reconnect = Some(Reconnect {
                    backoff,
                    at: Instant::now() + delay,
                });
            }
            None => warn!("Discord disconnected ({}), reconnect disabled", reason),
        }
    }

    async fn attempt_reconnect(&mut self) {
        let Some(reconnect) = self.reconnect.take() else {
            return;
        };

        info!("Reconnecting to Discord...");
        self.start_connect(None, Some(reconnect)).await;
    }

    async fn teardown(mut self) {
        self.cancel_pending().await;
        self.controller.disconnect().await;
        self.panel.close().await;
        debug!("Bridge adapter stopped");
    }
}

/// Wait for the pending connect to see ready, or forever without one.
async fn wait_ready(pending: &mut Option<PendingConnect>) -> BridgeResult<ReadyLogin> {
    let Some(pending) = pending else {
        return std::future::pending().await;
    };

    match (&mut pending.task).await {
        Ok(login) => login,
        Err(e) => {
            warn!("Connect task failed: {}", e);
            Err(BridgeError::Cancelled)
        }
    }
}

/// Sleep until `deadline`, or forever without one.
async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
