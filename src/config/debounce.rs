//! Debounced settings persistence.
//!
//! Edits arrive in bursts (one per keystroke). Each scheduled snapshot
//! restarts the quiet-period timer; only the last snapshot of a burst is
//! written.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::config::store::SettingsStore;
use crate::config::types::BridgeSettings;

/// Quiet period before a burst of edits is written.
pub const SAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Coalescing writer for [`BridgeSettings`].
pub struct DebouncedSave {
    tx: mpsc::UnboundedSender<BridgeSettings>,
    task: JoinHandle<()>,
}

impl DebouncedSave {
    /// Spawn the writer task.
    pub fn spawn(store: Arc<dyn SettingsStore>, key: impl Into<String>, window: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_writer(store, key.into(), window, rx));
        Self { tx, task }
    }

    /// Schedule `settings` for persistence.
    pub fn schedule(&self, settings: BridgeSettings) {
        if let Err(e) = self.tx.send(settings) {
            warn!("Settings writer is gone, edit not persisted: {}", e);
        }
    }

    /// Write any pending snapshot immediately and stop the writer.
    pub async fn flush(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            warn!("Settings writer task panicked: {}", e);
        }
    }
}

async fn run_writer(
    store: Arc<dyn SettingsStore>,
    key: String,
    window: Duration,
    mut rx: mpsc::UnboundedReceiver<BridgeSettings>,
) {
    while let Some(mut pending) = rx.recv().await {
        loop {
            tokio::select! {
                next = rx.recv() => match next {
                    Some(settings) => pending = settings,
                    None => {
                        write(store.as_ref(), &key, &pending);
                        return;
                    }
                },
                _ = sleep(window) => {
                    write(store.as_ref(), &key, &pending);
                    break;
                }
            }
        }
    }
    debug!("Settings writer stopped");
}

fn write(store: &dyn SettingsStore, key: &str, settings: &BridgeSettings) {
    match settings.save_to(store, key) {
        Ok(()) => debug!("Persisted settings {:?}", settings),
        Err(e) => error!("Failed to persist settings: {}", e),
    }
}
