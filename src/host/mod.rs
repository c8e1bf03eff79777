//! Host chat application integration points.
//!
//! The host publishes outgoing chat messages on its "message sent" event
//! source and accepts system messages posted back into its chat.

pub mod console;
pub mod events;

pub use events::{EventSource, Subscription, DEFAULT_CAPACITY};

/// Name of the host's outgoing-message event source.
pub const MESSAGE_SENT: &str = "message_sent";

/// Capabilities the host exposes to the bridge.
pub trait HostContext: Send + Sync {
    /// Post a system message into the host's chat. Fire-and-forget.
    fn send_system_message(&self, text: &str);
}
