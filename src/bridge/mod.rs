//! Bridge between the host chat application and Discord.
//!
//! ## Module Structure
//!
//! - `controller`: the single Discord connection and send path (`BridgeController`)
//! - `adapter`: host event wiring and the settings panel (`HostAdapter`)
//! - `filter`: which messages cross the bridge and their text
//! - `state`: observable connection state (`ConnectionState`)

pub mod adapter;
pub mod controller;
pub mod filter;
pub mod state;

// Re-export main types for convenience
pub use adapter::{AdapterHandle, HostAdapter};
pub use controller::BridgeController;
