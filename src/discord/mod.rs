//! Discord bot integration.
//!
//! This module provides the platform abstraction the bridge talks to and
//! its serenity-backed implementation.

pub mod client;
#[cfg(test)]
pub mod mock;
pub mod platform;

// Re-export main types for external use
pub use client::SerenityPlatform;
