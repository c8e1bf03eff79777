//! Relay filters and message formatting.
//!
//! Decides which messages cross the bridge in each direction and what text
//! they carry. No escaping, truncation or markdown translation is applied.

use crate::common::{HostMessage, InboundMessage};

/// Platform name used when posting Discord messages into the host.
pub const PLATFORM_NAME: &str = "Discord";

/// Text to send to Discord for a host message, if it should be relayed.
///
/// Only conversational turns of the other party are relayed: the body must
/// be non-empty and the message neither a system message nor authored by
/// the local user.
pub fn outbound_text(message: &HostMessage) -> Option<String> {
    if message.mes.is_empty() || message.is_system || message.is_user {
        return None;
    }
    Some(format!("{}: {}", message.name, message.mes))
}

/// Text to post into the host for a Discord message, if it should be relayed.
///
/// The message must come from `channel_id` and from a human author.
pub fn inbound_text(message: &InboundMessage, channel_id: &str) -> Option<String> {
    if message.channel_id != channel_id || message.author.bot {
        return None;
    }
    Some(format!(
        "{} user {}: {}",
        PLATFORM_NAME, message.author.username, message.content
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Author;

    fn host(name: &str, mes: &str, is_system: bool, is_user: bool) -> HostMessage {
        HostMessage {
            name: name.to_string(),
            mes: mes.to_string(),
            is_system,
            is_user,
        }
    }

    fn inbound(channel_id: &str, username: &str, bot: bool, content: &str) -> InboundMessage {
        InboundMessage {
            channel_id: channel_id.to_string(),
            author: Author {
                username: username.to_string(),
                bot,
            },
            content: content.to_string(),
        }
    }

    #[test]
    fn test_character_message_relayed() {
        assert_eq!(
            outbound_text(&host("Alice", "hello", false, false)),
            Some("Alice: hello".to_string())
        );
    }

    #[test]
    fn test_user_message_not_relayed() {
        assert_eq!(outbound_text(&host("Bob", "hi", false, true)), None);
    }

    #[test]
    fn test_system_message_not_relayed() {
        assert_eq!(outbound_text(&host("System", "note", true, false)), None);
    }

    #[test]
    fn test_empty_body_not_relayed() {
        assert_eq!(outbound_text(&host("Alice", "", false, false)), None);
    }

    #[test]
    fn test_outbound_text_is_not_escaped() {
        assert_eq!(
            outbound_text(&host("A*l", "**bold** <@123>", false, false)),
            Some("A*l: **bold** <@123>".to_string())
        );
    }

    #[test]
    fn test_inbound_from_configured_channel() {
        assert_eq!(
            inbound_text(&inbound("C", "Zed", false, "yo"), "C"),
            Some("Discord user Zed: yo".to_string())
        );
    }

    #[test]
    fn test_inbound_from_bot_ignored() {
        assert_eq!(inbound_text(&inbound("C", "Zed", true, "yo"), "C"), None);
    }

    #[test]
    fn test_inbound_from_other_channel_ignored() {
        assert_eq!(inbound_text(&inbound("D", "Zed", false, "yo"), "C"), None);
    }

    #[test]
    fn test_inbound_with_unconfigured_channel_ignored() {
        assert_eq!(inbound_text(&inbound("C", "Zed", false, "yo"), ""), None);
    }
}
