//! Key-space schema (§4.a)
//!
//! Every persisted key lives under the `channel:` namespace. Centralizing
//! the formatting here means a key's shape changes in exactly one place
//! rather than being scattered as ad hoc `format!` calls through the engine.

use crate::model::{ChannelId, MessageId};

/// `channel:{id}` — the channel metadata hash.
pub fn channel(channel_id: &ChannelId) -> String {
    format!("channel:{channel_id}")
}

/// `channel:messages:{id}` — the ordered message-id list.
pub fn messages(channel_id: &ChannelId) -> String {
    format!("channel:messages:{channel_id}")
}

/// `channel:msg:{msgid}:{id}` — a single message record.
pub fn message(channel_id: &ChannelId, message_id: MessageId) -> String {
    format!("channel:msg:{message_id}:{channel_id}")
}

/// `channel:subscribers:{id}` — the short-term reply-topic set.
pub fn subscribers(channel_id: &ChannelId) -> String {
    format!("channel:subscribers:{channel_id}")
}

/// `channel:pubsub:{id}` — the broadcast topic.
pub fn pubsub(channel_id: &ChannelId) -> String {
    format!("channel:pubsub:{channel_id}")
}

/// `channel:deleted:{id}` — the post-delete tombstone.
pub fn deleted(channel_id: &ChannelId) -> String {
    format!("channel:deleted:{channel_id}")
}

/// Prefix used by the consistency checker's `SCAN MATCH` over channel
/// metadata hashes (excludes `channel:messages:*`, `channel:msg:*`,
/// `channel:subscribers:*`, `channel:pubsub:*`, `channel:deleted:*`, which
/// all share the `channel:` prefix but are not channel hashes themselves).
pub const CHANNEL_SCAN_PATTERN: &str = "channel:*";

/// Prefix for orphan-scanning message records.
pub const MESSAGE_SCAN_PATTERN: &str = "channel:msg:*";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_match_the_documented_schema() {
        let id = "c1".to_string();
        assert_eq!(channel(&id), "channel:c1");
        assert_eq!(messages(&id), "channel:messages:c1");
        assert_eq!(
            message(&id, MessageId { time: 100, tag: 2 }),
            "channel:msg:100:2:c1"
        );
        assert_eq!(subscribers(&id), "channel:subscribers:c1");
        assert_eq!(pubsub(&id), "channel:pubsub:c1");
        assert_eq!(deleted(&id), "channel:deleted:c1");
    }
}
