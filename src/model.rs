//! Data model: channel records, message records, and message ids.
//!
//! These types are the Rust-side mirror of the Redis hash layouts described
//! in the key-space schema. They never touch the network themselves; the
//! [`crate::engine`] module is responsible for moving bytes in and out of
//! Redis and handing back these typed values.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, EngineResult};

/// 4 years, in seconds. `msg_ttl == 0` is normalized to this.
pub const DEFAULT_MESSAGE_TTL_SECS: i64 = 126_144_000;

/// Payloads at or above this size are broadcast by reference (`msgkey`)
/// rather than inline (`msg`).
pub const INLINE_BROADCAST_THRESHOLD_BYTES: usize = 5 * 1024;

/// A channel's opaque identifier. Any byte string is legal; this crate
/// treats it as UTF-8 for key formatting, matching every caller observed in
/// the reference implementation.
pub type ChannelId = String;

/// `(time, tag)` message identifier. `tag` breaks ties among messages
/// published within the same second. Textual form is `"{time}:{tag}"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct MessageId {
    /// Unix seconds at publish time.
    pub time: u64,
    /// Tie-breaker within `time`.
    pub tag: u64,
}

impl MessageId {
    /// The zero id, used to represent "no predecessor".
    pub const NONE: MessageId = MessageId { time: 0, tag: 0 };

    /// True if this is the sentinel "no predecessor" id.
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.time, self.tag)
    }
}

impl FromStr for MessageId {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (time, tag) = s.split_once(':').ok_or_else(|| EngineError::InvalidArgument {
            name: "message_id",
            reason: format!("'{s}' is not in 'time:tag' form"),
        })?;
        let time = time.parse().map_err(|_| EngineError::InvalidArgument {
            name: "message_id.time",
            reason: format!("'{time}' is not a u64"),
        })?;
        let tag = tag.parse().map_err(|_| EngineError::InvalidArgument {
            name: "message_id.tag",
            reason: format!("'{tag}' is not a u64"),
        })?;
        Ok(MessageId { time, tag })
    }
}

/// Snapshot of a channel's metadata hash (`channel:{id}`).
///
/// Every field mirrors a hash field in the key-space schema (§4.a). Fields
/// absent from the hash deserialize as `None`/`0`, matching the Lua
/// reference's liberal `tonumber(x) or 0` coercion, but parsed strictly at
/// this boundary per the "numeric coercion" design note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelRecord {
    /// Seconds a channel's keys live for without a refreshing operation.
    pub ttl: i64,
    /// Unix seconds of the last publish.
    pub time: u64,
    /// Unix seconds this channel was last touched by any operation.
    pub time_last_seen: u64,
    /// Count of real (non-fake) subscribers.
    pub subscribers: i64,
    /// Test/inflation counter; when present it replaces `subscribers` in
    /// outward-facing results.
    pub fake_subscribers: Option<i64>,
    /// Most recently published message id, if any.
    pub current_message: Option<MessageId>,
    /// Second most recently published message id, if any.
    pub prev_message: Option<MessageId>,
    /// Ring buffer capacity: `< 0` unbounded, `0` unbuffered, `> 0` capped.
    pub max_stored_messages: Option<i64>,
    /// Monotonic counter used to mint new subscriber ids.
    pub last_subscriber_id: i64,
}

impl ChannelRecord {
    /// The subscriber count a caller should see: `fake_subscribers` when
    /// set, otherwise the real count.
    pub fn effective_subscribers(&self) -> i64 {
        self.fake_subscribers.unwrap_or(self.subscribers)
    }

    /// Parse a channel hash as returned by `HGETALL`.
    pub fn from_hash(fields: &HashMap<String, String>) -> EngineResult<Self> {
        Ok(ChannelRecord {
            ttl: parse_or_zero(fields.get("ttl")),
            time: parse_or_zero(fields.get("time")),
            time_last_seen: parse_or_zero(fields.get("time_last_seen")),
            subscribers: parse_or_zero(fields.get("subscribers")),
            fake_subscribers: fields.get("fake_subscribers").and_then(|v| v.parse().ok()),
            current_message: fields
                .get("current_message")
                .map(|v| v.parse())
                .transpose()?,
            prev_message: fields.get("prev_message").map(|v| v.parse()).transpose()?,
            max_stored_messages: fields
                .get("max_stored_messages")
                .and_then(|v| v.parse().ok()),
            last_subscriber_id: parse_or_zero(fields.get("last_subscriber_id")),
        })
    }

    /// True if the hash had no fields at all (channel does not exist).
    pub fn is_empty(fields: &HashMap<String, String>) -> bool {
        fields.is_empty()
    }
}

/// Snapshot of a message record hash (`channel:msg:{msgid}:{id}`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageRecord {
    /// This message's own id.
    pub id: MessageId,
    /// Predecessor id components; `0:0` if none.
    pub prev: MessageId,
    /// Successor id, if a later message has been published.
    pub next: Option<MessageId>,
    /// Payload bytes.
    pub data: Vec<u8>,
    /// Content type; never contains `:`.
    pub content_type: Vec<u8>,
    /// EventSource `event:` field, if any.
    pub eventsource_event: Vec<u8>,
    /// Remaining TTL in seconds as reported by the store at read time.
    pub ttl: i64,
    /// True if this record was written as a transient (unbuffered) publish.
    pub unbuffered: bool,
}

fn parse_or_zero<T: Default + std::str::FromStr>(v: Option<&String>) -> T {
    v.and_then(|s| s.parse().ok()).unwrap_or_default()
}

/// The `{ttl, time, subscribers_effective, message_count}` tuple returned
/// alongside `publish` and by `find_channel` (§4.b, §E.0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelSnapshot {
    /// Seconds remaining on the channel's shared TTL.
    pub ttl: i64,
    /// Unix seconds of the last publish (or `time_last_seen` for
    /// `find_channel`).
    pub time: u64,
    /// Real or fake subscriber count, whichever is set.
    pub subscribers_effective: i64,
    /// Current length of the message list.
    pub message_count: i64,
}

/// Result of a `publish` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOutcome {
    /// The new message's id.
    pub id: MessageId,
    /// The channel's state immediately after this publish.
    pub channel: ChannelSnapshot,
    /// Whether this publish created the channel.
    pub is_new_channel: bool,
}

/// Snapshot captured by `delete` just before a channel is torn down
/// (§4.i).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSnapshot {
    /// The channel's TTL at the moment of deletion.
    pub ttl: i64,
    /// Unix seconds the channel was last touched.
    pub time_last_seen: u64,
    /// Real subscriber count at the moment of deletion.
    pub subscribers: i64,
    /// Number of messages drained from the list.
    pub message_count: i64,
}

/// Result of `subscriber_register` (§4.e).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberRegistration {
    /// The subscriber's id: echoed back verbatim, or newly minted when the
    /// caller passed `"-"`.
    pub subscriber_id: String,
    /// Total subscribers after this registration.
    pub subscribers_total: i64,
    /// Jittered seconds until the caller should call `channel_keepalive`
    /// again.
    pub next_keepalive_secs: i64,
}

/// Result of `subscriber_unregister` (§4.f).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberUnregistration {
    /// The subscriber id that was removed, echoed back verbatim.
    pub subscriber_id: String,
    /// Total subscribers after this unregistration.
    pub subscribers_total: i64,
}

/// Reader ordering policy when no cursor is supplied (§4.c, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOrder {
    /// Return the newest live message.
    Fifo,
    /// Return the oldest still-live message.
    Filo,
}

impl MessageOrder {
    /// The literal Lua scripts expect on the wire.
    pub fn as_arg(&self) -> &'static str {
        match self {
            MessageOrder::Fifo => "FIFO",
            MessageOrder::Filo => "FILO",
        }
    }
}

/// A `subscriber_register` caller either asks for a freshly minted id or
/// re-registers one it already holds (§4.e).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriberId {
    /// Mint a new id and increment `subscribers`.
    New,
    /// Re-register an already-counted subscriber.
    Existing(String),
}

impl SubscriberId {
    /// The literal Lua scripts expect on the wire (`"-"` for `New`).
    pub fn as_arg(&self) -> &str {
        match self {
            SubscriberId::New => "-",
            SubscriberId::Existing(id) => id,
        }
    }
}

/// Result of `channel_keepalive` (§4.g). The `-1` sentinel is an idempotent
/// no-op (§7 kind 5), not an error, so it gets its own variant rather than
/// a raw `i64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveOutcome {
    /// Seconds until the next keepalive is expected.
    NextKeepaliveSecs(i64),
    /// The channel has no subscribers; let it disappear.
    Disappear,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_id_roundtrips_through_display_and_parse() {
        let id = MessageId { time: 100, tag: 3 };
        let text = id.to_string();
        assert_eq!(text, "100:3");
        assert_eq!(text.parse::<MessageId>().unwrap(), id);
    }

    #[test]
    fn message_id_rejects_malformed_text() {
        assert!("not-an-id".parse::<MessageId>().is_err());
        assert!("100".parse::<MessageId>().is_err());
        assert!("100:abc".parse::<MessageId>().is_err());
    }

    #[test]
    fn message_id_ordering_is_lexicographic_on_time_then_tag() {
        let a = MessageId { time: 100, tag: 5 };
        let b = MessageId { time: 100, tag: 6 };
        let c = MessageId { time: 101, tag: 0 };
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn channel_record_defaults_absent_fields_to_zero() {
        let fields = HashMap::new();
        let record = ChannelRecord::from_hash(&fields).unwrap();
        assert_eq!(record.ttl, 0);
        assert_eq!(record.subscribers, 0);
        assert!(record.current_message.is_none());
    }

    #[test]
    fn channel_record_fake_subscribers_overrides_effective_count() {
        let mut fields = HashMap::new();
        fields.insert("subscribers".to_string(), "2".to_string());
        fields.insert("fake_subscribers".to_string(), "50".to_string());
        let record = ChannelRecord::from_hash(&fields).unwrap();
        assert_eq!(record.effective_subscribers(), 50);
    }
}
