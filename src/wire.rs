//! Broadcast wire format (§6 "Broadcast wire format").
//!
//! Messages published to the broadcast topic and to short-term subscriber
//! reply topics are compact tagged arrays, MessagePack-encoded exactly as
//! the reference implementation's `cmsgpack.pack` calls produced them. This
//! crate uses `rmpv` rather than deriving through `serde` because the four
//! frame shapes are heterogeneous tagged tuples, not a single Rust enum
//! representation serde's data model maps onto directly.

use crate::error::{EngineError, EngineResult};
use crate::model::MessageId;
use rmpv::Value;

/// A decoded or to-be-encoded broadcast frame.
#[derive(Debug, Clone, PartialEq)]
pub enum BroadcastFrame {
    /// Inline message payload (`|data| < 5 KiB`).
    Msg {
        /// Remaining TTL in seconds at publish time.
        ttl: i64,
        /// This message's id.
        id: MessageId,
        /// Predecessor id; `0:0` if none.
        prev: MessageId,
        /// Payload bytes.
        data: Vec<u8>,
        /// Content type bytes.
        content_type: Vec<u8>,
        /// EventSource event name bytes.
        eventsource_event: Vec<u8>,
    },
    /// Reference to a large payload (`|data| >= 5 KiB`); fetch with
    /// [`crate::engine::Engine::get_message_from_key`].
    MsgKey {
        /// This message's id.
        id: MessageId,
        /// The message's storage key.
        message_key: String,
    },
    /// Channel deletion notice.
    Alert {
        /// Channel that was deleted.
        channel_id: String,
    },
}

impl BroadcastFrame {
    /// Encode this frame as a MessagePack tagged array.
    pub fn encode(&self) -> EngineResult<Vec<u8>> {
        let value = match self {
            BroadcastFrame::Msg {
                ttl,
                id,
                prev,
                data,
                content_type,
                eventsource_event,
            } => Value::Array(vec![
                Value::from("msg"),
                Value::from(*ttl),
                Value::from(id.time),
                Value::from(id.tag),
                Value::from(prev.time),
                Value::from(prev.tag),
                Value::Binary(data.clone()),
                Value::Binary(content_type.clone()),
                Value::Binary(eventsource_event.clone()),
            ]),
            BroadcastFrame::MsgKey { id, message_key } => Value::Array(vec![
                Value::from("msgkey"),
                Value::from(id.time),
                Value::from(id.tag),
                Value::from(message_key.as_str()),
            ]),
            BroadcastFrame::Alert { channel_id } => Value::Array(vec![
                Value::from("alert"),
                Value::from("delete channel"),
                Value::from(channel_id.as_str()),
            ]),
        };

        let mut buf = Vec::new();
        rmpv::encode::write_value(&mut buf, &value)?;
        Ok(buf)
    }

    /// Decode a MessagePack tagged array previously produced by
    /// [`Self::encode`].
    pub fn decode(bytes: &[u8]) -> EngineResult<Self> {
        let mut cursor = bytes;
        let value = rmpv::decode::read_value(&mut cursor)?;
        let items = value
            .as_array()
            .ok_or_else(|| EngineError::MalformedFrame("expected top-level array".into()))?;

        let tag = items
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::MalformedFrame("missing frame tag".into()))?;

        match tag {
            "msg" => {
                let get_u64 = |i: usize| -> EngineResult<u64> {
                    items
                        .get(i)
                        .and_then(Value::as_u64)
                        .ok_or_else(|| EngineError::MalformedFrame(format!("msg[{i}] not a u64")))
                };
                let get_bytes = |i: usize| -> EngineResult<Vec<u8>> {
                    Ok(items
                        .get(i)
                        .and_then(Value::as_slice)
                        .map(|s| s.to_vec())
                        .unwrap_or_default())
                };
                Ok(BroadcastFrame::Msg {
                    ttl: items
                        .get(1)
                        .and_then(Value::as_i64)
                        .ok_or_else(|| EngineError::MalformedFrame("msg[1] not an i64".into()))?,
                    id: MessageId {
                        time: get_u64(2)?,
                        tag: get_u64(3)?,
                    },
                    prev: MessageId {
                        time: get_u64(4)?,
                        tag: get_u64(5)?,
                    },
                    data: get_bytes(6)?,
                    content_type: get_bytes(7)?,
                    eventsource_event: get_bytes(8)?,
                })
            }
            "msgkey" => {
                let get_u64 = |i: usize| -> EngineResult<u64> {
                    items
                        .get(i)
                        .and_then(Value::as_u64)
                        .ok_or_else(|| EngineError::MalformedFrame(format!("msgkey[{i}] not a u64")))
                };
                Ok(BroadcastFrame::MsgKey {
                    id: MessageId {
                        time: get_u64(1)?,
                        tag: get_u64(2)?,
                    },
                    message_key: items
                        .get(3)
                        .and_then(Value::as_str)
                        .ok_or_else(|| EngineError::MalformedFrame("msgkey[3] not a string".into()))?
                        .to_string(),
                })
            }
            "alert" => Ok(BroadcastFrame::Alert {
                channel_id: items
                    .get(2)
                    .and_then(Value::as_str)
                    .ok_or_else(|| EngineError::MalformedFrame("alert[2] not a string".into()))?
                    .to_string(),
            }),
            other => Err(EngineError::MalformedFrame(format!(
                "unknown frame tag '{other}'"
            ))),
        }
    }
}

/// Raw ASCII `"status:{code}"`, not tag-wrapped. Used by `publish_status`.
pub fn status_message(code: i64) -> String {
    format!("status:{code}")
}
