//! The storage and pub/sub engine (§2, components b–j).
//!
//! `Engine` owns a Redis/Valkey connection and one compiled [`redis::Script`]
//! per operation in §6's stable name list (plus `find_channel`, recovered in
//! §E.0). Every public method is one `EVALSHA`/`EVAL` round trip: the host's
//! single-threaded script executor is what makes each operation atomic
//! (§5, §E.5) — this crate adds no client-side locking on top of it.

use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, Script, Value};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::EngineConfig;
use crate::decode::{self, as_array};
use crate::error::{EngineError, EngineResult};
use crate::keys;
use crate::model::{
    ChannelId, ChannelSnapshot, DeleteSnapshot, KeepaliveOutcome, MessageId, MessageOrder,
    MessageRecord, PublishOutcome, SubscriberId, SubscriberRegistration, SubscriberUnregistration,
};
use crate::reader::ReadOutcome;

pub(crate) struct Scripts {
    add_fakesub: Script,
    channel_keepalive: Script,
    delete: Script,
    find_channel: Script,
    get_message: Script,
    get_message_from_key: Script,
    publish: Script,
    publish_status: Script,
    subscriber_register: Script,
    subscriber_unregister: Script,
    check_channel: Script,
}

impl Scripts {
    fn load() -> Self {
        Scripts {
            add_fakesub: Script::new(include_str!("scripts/add_fakesub.lua")),
            channel_keepalive: Script::new(include_str!("scripts/channel_keepalive.lua")),
            delete: Script::new(include_str!("scripts/delete.lua")),
            find_channel: Script::new(include_str!("scripts/find_channel.lua")),
            get_message: Script::new(include_str!("scripts/get_message.lua")),
            get_message_from_key: Script::new(include_str!("scripts/get_message_from_key.lua")),
            publish: Script::new(include_str!("scripts/publish.lua")),
            publish_status: Script::new(include_str!("scripts/publish_status.lua")),
            subscriber_register: Script::new(include_str!("scripts/subscriber_register.lua")),
            subscriber_unregister: Script::new(include_str!("scripts/subscriber_unregister.lua")),
            check_channel: Script::new(include_str!("scripts/check_channel.lua")),
        }
    }
}

/// Handle to the atomic storage and pub/sub engine. Cheap to clone: the
/// underlying connection is shared behind an `Arc<Mutex<_>>`, mirroring the
/// teacher crate's `RedisTransport`.
#[derive(Clone)]
#[allow(missing_debug_implementations)]
pub struct Engine {
    client: Arc<Client>,
    connection: Arc<Mutex<MultiplexedConnection>>,
    config: Arc<EngineConfig>,
    scripts: Arc<Scripts>,
}

impl Engine {
    /// Connect using the given configuration.
    pub async fn new(config: EngineConfig) -> EngineResult<Self> {
        Url::parse(&config.redis_url).map_err(|e| EngineError::InvalidArgument {
            name: "redis_url",
            reason: e.to_string(),
        })?;
        let client = Client::open(config.redis_url.as_str())?;
        let connection = client.get_multiplexed_async_connection().await?;
        Ok(Engine {
            client: Arc::new(client),
            connection: Arc::new(Mutex::new(connection)),
            config: Arc::new(config),
            scripts: Arc::new(Scripts::load()),
        })
    }

    /// This engine's effective configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A fresh connection to the same server, for callers that need their
    /// own (e.g. a consistency-checker `SCAN` cursor, or a test harness
    /// listening on the broadcast topic). Client transport proper is out of
    /// scope for this crate (§1 Non-goals); this exists only so the engine
    /// and its own tests can observe what it publishes.
    pub async fn raw_connection(&self) -> EngineResult<MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    async fn conn(&self) -> tokio::sync::MutexGuard<'_, MultiplexedConnection> {
        self.connection.lock().await
    }

    /// §4.b `publish`.
    #[instrument(skip(self, data, content_type, eventsource_event), fields(channel_id = %channel_id))]
    pub async fn publish(
        &self,
        channel_id: &ChannelId,
        time: u64,
        data: &[u8],
        content_type: &[u8],
        eventsource_event: &[u8],
        msg_ttl: i64,
        max_msg_buf_size: i64,
    ) -> EngineResult<PublishOutcome> {
        if content_type.contains(&b':') {
            return Err(EngineError::InvalidContentType);
        }

        let mut conn = self.conn().await;
        let raw: Value = self
            .scripts
            .publish
            .arg(channel_id.as_str())
            .arg(time)
            .arg(data)
            .arg(content_type)
            .arg(eventsource_event)
            .arg(msg_ttl)
            .arg(max_msg_buf_size)
            .arg(self.config.inline_broadcast_threshold_bytes)
            .invoke_async(&mut *conn)
            .await?;

        let items = as_array(raw)?;
        if items.len() < 3 {
            return Err(EngineError::InvalidArgument {
                name: "script_result",
                reason: "publish returned fewer than 3 elements".to_string(),
            });
        }

        let tag = decode::require_i64(items.first(), "tag")? as u64;
        let channel_items = as_array(items[1].clone())?;
        let channel = ChannelSnapshot {
            ttl: decode::as_i64_or_zero(channel_items.first()),
            time: decode::as_u64_or_zero(channel_items.get(1)),
            subscribers_effective: decode::as_i64_or_zero(channel_items.get(2)),
            message_count: decode::as_i64_or_zero(channel_items.get(3)),
        };
        let is_new_channel = matches!(items.get(2), Some(Value::Int(1)) | Some(Value::Boolean(true)));

        if is_new_channel {
            debug!(channel_id = %channel_id, "channel created on first publish");
        }

        Ok(PublishOutcome {
            id: MessageId { time, tag },
            channel,
            is_new_channel,
        })
    }

    /// §4.c `get_message`. `subscribe_if_current` is accepted for parity
    /// with the reference but has no effect (§4.c "Edge rules").
    #[instrument(skip(self), fields(channel_id = %channel_id))]
    pub async fn get_message(
        &self,
        channel_id: &ChannelId,
        cursor: Option<MessageId>,
        order: MessageOrder,
        create_channel_ttl: i64,
    ) -> EngineResult<ReadOutcome> {
        let (time_arg, tag_arg) = match cursor {
            Some(id) => (id.time as i64, id.tag as i64),
            None => (0, 0),
        };

        let mut conn = self.conn().await;
        let raw: Value = self
            .scripts
            .get_message
            .arg(channel_id.as_str())
            .arg(time_arg)
            .arg(tag_arg)
            .arg(order.as_arg())
            .arg(create_channel_ttl)
            .arg("-")
            .invoke_async(&mut *conn)
            .await?;

        let items = as_array(raw)?;
        let code = decode::require_i64(items.first(), "status_code")?;

        match code {
            404 => Ok(ReadOutcome::NotFound),
            410 => Ok(ReadOutcome::Gone),
            418 => Ok(ReadOutcome::NotYetAvailable {
                subscriber_count: decode::as_i64_or_zero(items.get(5)),
            }),
            200 => {
                let message = MessageRecord {
                    id: MessageId {
                        time: decode::as_u64_or_zero(items.get(2)),
                        tag: decode::as_u64_or_zero(items.get(3)),
                    },
                    prev: MessageId {
                        time: decode::as_u64_or_zero(items.get(4)),
                        tag: decode::as_u64_or_zero(items.get(5)),
                    },
                    next: None,
                    data: decode::as_bytes_or_empty(items.get(6)),
                    content_type: decode::as_bytes_or_empty(items.get(7)),
                    eventsource_event: decode::as_bytes_or_empty(items.get(8)),
                    ttl: decode::as_i64_or_zero(items.get(1)),
                    unbuffered: false,
                };
                Ok(ReadOutcome::Found {
                    message,
                    subscriber_count: decode::as_i64_or_zero(items.get(9)),
                })
            }
            other => {
                warn!(code = other, "get_message returned an unrecognized status code");
                Err(EngineError::InvalidArgument {
                    name: "status_code",
                    reason: format!("unrecognized status code {other}"),
                })
            }
        }
    }

    /// §4.d `get_message_from_key`.
    #[instrument(skip(self))]
    pub async fn get_message_from_key(&self, message_key: &str) -> EngineResult<MessageRecord> {
        let mut conn = self.conn().await;
        let raw: Value = self
            .scripts
            .get_message_from_key
            .key(message_key)
            .invoke_async(&mut *conn)
            .await?;

        let items = as_array(raw)?;
        Ok(MessageRecord {
            id: MessageId {
                time: decode::as_u64_or_zero(items.get(1)),
                tag: decode::as_u64_or_zero(items.get(2)),
            },
            prev: MessageId {
                time: decode::as_u64_or_zero(items.get(3)),
                tag: decode::as_u64_or_zero(items.get(4)),
            },
            next: None,
            data: decode::as_bytes_or_empty(items.get(5)),
            content_type: decode::as_bytes_or_empty(items.get(6)),
            eventsource_event: decode::as_bytes_or_empty(items.get(7)),
            ttl: decode::as_i64_or_zero(items.first()),
            unbuffered: false,
        })
    }

    /// §4.e `subscriber_register`.
    #[instrument(skip(self), fields(channel_id = %channel_id))]
    pub async fn subscriber_register(
        &self,
        channel_id: &ChannelId,
        subscriber_id: SubscriberId,
        active_ttl: i64,
    ) -> EngineResult<SubscriberRegistration> {
        let mut conn = self.conn().await;
        let raw: Value = self
            .scripts
            .subscriber_register
            .arg(channel_id.as_str())
            .arg(subscriber_id.as_arg())
            .arg(active_ttl)
            .invoke_async(&mut *conn)
            .await?;

        let items = as_array(raw)?;
        Ok(SubscriberRegistration {
            subscriber_id: decode::as_string(items.first().ok_or_else(|| {
                EngineError::InvalidArgument {
                    name: "subscriber_id",
                    reason: "missing from script result".to_string(),
                }
            })?)
            .unwrap_or_default(),
            subscribers_total: decode::as_i64_or_zero(items.get(1)),
            next_keepalive_secs: decode::as_i64_or_zero(items.get(2)),
        })
    }

    /// §4.f `subscriber_unregister`.
    #[instrument(skip(self), fields(channel_id = %channel_id))]
    pub async fn subscriber_unregister(
        &self,
        channel_id: &ChannelId,
        subscriber_id: &str,
        empty_ttl: i64,
    ) -> EngineResult<SubscriberUnregistration> {
        let mut conn = self.conn().await;
        let raw: Value = self
            .scripts
            .subscriber_unregister
            .arg(channel_id.as_str())
            .arg(subscriber_id)
            .arg(empty_ttl)
            .invoke_async(&mut *conn)
            .await?;

        let items = as_array(raw)?;
        let subscribers_total = decode::as_i64_or_zero(items.get(1));
        if subscribers_total < 0 {
            return Err(EngineError::SubscriberCountUnderflow {
                channel_id: channel_id.clone(),
                count: subscribers_total,
            });
        }
        Ok(SubscriberUnregistration {
            subscriber_id: decode::as_string(items.first().ok_or_else(|| {
                EngineError::InvalidArgument {
                    name: "subscriber_id",
                    reason: "missing from script result".to_string(),
                }
            })?)
            .unwrap_or_else(|| subscriber_id.to_string()),
            subscribers_total,
        })
    }

    /// §4.g `channel_keepalive`.
    #[instrument(skip(self), fields(channel_id = %channel_id))]
    pub async fn channel_keepalive(
        &self,
        channel_id: &ChannelId,
        ttl: i64,
    ) -> EngineResult<KeepaliveOutcome> {
        let mut conn = self.conn().await;
        let raw: Value = self
            .scripts
            .channel_keepalive
            .arg(channel_id.as_str())
            .arg(ttl)
            .invoke_async(&mut *conn)
            .await?;

        let next = decode::require_i64(Some(&raw), "channel_keepalive_result")?;
        if next < 0 {
            Ok(KeepaliveOutcome::Disappear)
        } else {
            Ok(KeepaliveOutcome::NextKeepaliveSecs(next))
        }
    }

    /// §4.h `publish_status`.
    #[instrument(skip(self), fields(channel_id = %channel_id))]
    pub async fn publish_status(&self, channel_id: &ChannelId, code: i64) -> EngineResult<i64> {
        let mut conn = self.conn().await;
        let raw: Value = self
            .scripts
            .publish_status
            .arg(channel_id.as_str())
            .arg(code)
            .invoke_async(&mut *conn)
            .await?;
        decode::require_i64(Some(&raw), "subscribers")
    }

    /// §4.i `delete`.
    #[instrument(skip(self), fields(channel_id = %channel_id))]
    pub async fn delete(&self, channel_id: &ChannelId) -> EngineResult<Option<DeleteSnapshot>> {
        let mut conn = self.conn().await;
        let raw: Value = self
            .scripts
            .delete
            .arg(channel_id.as_str())
            .invoke_async(&mut *conn)
            .await?;

        if matches!(raw, Value::Nil) {
            return Ok(None);
        }
        let items = as_array(raw)?;
        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(DeleteSnapshot {
            ttl: decode::as_i64_or_zero(items.first()),
            time_last_seen: decode::as_u64_or_zero(items.get(1)),
            subscribers: decode::as_i64_or_zero(items.get(2)),
            message_count: decode::as_i64_or_zero(items.get(3)),
        }))
    }

    /// §4.j `add_fakesub`.
    #[instrument(skip(self), fields(channel_id = %channel_id))]
    pub async fn add_fakesub(&self, channel_id: &ChannelId, delta: i64) -> EngineResult<i64> {
        let mut conn = self.conn().await;
        let raw: Value = self
            .scripts
            .add_fakesub
            .arg(channel_id.as_str())
            .arg(delta)
            .invoke_async(&mut *conn)
            .await?;
        decode::require_i64(Some(&raw), "fake_subscribers")
    }

    /// §E.0 `find_channel`. Read-only: never mutates, never sets a TTL.
    #[instrument(skip(self), fields(channel_id = %channel_id))]
    pub async fn find_channel(&self, channel_id: &ChannelId) -> EngineResult<Option<ChannelSnapshot>> {
        let mut conn = self.conn().await;
        let raw: Value = self
            .scripts
            .find_channel
            .arg(channel_id.as_str())
            .invoke_async(&mut *conn)
            .await?;

        if matches!(raw, Value::Nil) {
            return Ok(None);
        }
        let items = as_array(raw)?;
        Ok(Some(ChannelSnapshot {
            ttl: decode::as_i64_or_zero(items.first()),
            time: decode::as_u64_or_zero(items.get(1)),
            subscribers_effective: decode::as_i64_or_zero(items.get(2)),
            message_count: decode::as_i64_or_zero(items.get(3)),
        }))
    }

    pub(crate) fn scripts(&self) -> &Scripts {
        &self.scripts
    }

    pub(crate) async fn connection(&self) -> tokio::sync::MutexGuard<'_, MultiplexedConnection> {
        self.conn().await
    }
}

impl Scripts {
    /// Runs the per-channel slice of the consistency check (§E.6).
    pub(crate) async fn run_check_channel(
        &self,
        conn: &mut MultiplexedConnection,
        channel_id: &str,
    ) -> EngineResult<(Vec<String>, Vec<String>)> {
        let raw: Value = self
            .check_channel
            .arg(channel_id)
            .invoke_async(conn)
            .await?;
        let items = as_array(raw)?;
        let errors = items
            .first()
            .cloned()
            .map(as_array)
            .transpose()?
            .unwrap_or_default()
            .iter()
            .filter_map(decode::as_string)
            .collect();
        let known_msgkeys = items
            .get(1)
            .cloned()
            .map(as_array)
            .transpose()?
            .unwrap_or_default()
            .iter()
            .filter_map(decode::as_string)
            .collect();
        Ok((errors, known_msgkeys))
    }
}

/// Key existence check used by the consistency checker's orphan sweep
/// (§4.k). A plain `HEXISTS` needs no Lua script: it is a single command,
/// and the checker does not need atomicity with anything else for this
/// read.
pub(crate) async fn message_is_unbuffered(
    conn: &mut MultiplexedConnection,
    message_key: &str,
) -> EngineResult<bool> {
    Ok(conn.hexists(message_key, "unbuffered").await?)
}

pub(crate) fn message_scan_pattern() -> &'static str {
    keys::MESSAGE_SCAN_PATTERN
}

pub(crate) fn channel_scan_pattern() -> &'static str {
    keys::CHANNEL_SCAN_PATTERN
}
