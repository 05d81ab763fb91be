//! Atomic, Redis-backed storage and pub/sub engine for a channel-based
//! message fan-out system.
//!
//! This crate implements the server-side half of a long-poll / EventSource /
//! WebSocket fan-out module: channel lifecycle, message publication with a
//! per-channel doubly-linked log, cursor-based message retrieval, subscriber
//! bookkeeping, status broadcasts, channel deletion, and a diagnostic
//! consistency checker. Every operation is a single atomic Lua script
//! executed against a Redis/Valkey-compatible store — see [`engine::Engine`]
//! for the full operation surface.
//!
//! Out of scope: client transport (HTTP/WebSocket/long-poll), authentication,
//! module configuration, log formatting, statistics, and TLS. This crate is
//! the storage/fan-out core an NGINX-module-shaped caller would sit on top
//! of; it has no opinion on what sits above it.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use fanout_store::{Engine, EngineConfig, MessageOrder};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Engine::new(EngineConfig::default()).await?;
//! let channel = "chat:lobby".to_string();
//!
//! let outcome = engine
//!     .publish(&channel, 1_700_000_000, b"hello", b"text/plain", b"", 60, 10)
//!     .await?;
//! println!("assigned tag {}", outcome.id.tag);
//!
//! let read = engine
//!     .get_message(&channel, None, MessageOrder::Fifo, 0)
//!     .await?;
//! println!("{read:?}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_debug_implementations)]

/// Connection and tunable configuration for an [`engine::Engine`].
pub mod config;
/// The diagnostic consistency checker (`rsck`).
pub mod consistency;
mod decode;
/// The atomic storage and pub/sub engine: one method per operation.
pub mod engine;
/// Error types shared by every operation.
pub mod error;
/// Key-space naming (§4.a).
pub mod keys;
/// Channel records, message records, and the other data-model types.
pub mod model;
/// `get_message`'s closed result type.
pub mod reader;
/// Test-only helpers, exported for integration tests in `tests/`.
pub mod testing;
/// The broadcast/reply-topic wire format.
pub mod wire;

pub use config::EngineConfig;
pub use consistency::{check, ConsistencyReport, Violation};
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use model::{
    ChannelId, ChannelRecord, ChannelSnapshot, DeleteSnapshot, KeepaliveOutcome, MessageId,
    MessageOrder, MessageRecord, PublishOutcome, SubscriberId, SubscriberRegistration,
    SubscriberUnregistration,
};
pub use reader::ReadOutcome;
pub use wire::BroadcastFrame;
