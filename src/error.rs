//! Error types for the fan-out storage engine
//!
//! Mirrors the five error kinds described for this engine: argument
//! validation, state conflict, invariant violation, transport failure, and
//! wire-codec failure. Not-found / not-yet-available outcomes are never
//! errors here — see [`crate::reader::ReadOutcome`].

use thiserror::Error;

/// Errors an engine operation can fail with.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A required numeric argument was missing or did not parse.
    #[error("invalid argument {name}: {reason}")]
    InvalidArgument {
        /// Name of the offending argument.
        name: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// `content_type` contained the forbidden `:` character.
    #[error("message content-type cannot contain ':' character")]
    InvalidContentType,

    /// A message with the computed `(time, tag)` id already exists.
    #[error("message for channel {channel_id} id {message_id} already exists")]
    MessageIdCollision {
        /// Channel the collision occurred on.
        channel_id: String,
        /// The id that already existed.
        message_id: String,
    },

    /// Subscriber count would have gone negative.
    #[error("subscriber count for channel {channel_id} less than zero: {count}")]
    SubscriberCountUnderflow {
        /// Channel whose count underflowed.
        channel_id: String,
        /// The count that would have resulted.
        count: i64,
    },

    /// The underlying key-value store returned an error.
    #[error("redis transport error: {0}")]
    Redis(#[from] redis::RedisError),

    /// The broadcast wire codec failed to encode a frame.
    #[error("wire codec encode error: {0}")]
    Codec(#[from] rmpv::encode::Error),

    /// The broadcast wire codec failed to decode a frame.
    #[error("wire codec decode error: {0}")]
    CodecDecode(#[from] rmpv::decode::Error),

    /// A decoded broadcast frame did not have the expected shape.
    #[error("malformed broadcast frame: {0}")]
    MalformedFrame(String),

    /// Configuration could not be loaded or did not validate.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Convenience alias used throughout the crate.
pub type EngineResult<T> = Result<T, EngineError>;
