//! Engine configuration.
//!
//! Connection parameters and the tunables §3/§4 leave up to the deployer
//! (TTL floors, the inline/reference broadcast threshold) live here rather
//! than as magic numbers scattered through [`crate::engine`]. Loaded the way
//! this workspace's other crates load theirs: a `serde`-deserializable
//! struct with `Default`, layered with `FANOUT_STORE_*` environment
//! overrides via the `config` crate.

use serde::Deserialize;

use crate::model::{DEFAULT_MESSAGE_TTL_SECS, INLINE_BROADCAST_THRESHOLD_BYTES};

/// Runtime configuration for an [`crate::engine::Engine`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Redis/Valkey connection URL.
    pub redis_url: String,
    /// Default channel TTL, in seconds, used when a channel's `ttl` field
    /// is otherwise unset (§4.b step 6).
    pub default_channel_ttl_secs: i64,
    /// `active_ttl` default used by `subscriber_register` when the caller
    /// passes a value treated as "unset" (§4.e).
    pub default_active_ttl_secs: i64,
    /// `empty_ttl` default used by `subscriber_unregister` (§4.f).
    pub default_empty_ttl_secs: i64,
    /// Message TTL substituted for `msg_ttl == 0` (§3, "4 years").
    pub default_message_ttl_secs: i64,
    /// Payloads at or above this size broadcast by reference (§4.b step 10).
    pub inline_broadcast_threshold_bytes: usize,
    /// `COUNT` hint passed to `SCAN` by the consistency checker (§E.6).
    pub scan_count_hint: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            default_channel_ttl_secs: 20,
            default_active_ttl_secs: 20,
            default_empty_ttl_secs: 20,
            default_message_ttl_secs: DEFAULT_MESSAGE_TTL_SECS,
            inline_broadcast_threshold_bytes: INLINE_BROADCAST_THRESHOLD_BYTES,
            scan_count_hint: 250,
        }
    }
}

impl EngineConfig {
    /// Load from `FANOUT_STORE_*` environment variables layered over the
    /// struct defaults above.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Config::try_from(&EngineConfig::default())?)
            .add_source(config::Environment::with_prefix("FANOUT_STORE"))
            .build()?
            .try_deserialize()
    }

    /// Builder entry point for tests: start from defaults and override
    /// fields directly, bypassing the environment entirely.
    pub fn for_testing() -> Self {
        EngineConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.default_message_ttl_secs, DEFAULT_MESSAGE_TTL_SECS);
        assert_eq!(
            config.inline_broadcast_threshold_bytes,
            INLINE_BROADCAST_THRESHOLD_BYTES
        );
    }

    #[test]
    fn for_testing_does_not_touch_environment() {
        std::env::remove_var("FANOUT_STORE_REDIS_URL");
        let config = EngineConfig::for_testing();
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
    }
}
