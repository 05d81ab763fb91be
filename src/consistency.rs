//! §4.k consistency checker (`rsck`), rewritten per §9's open question: the
//! reference's `KEYS channel:*` / `KEYS channel:msg:*` become `SCAN`-based
//! iteration (§E.6). Per-channel invariant checks still run as a single
//! atomic Lua script (`scripts/check_channel.lua`); only the outer
//! enumeration gives up atomicity, which is fine because this operation is
//! diagnostic-only and never mutates (§4.k).

use std::collections::HashSet;

use redis::{AsyncCommands, AsyncIter, ScanOptions};
use tracing::{info, instrument};

use crate::engine::{channel_scan_pattern, message_is_unbuffered, message_scan_pattern, Engine};
use crate::error::EngineResult;

/// One violation surfaced by [`check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Human-readable description, in the same spirit as the reference's
    /// free-text error lines.
    pub description: String,
}

/// Outcome of a full consistency sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Number of channels examined.
    pub channels_checked: usize,
    /// Number of distinct messages examined (reachable from some channel's
    /// list).
    pub messages_checked: usize,
    /// Every violation found, if any.
    pub violations: Vec<Violation>,
}

impl ConsistencyReport {
    /// True if no violations were found.
    pub fn is_ok(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Walks the whole channel key space and reports invariant violations
/// (§4.k). Read-only.
#[instrument(skip(engine))]
pub async fn check(engine: &Engine) -> EngineResult<ConsistencyReport> {
    let mut known_msgkeys: HashSet<String> = HashSet::new();
    let mut violations = Vec::new();
    let mut channels_checked = 0usize;

    let scan_count = engine.config().scan_count_hint;

    let channel_ids: Vec<String> = {
        let mut conn = engine.connection().await;
        let opts = ScanOptions::default()
            .with_pattern(channel_scan_pattern())
            .with_count(scan_count);
        let mut iter: AsyncIter<String> = conn
            .scan_options(opts)
            .await
            .map_err(crate::error::EngineError::Redis)?;
        let mut ids = Vec::new();
        while let Some(key) = iter.next_item().await {
            // channel:messages:*, channel:msg:*, channel:subscribers:*,
            // channel:pubsub:*, and channel:deleted:* all share the
            // "channel:" prefix but are not channel hashes themselves.
            if key.starts_with("channel:messages:")
                || key.starts_with("channel:msg:")
                || key.starts_with("channel:subscribers:")
                || key.starts_with("channel:pubsub:")
                || key.starts_with("channel:deleted:")
            {
                continue;
            }
            if let Some(id) = key.strip_prefix("channel:") {
                ids.push(id.to_string());
            }
        }
        ids
    };

    info!(found = channel_ids.len(), "consistency check: channels found");

    for channel_id in &channel_ids {
        channels_checked += 1;
        let (errors, msgkeys) = {
            let mut conn = engine.connection().await;
            engine.scripts().run_check_channel(&mut conn, channel_id).await?
        };
        for description in errors {
            violations.push(Violation { description });
        }
        known_msgkeys.extend(msgkeys);
    }

    let orphan_msgkeys: Vec<String> = {
        let mut conn = engine.connection().await;
        let opts = ScanOptions::default()
            .with_pattern(message_scan_pattern())
            .with_count(scan_count);
        let mut iter: AsyncIter<String> = conn
            .scan_options(opts)
            .await
            .map_err(crate::error::EngineError::Redis)?;
        let mut orphans = Vec::new();
        while let Some(key) = iter.next_item().await {
            if !known_msgkeys.contains(&key) {
                orphans.push(key);
            }
        }
        orphans
    };

    for msgkey in &orphan_msgkeys {
        let mut conn = engine.connection().await;
        if !message_is_unbuffered(&mut conn, msgkey).await? {
            violations.push(Violation {
                description: format!("orphan message {msgkey}"),
            });
        }
    }

    Ok(ConsistencyReport {
        channels_checked,
        messages_checked: known_msgkeys.len(),
        violations,
    })
}
