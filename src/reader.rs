//! Reader outcomes (§4.c `get_message`).
//!
//! `get_message`'s four result codes (`200`/`404`/`410`/`418`) are not-found
//! and not-yet-available outcomes, never errors (§7 kind 4) — so they are
//! modeled as a closed enum rather than folded into [`crate::error::EngineError`].

use crate::model::MessageRecord;

/// Outcome of a `get_message` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// `200` — the requested (or implied) message was found.
    Found {
        /// The message itself.
        message: MessageRecord,
        /// Current subscriber count for the channel, as observed alongside
        /// the read.
        subscriber_count: i64,
    },
    /// `404` — the channel, the message, or its successor is definitely
    /// gone or never existed.
    NotFound,
    /// `410` — the predecessor message exists but its forward link is
    /// broken; distinct from `404` per the reference's reserved-but-unused
    /// status code (§9 open questions).
    Gone,
    /// `418` — the cursor is at or past the current message; the caller
    /// should wait and retry.
    NotYetAvailable {
        /// Current subscriber count for the channel.
        subscriber_count: i64,
    },
}

impl ReadOutcome {
    /// The numeric status code this outcome corresponds to, for callers
    /// that need to surface it verbatim (§6 "Result encoding").
    pub fn status_code(&self) -> u16 {
        match self {
            ReadOutcome::Found { .. } => 200,
            ReadOutcome::NotFound => 404,
            ReadOutcome::Gone => 410,
            ReadOutcome::NotYetAvailable { .. } => 418,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_documented_contract() {
        assert_eq!(ReadOutcome::NotFound.status_code(), 404);
        assert_eq!(ReadOutcome::Gone.status_code(), 410);
        assert_eq!(
            ReadOutcome::NotYetAvailable { subscriber_count: 0 }.status_code(),
            418
        );
        assert_eq!(
            ReadOutcome::Found {
                message: MessageRecord::default(),
                subscriber_count: 2,
            }
            .status_code(),
            200
        );
    }
}
