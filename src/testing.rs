//! Test-only helpers (§E.4). Not gated behind `#[cfg(test)]` because
//! `tests/*.rs` integration tests are a separate compilation unit and need
//! to reach these from outside the crate.

use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;
use crate::engine::Engine;

/// Installs a `tracing-subscriber` `fmt` layer filtered by `RUST_LOG`
/// (defaulting to `debug` for this crate), for use from integration tests.
/// Safe to call more than once: a later call that finds a subscriber
/// already installed is a no-op.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fanout_store=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Connects to `REDIS_URL` (default `redis://127.0.0.1:6379`), returning
/// `None` when unreachable so integration tests can skip gracefully rather
/// than fail in environments without a live Redis/Valkey instance.
pub async fn engine_for_tests() -> Option<Engine> {
    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
    let config = EngineConfig {
        redis_url,
        ..EngineConfig::for_testing()
    };
    match Engine::new(config).await {
        Ok(engine) => Some(engine),
        Err(err) => {
            eprintln!("[fanout_store::testing] skipping: cannot connect to Redis: {err}");
            None
        }
    }
}

/// A channel id unique to this test process and call site, so concurrent
/// `cargo test` threads sharing one Redis instance don't collide.
pub fn unique_channel_id(test_name: &str) -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();
    format!("test:{test_name}:{pid}:{n}")
}
