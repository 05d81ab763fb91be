//! Integration tests for the `rsck` consistency checker (§4.k) against a
//! live Redis/Valkey instance.

use redis::AsyncCommands;

use fanout_store::testing::{engine_for_tests, unique_channel_id};

#[tokio::test]
async fn a_freshly_published_channel_reports_clean() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("a_freshly_published_channel_reports_clean");

    engine
        .publish(&channel, 100, b"a", b"", b"", 60, 10)
        .await
        .unwrap();
    engine
        .publish(&channel, 101, b"b", b"", b"", 60, 10)
        .await
        .unwrap();

    let report = fanout_store::check(&engine).await.unwrap();
    let ours: Vec<_> = report
        .violations
        .iter()
        .filter(|v| v.description.contains(&channel))
        .collect();
    assert!(
        ours.is_empty(),
        "expected no violations for {channel}, got {ours:?}"
    );

    engine.delete(&channel).await.unwrap();
}

#[tokio::test]
async fn orphaned_message_record_is_flagged() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("orphaned_message_record_is_flagged");

    // Inject a message hash directly, bypassing publish, so it is never
    // reachable from any channel's message list and is not marked
    // `unbuffered` — the exact orphan shape described in scenario 7.
    let mut conn = engine.raw_connection().await.unwrap();
    let orphan_key = fanout_store::keys::message(
        &channel,
        fanout_store::MessageId {
            time: 999,
            tag: 0,
        },
    );
    let _: () = conn
        .hset_multiple(
            &orphan_key,
            &[
                ("time", "999"),
                ("tag", "0"),
                ("data", "orphan"),
            ],
        )
        .await
        .unwrap();
    let _: () = conn.expire(&orphan_key, 30).await.unwrap();

    let report = fanout_store::check(&engine).await.unwrap();
    assert!(
        report
            .violations
            .iter()
            .any(|v| v.description.contains(&orphan_key)),
        "expected an orphan violation for {orphan_key}, got {:?}",
        report.violations
    );

    let _: () = conn.del(&orphan_key).await.unwrap();
}
