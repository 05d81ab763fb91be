//! Integration tests for `delete` (§4.i) and its broadcast/tombstone
//! side effects, against a live Redis/Valkey instance.

use std::time::Duration;

use futures::StreamExt;
use redis::AsyncCommands;

use fanout_store::testing::{engine_for_tests, unique_channel_id};
use fanout_store::{keys, BroadcastFrame};

#[tokio::test]
async fn delete_drains_messages_and_tombstones_the_channel() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("delete_drains_messages_and_tombstones");

    for t in 1..=3u64 {
        engine
            .publish(&channel, t, b"x", b"", b"", 60, 10)
            .await
            .unwrap();
    }

    let snapshot = engine
        .delete(&channel)
        .await
        .unwrap()
        .expect("delete should return a snapshot for an existing channel");
    assert_eq!(snapshot.message_count, 3);

    assert!(engine.find_channel(&channel).await.unwrap().is_none());

    let mut conn = engine.raw_connection().await.unwrap();
    let tombstone_ttl: i64 = conn.ttl(keys::deleted(&channel)).await.unwrap();
    assert!(tombstone_ttl > 0 && tombstone_ttl <= 5);
}

#[tokio::test]
async fn delete_on_absent_channel_returns_none() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("delete_on_absent_channel_returns_none");

    let result = engine.delete(&channel).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn delete_broadcasts_an_alert_frame_to_the_pubsub_topic() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("delete_broadcasts_an_alert_frame");

    engine
        .publish(&channel, 100, b"x", b"", b"", 60, 10)
        .await
        .unwrap();

    let client = redis::Client::open(engine.config().redis_url.as_str()).unwrap();
    let mut pubsub = client.get_async_pubsub().await.unwrap();
    pubsub.subscribe(keys::pubsub(&channel)).await.unwrap();

    let mut stream = pubsub.on_message();
    engine.delete(&channel).await.unwrap();

    let received = tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("should receive the delete alert before timing out")
        .expect("pubsub stream should yield a message");
    let payload: Vec<u8> = received.get_payload().unwrap();
    let frame = BroadcastFrame::decode(&payload).unwrap();
    match frame {
        BroadcastFrame::Alert { channel_id } => assert_eq!(channel_id, channel),
        other => panic!("expected Alert, got {other:?}"),
    }
}
