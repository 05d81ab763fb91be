//! Integration tests for subscriber bookkeeping (§4.e, §4.f, §4.g) and
//! status broadcast (§4.h) against a live Redis/Valkey instance.

use fanout_store::testing::{engine_for_tests, unique_channel_id};
use fanout_store::{KeepaliveOutcome, SubscriberId};

#[tokio::test]
async fn subscriber_lifecycle_register_then_unregister_deletes_channel() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("subscriber_lifecycle");

    // A channel must exist before subscriber_register has anything to act
    // on; publish brings one into being.
    engine
        .publish(&channel, 100, b"x", b"", b"", 60, 10)
        .await
        .unwrap();

    let first = engine
        .subscriber_register(&channel, SubscriberId::New, 30)
        .await
        .unwrap();
    assert_eq!(first.subscribers_total, 1);

    let second = engine
        .subscriber_register(&channel, SubscriberId::New, 30)
        .await
        .unwrap();
    assert_eq!(second.subscribers_total, 2);
    assert_ne!(first.subscriber_id, second.subscriber_id);

    let after_first_leaves = engine
        .subscriber_unregister(&channel, &first.subscriber_id, 0)
        .await
        .unwrap();
    assert_eq!(after_first_leaves.subscribers_total, 1);

    let after_second_leaves = engine
        .subscriber_unregister(&channel, &second.subscriber_id, 0)
        .await
        .unwrap();
    assert_eq!(after_second_leaves.subscribers_total, 0);

    // empty_ttl == 0 deletes the channel's keys immediately.
    let gone = engine.find_channel(&channel).await.unwrap();
    assert!(gone.is_none());
}

#[tokio::test]
async fn unregister_on_already_gone_channel_is_a_quiet_no_op() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("unregister_on_already_gone_channel");

    let result = engine
        .subscriber_unregister(&channel, "42", 0)
        .await
        .unwrap();
    assert_eq!(result.subscribers_total, 0);
}

#[tokio::test]
async fn unregister_past_zero_on_a_surviving_channel_is_a_typed_error() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("unregister_past_zero_on_a_surviving_channel");

    engine
        .publish(&channel, 100, b"x", b"", b"", 60, 10)
        .await
        .unwrap();
    let sub = engine
        .subscriber_register(&channel, SubscriberId::New, 30)
        .await
        .unwrap();

    // empty_ttl == -1 persists the channel's keys instead of deleting them,
    // so the second unregister below still finds a channel to decrement.
    let first = engine
        .subscriber_unregister(&channel, &sub.subscriber_id, -1)
        .await
        .unwrap();
    assert_eq!(first.subscribers_total, 0);

    let err = engine
        .subscriber_unregister(&channel, &sub.subscriber_id, 0)
        .await
        .expect_err("decrementing an already-empty channel must be a typed error");
    assert!(matches!(err, fanout_store::EngineError::SubscriberCountUnderflow { count, .. } if count < 0));

    engine.delete(&channel).await.unwrap();
}

#[tokio::test]
async fn keepalive_on_subscriberless_channel_signals_disappear() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("keepalive_on_subscriberless_channel");

    engine
        .publish(&channel, 100, b"x", b"", b"", 60, 10)
        .await
        .unwrap();

    let outcome = engine.channel_keepalive(&channel, 20).await.unwrap();
    assert_eq!(outcome, KeepaliveOutcome::Disappear);

    engine.delete(&channel).await.unwrap();
}

#[tokio::test]
async fn keepalive_with_subscribers_refreshes_ttl_and_jitters() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("keepalive_with_subscribers");

    engine
        .publish(&channel, 100, b"x", b"", b"", 60, 10)
        .await
        .unwrap();
    engine
        .subscriber_register(&channel, SubscriberId::New, 30)
        .await
        .unwrap();

    let outcome = engine.channel_keepalive(&channel, 20).await.unwrap();
    match outcome {
        KeepaliveOutcome::NextKeepaliveSecs(secs) => {
            assert!(secs > 0, "jittered keepalive should be positive: got {secs}");
        }
        KeepaliveOutcome::Disappear => panic!("channel has a subscriber, should not disappear"),
    }

    engine.delete(&channel).await.unwrap();
}

#[tokio::test]
async fn add_fakesub_inflates_effective_subscriber_count() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("add_fakesub_inflates_effective_subscriber_count");

    engine
        .publish(&channel, 100, b"x", b"", b"", 60, 10)
        .await
        .unwrap();

    let fake_total = engine.add_fakesub(&channel, 50).await.unwrap();
    assert_eq!(fake_total, 50);

    let snapshot = engine.find_channel(&channel).await.unwrap().unwrap();
    assert_eq!(snapshot.subscribers_effective, 50);

    engine.delete(&channel).await.unwrap();
}

#[tokio::test]
async fn publish_status_reports_current_subscriber_count() {
    let Some(engine) = engine_for_tests().await else {
        return;
    };
    let channel = unique_channel_id("publish_status_reports_current_subscriber_count");

    engine
        .publish(&channel, 100, b"x", b"", b"", 60, 10)
        .await
        .unwrap();
    engine
        .subscriber_register(&channel, SubscriberId::New, 30)
        .await
        .unwrap();

    let subscribers = engine.publish_status(&channel, 204).await.unwrap();
    assert_eq!(subscribers, 1);

    engine.delete(&channel).await.unwrap();
}
