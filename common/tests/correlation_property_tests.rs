// Property-based tests for request/reply correlation

mod support;

use common::errors::ErrorKind;
use common::models::JobResult;
use common::worker::output_key;
use proptest::prelude::*;
use serde_json::json;
use std::sync::Arc;
use support::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn blob_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_-]{1,12}(/[a-zA-Z0-9_.-]{1,12}){0,3}"
}

/// *For any* valid request, the reply echoes the request's correlation id
/// and the output key is "edited/" + the input key.
#[test]
fn property_correlation_id_and_output_key() {
    let rt = runtime();

    proptest!(|(
        blob_key in blob_key_strategy(),
        prompt in "\\PC{1,40}",
        correlation_id in "\\PC{0,40}",
    )| {
        let outcome = rt.block_on(async {
            let probe = Arc::new(Probe::default());
            let store = Arc::new(MemoryBlobStore::new(probe.clone()));
            store.insert(&blob_key, b"source");
            let transformer = Arc::new(FakeTransformer::succeeding(probe));
            let publisher = Arc::new(RecordingPublisher::default());
            let consumer = consumer(store, transformer, publisher.clone());

            let msg = FakeDelivery::json(
                json!({"blobKey": blob_key, "prompt": prompt}),
                &correlation_id,
                "R",
            );
            let result = consumer.handle(&msg).await;
            (result, publisher.sent(), msg.ack_count())
        });

        let (result, sent, acks) = outcome;
        let expected_key = format!("edited/{}", blob_key);
        prop_assert_eq!(&result, &JobResult::success(correlation_id.clone(), expected_key));
        prop_assert_eq!(sent.len(), 1);
        prop_assert_eq!(sent[0].1.correlation_id(), correlation_id.as_str());
        prop_assert_eq!(acks, 1);
    });
}

/// *For any* request missing `blobKey` or `prompt`, the reply is a
/// ValidationError and the message is acknowledged exactly once.
#[test]
fn property_missing_fields_are_validation_errors() {
    let rt = runtime();

    proptest!(|(
        blob_key in prop::option::of(blob_key_strategy()),
        prompt in prop::option::of("\\PC{1,20}"),
        correlation_id in "[a-z0-9]{1,16}",
    )| {
        prop_assume!(blob_key.is_none() || prompt.is_none());

        let mut body = serde_json::Map::new();
        if let Some(key) = &blob_key {
            body.insert("blobKey".to_string(), json!(key));
        }
        if let Some(prompt) = &prompt {
            body.insert("prompt".to_string(), json!(prompt));
        }

        let (result, replies, acks, events) = rt.block_on(async {
            let probe = Arc::new(Probe::default());
            let store = Arc::new(MemoryBlobStore::new(probe.clone()));
            let transformer = Arc::new(FakeTransformer::succeeding(probe.clone()));
            let publisher = Arc::new(RecordingPublisher::default());
            let consumer = consumer(store, transformer, publisher.clone());

            let msg = FakeDelivery::json(serde_json::Value::Object(body), &correlation_id, "R");
            let result = consumer.handle(&msg).await;
            (result, publisher.sent().len(), msg.ack_count(), probe.events())
        });

        prop_assert_eq!(result.error_kind(), Some(ErrorKind::ValidationError));
        prop_assert_eq!(result.correlation_id(), correlation_id.as_str());
        prop_assert_eq!(replies, 1);
        prop_assert_eq!(acks, 1);
        prop_assert!(events.is_empty());
    });
}

/// *For any* key that is not in the blob store, the reply is a FetchError.
#[test]
fn property_unresolved_key_is_fetch_error() {
    let rt = runtime();

    proptest!(|(blob_key in blob_key_strategy(), correlation_id in "[a-z0-9]{1,16}")| {
        let result = rt.block_on(async {
            let probe = Arc::new(Probe::default());
            let store = Arc::new(MemoryBlobStore::new(probe.clone()));
            let transformer = Arc::new(FakeTransformer::succeeding(probe));
            let publisher = Arc::new(RecordingPublisher::default());
            let consumer = consumer(store, transformer, publisher);

            let msg = FakeDelivery::json(
                json!({"blobKey": blob_key, "prompt": "edit"}),
                &correlation_id,
                "R",
            );
            consumer.handle(&msg).await
        });

        prop_assert_eq!(result.error_kind(), Some(ErrorKind::FetchError));
        prop_assert_eq!(result.correlation_id(), correlation_id.as_str());
    });
}

/// *For any* key K, the output key is "edited/" + K.
#[test]
fn property_output_key_derivation() {
    proptest!(|(blob_key in "\\PC{0,64}")| {
        let key = output_key("edited/", &blob_key);
        prop_assert!(key.starts_with("edited/"));
        prop_assert_eq!(&key["edited/".len()..], blob_key.as_str());
    });
}
