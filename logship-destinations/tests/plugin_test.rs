// Copyright 2025 Logship Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! End-to-end tests for the plugin context against an in-memory store.

#![cfg(feature = "s3")]

use chrono::Utc;
use logship_core::flush::{FlushOutcome, FLB_ERROR, FLB_OK, FLB_RETRY};
use logship_core::record::{EventTime, Record, Value};
use logship_core::source::MemoryRecordSource;
use logship_destinations::plugin::{InitError, OperatorId, PluginContext};
use logship_destinations::s3::{decompress_gzip, MemoryObjectStore, MemoryStoreFactory};
use std::collections::HashMap;

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn base_params() -> Vec<(&'static str, &'static str)> {
    vec![
        ("Bucket", "logs"),
        ("S3Prefix", "fluent-bit"),
        ("Region", "us-east-1"),
        ("TimeZone", "UTC"),
    ]
}

fn context() -> (PluginContext<MemoryStoreFactory>, MemoryObjectStore) {
    let factory = MemoryStoreFactory::default();
    let store = factory.store().clone();
    (PluginContext::with_factory(factory), store)
}

fn three_records() -> MemoryRecordSource {
    let now = Utc::now();
    let epoch = u64::try_from(now.timestamp()).unwrap();
    let record = || Record::new().with_field("mykey", "myvalue");

    vec![
        (EventTime::Fluent(now), record()),
        (EventTime::EpochSeconds(epoch), record()),
        (EventTime::Unknown, record()),
    ]
    .into_iter()
    .collect()
}

#[tokio::test]
async fn test_flush_three_records_into_one_object() {
    let (mut context, store) = context();
    let id = context.init(&params(&base_params())).await.unwrap();

    let outcome = context.flush(id, &mut three_records()).await;

    assert_eq!(outcome, FlushOutcome::Ok);
    assert_eq!(outcome.code(), FLB_OK);

    let objects = store.objects().await;
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].bucket, "logs");
    assert!(objects[0].key.starts_with("fluent-bit/"));
    assert!(objects[0].key.ends_with(".log"));
    assert_eq!(
        String::from_utf8(objects[0].body.clone()).unwrap(),
        "{\"mykey\":\"myvalue\"}\n{\"mykey\":\"myvalue\"}\n{\"mykey\":\"myvalue\"}\n"
    );
}

#[tokio::test]
async fn test_flush_gzip_with_sha256_suffix() {
    let (mut context, store) = context();
    let mut pairs = base_params();
    pairs.push(("Compress", "gzip"));
    pairs.push(("SuffixAlgorithm", "sha256"));
    let id = context.init(&params(&pairs)).await.unwrap();

    let mut records: MemoryRecordSource = vec![(
        EventTime::Unknown,
        Record::new()
            .with_field("log", Value::Bytes(b"GET /index.html 200".to_vec()))
            .with_field("kubernetes", Record::new().with_field("pod", "web-0")),
    )]
    .into_iter()
    .collect();

    assert_eq!(context.flush(id, &mut records).await, FlushOutcome::Ok);

    let object = store.objects().await.remove(0);
    assert!(object.key.ends_with(".log.gz"));
    assert_eq!(object.content_type, "application/gzip");

    let body = decompress_gzip(&object.body).unwrap();
    let expected = b"{\"log\":\"GET /index.html 200\",\"kubernetes\":{\"pod\":\"web-0\"}}\n";
    assert_eq!(body, expected.to_vec());

    let file_name = object.key.rsplit('/').next().unwrap();
    let hash = file_name
        .trim_end_matches(".log.gz")
        .split_once('-')
        .map(|(_, hash)| hash)
        .unwrap();
    assert_eq!(
        hash,
        logship_destinations::s3::key_gen::content_digest(expected)
    );
}

#[tokio::test]
async fn test_flush_empty_batch_uploads_by_default() {
    let (mut context, store) = context();
    let id = context.init(&params(&base_params())).await.unwrap();

    let outcome = context.flush(id, &mut MemoryRecordSource::new()).await;

    assert_eq!(outcome, FlushOutcome::Ok);
    let objects = store.objects().await;
    assert_eq!(objects.len(), 1);
    assert!(objects[0].body.is_empty());
}

#[tokio::test]
async fn test_flush_empty_batch_skipped_when_configured() {
    let (mut context, store) = context();
    let mut pairs = base_params();
    pairs.push(("SkipEmpty", "true"));
    let id = context.init(&params(&pairs)).await.unwrap();

    let outcome = context.flush(id, &mut MemoryRecordSource::new()).await;

    assert_eq!(outcome, FlushOutcome::Ok);
    assert!(store.objects().await.is_empty());
}

#[tokio::test]
async fn test_upload_failure_is_retry() {
    let (mut context, store) = context();
    let id = context.init(&params(&base_params())).await.unwrap();
    store.set_fail_puts(true);

    let outcome = context.flush(id, &mut three_records()).await;

    assert_eq!(outcome, FlushOutcome::Retry);
    assert_eq!(outcome.code(), FLB_RETRY);
    assert!(store.objects().await.is_empty());

    // The host redelivers; the store has recovered.
    store.set_fail_puts(false);
    assert_eq!(context.flush(id, &mut three_records()).await, FlushOutcome::Ok);
    assert_eq!(store.objects().await.len(), 1);
}

#[tokio::test]
async fn test_unencodable_record_is_dropped() {
    let (mut context, store) = context();
    let id = context.init(&params(&base_params())).await.unwrap();

    let mut records: MemoryRecordSource = vec![
        (EventTime::Unknown, Record::new().with_field("a", 1)),
        (EventTime::Unknown, Record::new().with_field("bad", f64::NAN)),
        (EventTime::Unknown, Record::new().with_field("c", 3)),
    ]
    .into_iter()
    .collect();

    assert_eq!(context.flush(id, &mut records).await, FlushOutcome::Ok);
    assert_eq!(store.objects().await[0].body, b"{\"a\":1}\n{\"c\":3}\n".to_vec());
}

#[tokio::test]
async fn test_invalid_time_zone_fails_init() {
    let (mut context, _store) = context();
    let mut pairs = base_params();
    pairs.retain(|(k, _)| *k != "TimeZone");
    pairs.push(("TimeZone", "Nowhere/Special"));

    let err = context.init(&params(&pairs)).await.unwrap_err();

    assert!(matches!(err, InitError::Config(_)));
    assert_eq!(err.code(), FLB_ERROR);
    assert!(context.is_empty());
}

#[tokio::test]
async fn test_aws_endpoint_fails_init() {
    let (mut context, _store) = context();
    let mut pairs = base_params();
    pairs.push(("Endpoint", "https://s3.amazonaws.com"));

    let err = context.init(&params(&pairs)).await.unwrap_err();

    assert!(err.to_string().contains("Use Region instead"));
    assert!(context.is_empty());
}

#[tokio::test]
async fn test_incomplete_credentials_fail_init() {
    let (mut context, _store) = context();
    let mut pairs = base_params();
    pairs.push(("AccessKeyID", "AKID"));

    let err = context.init(&params(&pairs)).await.unwrap_err();

    assert!(matches!(err, InitError::Credentials(_)));
    assert!(context.is_empty());
}

#[tokio::test]
async fn test_auto_create_bucket_on_init() {
    let (mut context, store) = context();
    let mut pairs = base_params();
    pairs.push(("AutoCreateBucket", "true"));

    context.init(&params(&pairs)).await.unwrap();
    context.init(&params(&pairs)).await.unwrap();

    assert_eq!(store.buckets().await, vec!["logs".to_string()]);
    assert_eq!(context.len(), 2);
}

#[tokio::test]
async fn test_bucket_creation_failure_fails_init() {
    let (mut context, store) = context();
    store.set_fail_bucket_creation(true);
    let mut pairs = base_params();
    pairs.push(("AutoCreateBucket", "true"));

    let err = context.init(&params(&pairs)).await.unwrap_err();

    assert!(matches!(err, InitError::Store(_)));
    assert!(context.is_empty());
}

#[tokio::test]
async fn test_operator_ids_are_sequential() {
    let (mut context, store) = context();

    let first = context.init(&params(&base_params())).await.unwrap();
    let mut second_params = base_params();
    second_params[0] = ("Bucket", "audit");
    let second = context.init(&params(&second_params)).await.unwrap();

    assert_eq!(first, OperatorId::from_raw(0));
    assert_eq!(second, OperatorId::from_raw(1));
    assert_eq!(context.operator(first).unwrap().config().bucket, "logs");
    assert_eq!(context.operator(second).unwrap().config().bucket, "audit");

    context.flush(second, &mut three_records()).await;
    let objects = store.objects().await;
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].bucket, "audit");
}

#[tokio::test]
async fn test_flush_unknown_operator() {
    let (context, _store) = context();

    let outcome = context
        .flush(OperatorId::from_raw(3), &mut three_records())
        .await;

    assert_eq!(outcome, FlushOutcome::Error);
}
