//! Integration tests for recording, querying and exporting the audit trail.

#![allow(clippy::arithmetic_side_effects)]

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use chrono::{Duration, Utc};
use futures::future::join_all;
use opsdesk_audit::{
    ActionType, AuditMetadata, AuditQuery, AuditRecorder, AuditStore, CSV_COLUMNS, IpResolver,
    LogFilter, Notifier, PageRequest, UNKNOWN_IP,
};
use opsdesk_test::TEST_IP;
use opsdesk_test::prelude::*;
use serde_json::json;

mod common;
use common::Harness;

fn column(name: &str) -> usize {
    CSV_COLUMNS.iter().position(|c| *c == name).unwrap()
}

/// Concurrent records of the same action produce independent entries.
#[tokio::test]
async fn test_concurrent_records_get_distinct_ids() {
    let h = Harness::in_memory();
    let user = test_principal("u-1");

    let calls = (0..3).map(|_| {
        h.recorder.log_action(
            &user,
            ActionType::Create,
            Some("item-42"),
            "Created item-42",
            AuditMetadata::new().table("inventory"),
        )
    });
    let entries: Vec<_> = join_all(calls).await.into_iter().flatten().collect();

    assert_eq!(entries.len(), 3);
    let ids: HashSet<_> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids.len(), 3);
    assert!(entries.iter().all(|e| e.user_id == user.id));

    let stored = h
        .query
        .count_logs(&LogFilter::all().user(user.id.clone()))
        .await;
    assert_eq!(stored, 3);
}

#[tokio::test]
async fn test_update_records_changed_fields() {
    let h = Harness::in_memory();
    let metadata = AuditMetadata::new()
        .table("inventory")
        .old_data(test_snapshot(&[("name", json!("Switch")), ("qty", json!(2))]))
        .new_data(test_snapshot(&[("name", json!("Switch")), ("qty", json!(3))]));

    let entry = h
        .recorder
        .log_action(
            &test_principal("u-1"),
            ActionType::Update,
            Some("item-42"),
            "Changed quantity",
            metadata,
        )
        .await
        .unwrap();

    assert_eq!(entry.changed_fields.len(), 1);
    assert!(entry.changed_fields.contains("qty"));
    assert_eq!(entry.ip_address, UNKNOWN_IP);
}

#[tokio::test]
async fn test_pagination_over_120_entries() {
    let h = Harness::in_memory();
    let user = test_principal("u-1");
    let base = Utc::now() - Duration::hours(2);
    for i in 0..120 {
        let entry = test_entry(&user, ActionType::Update, base + Duration::seconds(i));
        h.audit.insert(&entry).await.unwrap();
    }

    let filter = LogFilter::all();
    let sizes: Vec<usize> = {
        let mut sizes = Vec::new();
        for page in 1..=3 {
            let result = h
                .query
                .fetch_page(&filter, PageRequest::new(page, 50).unwrap())
                .await;
            assert_eq!(result.total_count, 120);
            assert_eq!(result.total_pages, 3);
            sizes.push(result.entries.len());
        }
        sizes
    };
    assert_eq!(sizes, vec![50, 20, 0]);

    let first = h
        .query
        .fetch_logs(&filter, PageRequest::new(1, 50).unwrap())
        .await;
    assert!(first.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    assert_eq!(first[0].created_at, base + Duration::seconds(119));
}

#[tokio::test]
async fn test_filters_combine() {
    let h = Harness::in_memory();
    let ana = test_principal("ana");
    let bruno = test_principal("bruno");
    let now = Utc::now();
    for (who, action) in [
        (&ana, ActionType::PasswordViewed),
        (&ana, ActionType::Update),
        (&bruno, ActionType::PasswordViewed),
    ] {
        h.audit.insert(&test_entry(who, action, now)).await.unwrap();
    }

    let filter = LogFilter::all()
        .user(ana.id.clone())
        .action(ActionType::PasswordViewed)
        .table("inventory");
    assert_eq!(h.query.count_logs(&filter).await, 1);

    let future_only = LogFilter::all().between(Some(now + Duration::hours(1)), None);
    assert_eq!(h.query.count_logs(&future_only).await, 0);
}

/// Descriptions with separators, quotes and newlines survive the export.
#[tokio::test]
async fn test_csv_export_round_trip() {
    let h = Harness::in_memory();
    let description = "a,\"b\",c\nsecond line";
    h.recorder
        .log_action(
            &test_principal("u-1"),
            ActionType::Delete,
            Some("item-42"),
            description,
            AuditMetadata::new().table("inventory"),
        )
        .await
        .unwrap();

    let csv = h.query.export_csv(&LogFilter::all()).await;
    let rows = parse_csv(&csv);

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].len(), CSV_COLUMNS.len());
    assert_eq!(rows[1][column("description")], description);
    assert_eq!(rows[1][column("action_type")], "DELETE");
}

#[tokio::test]
async fn test_csv_export_of_empty_result_is_header_only() {
    let h = Harness::in_memory();
    let rows = parse_csv(&h.query.export_csv(&LogFilter::all()).await);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "id");
}

/// A failed audit write is swallowed and logged, never propagated.
#[tokio::test]
async fn test_write_failure_does_not_propagate() {
    let (logs, _guard) = capture_logs();
    let store = Arc::new(MockAuditStore::failing());
    let recorder = AuditRecorder::new(
        Arc::clone(&store) as Arc<dyn AuditStore>,
        IpResolver::disabled(),
    );

    let entry = recorder
        .log_action(
            &test_principal("u-1"),
            ActionType::PasswordCopied,
            Some("pw-7"),
            "Copied VPN password",
            AuditMetadata::new(),
        )
        .await;

    assert!(entry.is_none());
    assert_eq!(logs.count_level("WARN"), 1);
    assert_eq!(logs.count_containing("failed to record audit entry"), 1);
}

/// Read failures degrade to empty results and notify the user.
#[tokio::test]
async fn test_read_failure_returns_empty_and_notifies() {
    let store = Arc::new(MockAuditStore::new());
    let notices = Arc::new(RecordingNotifier::new());
    let query = AuditQuery::new(
        Arc::clone(&store) as Arc<dyn AuditStore>,
        Arc::clone(&notices) as Arc<dyn Notifier>,
    );
    store
        .insert(&test_entry(&test_principal("u-1"), ActionType::Login, Utc::now()))
        .await
        .unwrap();
    store.set_fail_reads(true);

    let page = query
        .fetch_page(&LogFilter::all(), PageRequest::new(1, 50).unwrap())
        .await;
    assert!(page.entries.is_empty());
    assert_eq!(page.total_count, 0);
    assert!(query.export_csv(&LogFilter::all()).await.is_empty());
    assert!(!notices.notices().is_empty());

    store.set_fail_reads(false);
    assert_eq!(query.count_logs(&LogFilter::all()).await, 1);
}

/// The client IP is looked up once per session and recorded on each entry.
#[tokio::test]
async fn test_ip_is_cached_until_sign_out() {
    let lookup = CountingIpLookup::answering(TEST_IP);
    let calls = lookup.counter();
    let h = Harness::over(
        Arc::new(opsdesk_storage::MemoryKvStore::new()),
        IpResolver::new(Arc::new(lookup)),
    );
    let user = test_principal("u-1");

    for _ in 0..3 {
        let entry = h
            .recorder
            .log_action(&user, ActionType::Login, None, "Signed in", AuditMetadata::new())
            .await
            .unwrap();
        assert_eq!(entry.ip_address, TEST_IP);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    h.recorder.on_sign_out();
    h.recorder
        .log_action(&user, ActionType::Login, None, "Signed in", AuditMetadata::new())
        .await
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_ip_lookup_records_unknown() {
    let lookup = CountingIpLookup::failing();
    let calls = lookup.counter();
    let h = Harness::over(
        Arc::new(opsdesk_storage::MemoryKvStore::new()),
        IpResolver::new(Arc::new(lookup)),
    );
    let user = test_principal("u-1");

    for _ in 0..2 {
        let entry = h
            .recorder
            .log_action(&user, ActionType::LoginFailed, None, "Bad password", AuditMetadata::new())
            .await
            .unwrap();
        assert_eq!(entry.ip_address, UNKNOWN_IP);
    }
    // Failures are not cached.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
