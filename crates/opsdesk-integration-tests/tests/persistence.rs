//! End-to-end tests over the file-backed store.

use std::sync::Arc;

use opsdesk_audit::{ActionType, AuditMetadata, IpResolver, LogFilter, PageRequest};
use opsdesk_permissions::{DecisionReason, ProfileStore};
use opsdesk_storage::{FileKvStore, KvStore};
use opsdesk_test::prelude::*;

mod common;
use common::Harness;

/// Profiles and audit entries written through one handle are visible after
/// reopening the file.
#[tokio::test]
async fn test_state_survives_reopen() {
    let (dir, store) = temp_file_store();
    let path = store.path().to_path_buf();

    {
        let h = Harness::over(store as Arc<dyn KvStore>, IpResolver::disabled());
        h.profiles
            .put_profile(&test_restricted_profile("u-1", &["/home"]))
            .await
            .unwrap();
        let denied = h.resolver.check(&test_principal("u-1"), "/senhas").await;
        assert!(!denied.allowed);
        h.recorder
            .log_action(
                &test_principal("u-1"),
                ActionType::AccessDenied,
                None,
                "Access denied to /senhas",
                AuditMetadata::new().extra("path", denied.path),
            )
            .await
            .unwrap();
    }

    let reopened = Arc::new(FileKvStore::open(&path).unwrap());
    let h = Harness::over(reopened as Arc<dyn KvStore>, IpResolver::disabled());

    let decision = h.resolver.check(&test_principal("u-1"), "/home").await;
    assert!(decision.allowed);
    assert_eq!(decision.reason, DecisionReason::Listed);

    let logs = h
        .query
        .fetch_logs(
            &LogFilter::all().action(ActionType::AccessDenied),
            PageRequest::new(1, 10).unwrap(),
        )
        .await;
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].description, "Access denied to /senhas");

    drop(dir);
}

/// Profiles and audit entries live in separate namespaces of one file.
#[tokio::test]
async fn test_profiles_and_audit_share_a_file() {
    let (_dir, store) = temp_file_store();
    let h = Harness::over(store as Arc<dyn KvStore>, IpResolver::disabled());

    h.profiles
        .put_profile(&test_admin_profile("admin-1"))
        .await
        .unwrap();
    h.recorder
        .log_action(
            &test_principal("admin-1"),
            ActionType::PermissionChanged,
            Some("u-2"),
            "Updated permissions of u-2",
            AuditMetadata::new().table("profiles"),
        )
        .await
        .unwrap();

    assert_eq!(h.profiles.list_profiles().await.unwrap().len(), 1);
    assert_eq!(h.query.count_logs(&LogFilter::all()).await, 1);
}
