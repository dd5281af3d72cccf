//! Test fixtures for common types.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tempfile::TempDir;

use opsdesk_audit::{ActionType, AuditLogEntry, AuditMetadata, ClientInfo, DeviceClass, Snapshot};
use opsdesk_core::{Principal, Role, UserId};
use opsdesk_permissions::Profile;
use opsdesk_storage::FileKvStore;

/// Address used by fixtures (TEST-NET-3).
pub const TEST_IP: &str = "203.0.113.7";

/// Desktop user agent used by fixtures.
pub const TEST_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/126.0 Safari/537.36";

/// Create a user id.
///
/// # Panics
///
/// Panics if `id` is blank.
#[must_use]
pub fn test_user_id(id: &str) -> UserId {
    UserId::new(id).expect("fixture user id must not be blank")
}

/// Create a principal with an `@opsdesk.test` email.
#[must_use]
pub fn test_principal(id: &str) -> Principal {
    Principal::new(test_user_id(id), format!("{id}@opsdesk.test"))
}

/// An administrator profile.
#[must_use]
pub fn test_admin_profile(id: &str) -> Profile {
    Profile::new(test_user_id(id), Role::Admin)
}

/// A regular user limited to `paths`. An empty slice means unrestricted.
#[must_use]
pub fn test_restricted_profile(id: &str, paths: &[&str]) -> Profile {
    Profile::new(test_user_id(id), Role::User).with_page_permissions(Some(paths.iter().copied()))
}

/// Known desktop client at [`TEST_IP`].
#[must_use]
pub fn test_client() -> ClientInfo {
    ClientInfo {
        ip_address: TEST_IP.to_owned(),
        device: DeviceClass::Desktop,
        user_agent: Some(TEST_USER_AGENT.to_owned()),
    }
}

/// Build a snapshot from key/value pairs.
#[must_use]
pub fn test_snapshot(pairs: &[(&str, Value)]) -> Snapshot {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

/// An entry for `principal` at `created_at` from [`test_client`].
#[must_use]
pub fn test_entry(
    principal: &Principal,
    action_type: ActionType,
    created_at: DateTime<Utc>,
) -> AuditLogEntry {
    AuditLogEntry::create_at(
        principal,
        action_type,
        Some("item-42".to_owned()),
        format!("{action_type} item-42"),
        AuditMetadata::new().table("inventory"),
        test_client(),
        created_at,
    )
}

/// A file-backed store in a fresh temporary directory.
///
/// Keep the returned [`TempDir`] alive for as long as the store is used.
///
/// # Panics
///
/// Panics if the directory or store cannot be created.
#[must_use]
pub fn temp_file_store() -> (TempDir, Arc<FileKvStore>) {
    let dir = tempfile::tempdir().expect("temporary directory");
    let store = FileKvStore::open(dir.path().join("data.json")).expect("file store");
    (dir, Arc::new(store))
}
