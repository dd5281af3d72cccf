//! Prelude module - commonly used test utilities.
//!
//! Use `use opsdesk_test::prelude::*;` to import all essential items.

// Fixtures
pub use crate::{
    test_admin_profile, test_client, test_entry, test_principal, test_restricted_profile,
    test_snapshot, test_user_id, temp_file_store,
};

// Mocks
pub use crate::{CountingIpLookup, FailingProfileStore, MockAuditStore, RecordingNotifier};

// Capture and parsing
pub use crate::{LogCapture, capture_logs, parse_csv};
