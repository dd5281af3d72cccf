//! Query filters and pagination.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use opsdesk_core::UserId;
use serde::{Deserialize, Serialize};

use crate::entry::{ActionType, AuditLogEntry};
use crate::error::{AuditError, AuditResult};

/// Criteria for selecting audit entries. Unset fields match everything;
/// set fields are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    /// Only entries by this user.
    pub user_id: Option<UserId>,
    /// Only entries of this action type.
    pub action_type: Option<ActionType>,
    /// Only entries for this table.
    pub table_name: Option<String>,
    /// Earliest `created_at`, inclusive.
    pub start: Option<DateTime<Utc>>,
    /// Latest `created_at`, inclusive.
    pub end: Option<DateTime<Utc>>,
}

impl LogFilter {
    /// Match everything.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to one user.
    #[must_use]
    pub fn user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Restrict to one action type.
    #[must_use]
    pub fn action(mut self, action_type: ActionType) -> Self {
        self.action_type = Some(action_type);
        self
    }

    /// Restrict to one table.
    #[must_use]
    pub fn table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    /// Restrict to an inclusive time range.
    #[must_use]
    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Restrict to whole calendar days (UTC), both inclusive.
    #[must_use]
    pub fn between_days(self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        let start = start.map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)));
        let end = end.and_then(|d| {
            NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999)
                .map(|t| Utc.from_utc_datetime(&d.and_time(t)))
        });
        self.between(start, end)
    }

    /// Whether `entry` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.user_id.as_ref().is_none_or(|u| *u == entry.user_id)
            && self.action_type.is_none_or(|a| a == entry.action_type)
            && self
                .table_name
                .as_deref()
                .is_none_or(|t| entry.table_name.as_deref() == Some(t))
            && self.start.is_none_or(|s| entry.created_at >= s)
            && self.end.is_none_or(|e| entry.created_at <= e)
    }
}

/// One page of a paginated query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    /// A 1-indexed page request.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidPage`] if `page` or `page_size` is zero.
    pub fn new(page: usize, page_size: usize) -> AuditResult<Self> {
        if page == 0 || page_size == 0 {
            return Err(AuditError::InvalidPage { page, page_size });
        }
        Ok(Self { page, page_size })
    }

    /// Page number, starting at 1.
    #[must_use]
    pub fn page(self) -> usize {
        self.page
    }

    /// Entries per page.
    #[must_use]
    pub fn page_size(self) -> usize {
        self.page_size
    }

    /// Entries to skip.
    #[must_use]
    pub fn offset(self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }

    /// Entries to take.
    #[must_use]
    pub fn limit(self) -> usize {
        self.page_size
    }
}

/// Number of pages needed for `count` entries.
#[must_use]
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    count.div_ceil(page_size)
}

/// A page of entries with totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    /// Entries on this page, newest first.
    pub entries: Vec<AuditLogEntry>,
    /// Entries matching the filter across all pages.
    pub total_count: usize,
    /// Number of pages.
    pub total_pages: usize,
    /// This page's number.
    pub page: usize,
}

impl LogPage {
    /// An empty page.
    #[must_use]
    pub fn empty(page: usize) -> Self {
        Self {
            entries: Vec::new(),
            total_count: 0,
            total_pages: 0,
            page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientInfo;
    use crate::entry::AuditMetadata;
    use chrono::Duration;
    use opsdesk_core::Principal;

    fn entry(user: &str, action: ActionType, table: Option<&str>, at: DateTime<Utc>) -> AuditLogEntry {
        let principal = Principal::new(UserId::new(user).unwrap(), format!("{user}@example.com"));
        let mut metadata = AuditMetadata::new();
        if let Some(t) = table {
            metadata = metadata.table(t);
        }
        AuditLogEntry::create_at(&principal, action, None, "x", metadata, ClientInfo::unknown(), at)
    }

    #[test]
    fn test_page_request_rejects_zero() {
        assert!(PageRequest::new(0, 50).is_err());
        assert!(PageRequest::new(1, 0).is_err());
    }

    #[test]
    fn test_offsets() {
        assert_eq!(PageRequest::new(1, 50).unwrap().offset(), 0);
        assert_eq!(PageRequest::new(3, 50).unwrap().offset(), 100);
        assert_eq!(PageRequest::new(4, 50).unwrap().limit(), 50);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(120, 50), 3);
        assert_eq!(total_pages(100, 50), 2);
        assert_eq!(total_pages(0, 50), 0);
        assert_eq!(total_pages(1, 50), 1);
    }

    #[test]
    fn test_filter_and_combination() {
        let now = Utc::now();
        let e = entry("u-1", ActionType::Delete, Some("nvrs"), now);

        assert!(LogFilter::all().matches(&e));
        let by_user = LogFilter::all().user(UserId::new("u-1").unwrap());
        assert!(by_user.clone().action(ActionType::Delete).matches(&e));
        assert!(!by_user.action(ActionType::Create).matches(&e));
        assert!(!LogFilter::all().table("passwords").matches(&e));
        assert!(LogFilter::all().table("nvrs").matches(&e));
    }

    #[test]
    fn test_table_filter_excludes_entries_without_table() {
        let e = entry("u-1", ActionType::Login, None, Utc::now());
        assert!(!LogFilter::all().table("nvrs").matches(&e));
    }

    #[test]
    fn test_range_inclusive() {
        let now = Utc::now();
        let e = entry("u-1", ActionType::Login, None, now);

        let later = now.checked_add_signed(Duration::seconds(1)).unwrap();
        let earlier = now.checked_sub_signed(Duration::seconds(1)).unwrap();

        assert!(LogFilter::all().between(Some(now), Some(now)).matches(&e));
        assert!(!LogFilter::all().between(Some(later), None).matches(&e));
        assert!(!LogFilter::all().between(None, Some(earlier)).matches(&e));
    }

    #[test]
    fn test_between_days_covers_whole_day() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let filter = LogFilter::all().between_days(Some(day), Some(day));

        let morning = Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap();
        let night = Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 59).unwrap();
        let next = Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap();

        assert!(filter.matches(&entry("u", ActionType::Login, None, morning)));
        assert!(filter.matches(&entry("u", ActionType::Login, None, night)));
        assert!(!filter.matches(&entry("u", ActionType::Login, None, next)));
    }
}
