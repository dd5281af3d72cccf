//! CSV rendering of audit entries.
//!
//! Every field is quoted, embedded quotes are doubled and rows end in CRLF,
//! so any RFC 4180 reader gets the original text back, including commas,
//! quotes and line breaks inside descriptions.

use chrono::SecondsFormat;

use crate::entry::{AuditLogEntry, Snapshot};

/// Column names, in output order.
pub const CSV_COLUMNS: [&str; 15] = [
    "id",
    "created_at",
    "user_id",
    "user_name",
    "user_email",
    "action_type",
    "table_name",
    "record_id",
    "description",
    "old_data",
    "new_data",
    "changed_fields",
    "ip_address",
    "device",
    "user_agent",
];

const ROW_END: &str = "\r\n";

/// Quote one field.
#[must_use]
pub fn quote(field: &str) -> String {
    let mut out = String::with_capacity(field.len().saturating_add(2));
    out.push('"');
    for c in field.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn snapshot_field(data: Option<&Snapshot>) -> String {
    data.and_then(|d| serde_json::to_string(d).ok())
        .unwrap_or_default()
}

fn row(entry: &AuditLogEntry) -> [String; 15] {
    [
        entry.id.to_string(),
        entry.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        entry.user_id.to_string(),
        entry.user_name.clone(),
        entry.user_email.clone(),
        entry.action_type.to_string(),
        entry.table_name.clone().unwrap_or_default(),
        entry.record_id.clone().unwrap_or_default(),
        entry.description.clone(),
        snapshot_field(entry.old_data.as_ref()),
        snapshot_field(entry.new_data.as_ref()),
        entry
            .changed_fields
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(";"),
        entry.ip_address.clone(),
        entry.device.to_string(),
        entry.user_agent.clone().unwrap_or_default(),
    ]
}

fn push_row<I, S>(out: &mut String, fields: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut first = true;
    for field in fields {
        if !first {
            out.push(',');
        }
        first = false;
        out.push_str(&quote(field.as_ref()));
    }
    out.push_str(ROW_END);
}

/// Render entries as CSV with a header row, in the order given.
#[must_use]
pub fn to_csv(entries: &[AuditLogEntry]) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_COLUMNS);
    for entry in entries {
        push_row(&mut out, row(entry));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientInfo;
    use crate::entry::{ActionType, AuditMetadata};
    use chrono::{TimeZone, Utc};
    use opsdesk_core::{Principal, UserId};
    use serde_json::json;

    fn sample(description: &str) -> AuditLogEntry {
        let principal = Principal::new(UserId::new("u-1").unwrap(), "ana@example.com");
        AuditLogEntry::create_at(
            &principal,
            ActionType::Update,
            Some("item-42".into()),
            description,
            AuditMetadata::new()
                .table("nvrs")
                .old_data(json!({"hd": 2}).as_object().unwrap().clone())
                .new_data(json!({"hd": 4, "site": "B"}).as_object().unwrap().clone()),
            ClientInfo::unknown(),
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        )
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("plain"), "\"plain\"");
        assert_eq!(quote(""), "\"\"");
        assert_eq!(quote("a,\"b\",c\n"), "\"a,\"\"b\"\",c\n\"");
    }

    #[test]
    fn test_header_only_when_empty() {
        let csv = to_csv(&[]);
        assert!(csv.starts_with("\"id\",\"created_at\","));
        assert!(csv.ends_with("\"user_agent\"\r\n"));
        assert_eq!(csv.matches("\r\n").count(), 1);
    }

    #[test]
    fn test_row_layout() {
        let entry = sample("Changed disks");
        let csv = to_csv(std::slice::from_ref(&entry));
        let row = csv.split("\r\n").nth(1).unwrap();

        assert!(row.starts_with(&format!("\"{}\",\"2024-05-01T12:30:00Z\"", entry.id)));
        assert!(row.contains("\"UPDATE\",\"nvrs\",\"item-42\",\"Changed disks\""));
        assert!(row.contains("\"{\"\"hd\"\":2}\""));
        assert!(row.contains("\"hd;site\""));
        assert!(row.ends_with("\"unknown\",\"Unknown\",\"\""));
    }
}
