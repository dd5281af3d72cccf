//! Audit command - record, list, export and scan the audit trail.

use std::path::Path;

use anyhow::Context as _;
use chrono::NaiveDate;
use colored::Colorize;
use opsdesk_audit::{ActionType, AuditMetadata, LogFilter, PageRequest, Snapshot};
use opsdesk_core::{Principal, UserId};

use crate::app::Services;
use crate::config_bridge;
use crate::theme::Theme;

/// Filter flags shared by `list` and `export`.
#[derive(Debug, Clone, Default, clap::Args)]
pub(crate) struct FilterArgs {
    /// Only entries by this user
    #[arg(long)]
    pub(crate) user: Option<UserId>,
    /// Only this action type (e.g. `PASSWORD_VIEWED`)
    #[arg(long)]
    pub(crate) action: Option<ActionType>,
    /// Only entries on this table
    #[arg(long)]
    pub(crate) table: Option<String>,
    /// First day, inclusive (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub(crate) from: Option<NaiveDate>,
    /// Last day, inclusive (YYYY-MM-DD, UTC)
    #[arg(long)]
    pub(crate) to: Option<NaiveDate>,
}

impl FilterArgs {
    pub(crate) fn to_filter(&self) -> LogFilter {
        let mut filter = LogFilter::all().between_days(self.from, self.to);
        if let Some(user) = &self.user {
            filter = filter.user(user.clone());
        }
        if let Some(action) = self.action {
            filter = filter.action(action);
        }
        if let Some(table) = &self.table {
            filter = filter.table(table);
        }
        filter
    }
}

/// What `audit record` writes.
#[derive(Debug, Clone)]
pub(crate) struct RecordRequest {
    pub(crate) action: ActionType,
    pub(crate) record_id: Option<String>,
    pub(crate) table: Option<String>,
    pub(crate) description: String,
    pub(crate) old_data: Option<String>,
    pub(crate) new_data: Option<String>,
}

fn parse_snapshot(flag: &str, raw: Option<&str>) -> anyhow::Result<Option<Snapshot>> {
    raw.map(|s| {
        serde_json::from_str::<Snapshot>(s)
            .with_context(|| format!("--{flag} must be a JSON object"))
    })
    .transpose()
}

/// Record one entry for `actor`.
pub(crate) async fn record(
    services: &Services,
    actor: &Principal,
    request: RecordRequest,
) -> anyhow::Result<()> {
    let mut metadata = AuditMetadata::new();
    if let Some(table) = request.table {
        metadata = metadata.table(table);
    }
    if let Some(old) = parse_snapshot("old", request.old_data.as_deref())? {
        metadata = metadata.old_data(old);
    }
    if let Some(new) = parse_snapshot("new", request.new_data.as_deref())? {
        metadata = metadata.new_data(new);
    }

    match services
        .recorder
        .log_action(
            actor,
            request.action,
            request.record_id.as_deref(),
            &request.description,
            metadata,
        )
        .await
    {
        Some(entry) => println!(
            "{}",
            Theme::success(&format!("Recorded {} ({})", entry.action_type, entry.id))
        ),
        None => println!("{}", Theme::warning("Audit entry could not be recorded")),
    }
    Ok(())
}

/// Print one page of entries.
pub(crate) async fn list(
    services: &Services,
    filter: &FilterArgs,
    page: usize,
    page_size: Option<usize>,
    json: bool,
) -> anyhow::Result<()> {
    let size = config_bridge::page_size(&services.config, page_size);
    let request = PageRequest::new(page, size)?;
    let result = services.query.fetch_page(&filter.to_filter(), request).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if result.entries.is_empty() {
        println!("{}", Theme::info("No audit entries"));
        return Ok(());
    }

    println!("\n{}", Theme::header("Audit Log"));
    println!(
        "{:<19} {:<8} {:<24} {:<16} {:<24} {}",
        "TIMESTAMP".dimmed(),
        "ID".dimmed(),
        "USER".dimmed(),
        "ACTION".dimmed(),
        "RECORD".dimmed(),
        "IP".dimmed()
    );
    println!("{}", Theme::separator());

    for entry in &result.entries {
        let record = match (&entry.table_name, &entry.record_id) {
            (Some(t), Some(r)) => format!("{t}/{r}"),
            (Some(t), None) => t.clone(),
            (None, Some(r)) => r.clone(),
            (None, None) => String::new(),
        };
        let action = if entry.action_type.is_failure() {
            entry.action_type.as_str().red().to_string()
        } else {
            entry.action_type.as_str().to_owned()
        };
        println!(
            "{} {} {:<24} {:<16} {:<24} {}",
            Theme::timestamp(&entry.created_at),
            Theme::short_id(&entry.id.to_string()),
            entry.user_name,
            action,
            record,
            entry.ip_address
        );
    }

    println!(
        "\n{}",
        Theme::dimmed(&format!(
            "Page {} of {} ({} entries)",
            result.page, result.total_pages, result.total_count
        ))
    );
    Ok(())
}

/// Export matching entries as CSV to `output` or stdout, then audit the
/// export itself.
pub(crate) async fn export(
    services: &Services,
    actor: &Principal,
    filter: &FilterArgs,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let filter = filter.to_filter();
    let rows = services.query.count_logs(&filter).await;
    let csv = services.query.export_csv(&filter).await;

    match output {
        Some(path) => {
            std::fs::write(path, &csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!(
                "{}",
                Theme::success(&format!("Exported {rows} entries to {}", path.display()))
            );
        },
        None => print!("{csv}"),
    }

    services
        .recorder
        .log_action(
            actor,
            ActionType::Export,
            None,
            &format!("Exported {rows} audit entries"),
            AuditMetadata::new().table("audit_logs"),
        )
        .await;
    Ok(())
}

/// Run the suspicious-activity heuristics for `user`.
pub(crate) async fn scan(services: &Services, user: &UserId, json: bool) -> anyhow::Result<()> {
    let report = services.detector.check(user).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if !report.has_alerts {
        println!("{}", Theme::success(&format!("No suspicious activity for {user}")));
        return Ok(());
    }

    println!("\n{}", Theme::header(&format!("Alerts for {user}")));
    println!("{}", Theme::separator());
    for alert in &report.alerts {
        println!("{:<8} {}", Theme::severity(alert.severity), alert.message);
    }
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use opsdesk_audit::{IpResolver, TracingNotifier};
    use opsdesk_config::Config;
    use opsdesk_storage::MemoryKvStore;
    use opsdesk_test::{parse_csv, test_principal, test_user_id};

    fn services() -> Services {
        Services::over(
            Arc::new(MemoryKvStore::new()),
            Config::default(),
            IpResolver::disabled(),
            Arc::new(TracingNotifier),
        )
        .unwrap()
    }

    fn request(action: ActionType) -> RecordRequest {
        RecordRequest {
            action,
            record_id: Some("pw-7".to_owned()),
            table: Some("passwords".to_owned()),
            description: "Viewed VPN password".to_owned(),
            old_data: None,
            new_data: None,
        }
    }

    #[tokio::test]
    async fn test_record_and_filter() {
        let services = services();
        let actor = test_principal("u-1");
        record(&services, &actor, request(ActionType::PasswordViewed))
            .await
            .unwrap();
        record(&services, &actor, request(ActionType::Update)).await.unwrap();

        let filter = FilterArgs {
            action: Some(ActionType::PasswordViewed),
            ..FilterArgs::default()
        };
        assert_eq!(services.query.count_logs(&filter.to_filter()).await, 1);
    }

    #[tokio::test]
    async fn test_record_rejects_non_object_snapshot() {
        let services = services();
        let mut req = request(ActionType::Update);
        req.old_data = Some("[1, 2]".to_owned());
        let err = record(&services, &test_principal("u-1"), req)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--old"));
    }

    #[tokio::test]
    async fn test_export_writes_file_and_audits_itself() {
        let services = services();
        let actor = test_principal("u-1");
        record(&services, &actor, request(ActionType::PasswordCopied))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.csv");
        export(&services, &actor, &FilterArgs::default(), Some(&path))
            .await
            .unwrap();

        let rows = parse_csv(&std::fs::read_to_string(&path).unwrap());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "id");

        let exports = FilterArgs {
            action: Some(ActionType::Export),
            ..FilterArgs::default()
        };
        assert_eq!(services.query.count_logs(&exports.to_filter()).await, 1);
    }

    #[tokio::test]
    async fn test_list_rejects_page_zero() {
        let services = services();
        assert!(list(&services, &FilterArgs::default(), 0, None, false).await.is_err());
    }

    #[tokio::test]
    async fn test_scan_quiet_user() {
        let services = services();
        scan(&services, &test_user_id("u-9"), true).await.unwrap();
    }
}
