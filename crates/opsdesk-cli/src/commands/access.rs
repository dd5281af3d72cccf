//! Access command - check and grant page permissions.

use anyhow::Context as _;
use opsdesk_audit::{ActionType, AuditMetadata, Snapshot};
use opsdesk_core::{Principal, Role, UserId};
use opsdesk_permissions::{Profile, ProfileStore};

use crate::app::Services;
use crate::theme::Theme;

/// Check whether `user` may open `path`. Returns the decision.
///
/// A denial is written to the audit trail as [`ActionType::AccessDenied`].
pub(crate) async fn check(
    services: &Services,
    user: &Principal,
    path: &str,
    json: bool,
) -> anyhow::Result<bool> {
    let decision = services.resolver.check(user, path).await;

    if !decision.allowed {
        services
            .recorder
            .log_action(
                user,
                ActionType::AccessDenied,
                None,
                &format!("Access denied to {}", decision.path),
                AuditMetadata::new().extra("path", decision.path.clone()),
            )
            .await;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&decision)?);
    } else {
        println!(
            "{} {} {} ({})",
            Theme::decision(decision.allowed),
            user.id,
            decision.path,
            Theme::dimmed(decision.reason.as_str())
        );
    }

    Ok(decision.allowed)
}

/// What a grant sets on the profile.
#[derive(Debug, Clone)]
pub(crate) struct Grant {
    pub(crate) user: UserId,
    pub(crate) role: Role,
    /// `None` lifts the restriction.
    pub(crate) paths: Option<Vec<String>>,
    pub(crate) full_name: Option<String>,
}

fn snapshot(profile: &Profile) -> Option<Snapshot> {
    match serde_json::to_value(profile) {
        Ok(serde_json::Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Create or replace a profile and audit the change.
pub(crate) async fn grant(
    services: &Services,
    actor: &Principal,
    grant: Grant,
) -> anyhow::Result<Profile> {
    let previous = services
        .profiles
        .get_profile(&grant.user)
        .await
        .context("failed to read current profile")?;

    let mut profile = Profile::new(grant.user.clone(), grant.role)
        .with_page_permissions(grant.paths.clone());
    profile.full_name = grant
        .full_name
        .clone()
        .or_else(|| previous.as_ref().and_then(|p| p.full_name.clone()));

    services
        .profiles
        .put_profile(&profile)
        .await
        .context("failed to store profile")?;

    let mut metadata = AuditMetadata::new().table("profiles");
    if let Some(old) = previous.as_ref().and_then(snapshot) {
        metadata = metadata.old_data(old);
    }
    if let Some(new) = snapshot(&profile) {
        metadata = metadata.new_data(new);
    }
    services
        .recorder
        .log_action(
            actor,
            ActionType::PermissionChanged,
            Some(grant.user.as_str()),
            &format!("Updated permissions of {}", grant.user),
            metadata,
        )
        .await;

    let scope = match &grant.paths {
        Some(paths) if !paths.is_empty() => paths.join(", "),
        _ => "all pages".to_owned(),
    };
    println!(
        "{}",
        Theme::success(&format!("{} is now {} ({scope})", grant.user, grant.role))
    );

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use opsdesk_audit::{IpResolver, LogFilter, TracingNotifier};
    use opsdesk_config::Config;
    use opsdesk_storage::MemoryKvStore;
    use opsdesk_test::{test_principal, test_user_id};

    fn services() -> Services {
        Services::over(
            Arc::new(MemoryKvStore::new()),
            Config::default(),
            IpResolver::disabled(),
            Arc::new(TracingNotifier),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_grant_then_check() {
        let services = services();
        let admin = test_principal("admin-1");

        grant(
            &services,
            &admin,
            Grant {
                user: test_user_id("u-1"),
                role: Role::User,
                paths: Some(vec!["/senhas".to_owned(), "/home".to_owned()]),
                full_name: Some("Ana".to_owned()),
            },
        )
        .await
        .unwrap();

        let user = test_principal("u-1");
        assert!(check(&services, &user, "/senhas", false).await.unwrap());
        assert!(!check(&services, &user, "/configuracoes", false).await.unwrap());

        let changed = services
            .query
            .count_logs(&LogFilter::all().action(ActionType::PermissionChanged))
            .await;
        let denied = services
            .query
            .count_logs(&LogFilter::all().action(ActionType::AccessDenied))
            .await;
        assert_eq!(changed, 1);
        assert_eq!(denied, 1);
    }

    #[tokio::test]
    async fn test_regrant_keeps_name_and_records_old_data() {
        let services = services();
        let admin = test_principal("admin-1");
        let base = Grant {
            user: test_user_id("u-2"),
            role: Role::User,
            paths: Some(vec!["/home".to_owned()]),
            full_name: Some("Bruno".to_owned()),
        };
        grant(&services, &admin, base.clone()).await.unwrap();

        let profile = grant(
            &services,
            &admin,
            Grant {
                paths: None,
                full_name: None,
                ..base
            },
        )
        .await
        .unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Bruno"));

        let logs = services
            .query
            .fetch_logs(
                &LogFilter::all(),
                opsdesk_audit::PageRequest::new(1, 10).unwrap(),
            )
            .await;
        let latest = logs
            .iter()
            .find(|e| e.old_data.is_some())
            .expect("second grant records the previous profile");
        assert!(latest.changed_fields.contains("page_permissions"));
    }
}
