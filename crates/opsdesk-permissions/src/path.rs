//! Route normalization.
//!
//! The dashboard router matches paths case-insensitively and ignores trailing
//! slashes, query strings and fragments. Allow-list entries and navigation
//! targets are both passed through [`normalize`] before comparison.

use std::collections::BTreeSet;

/// Map a raw route to its canonical form.
///
/// - surrounding whitespace, `?query` and `#fragment` are dropped
/// - segments are lowercased and trimmed; empty segments vanish
/// - the result has exactly one leading `/` and no trailing `/`
///   (except the root, `/`)
///
/// Total and idempotent: `normalize(&normalize(p)) == normalize(p)`.
///
/// ```
/// use opsdesk_permissions::normalize;
///
/// assert_eq!(normalize("/Senhas/"), "/senhas");
/// assert_eq!(normalize("senhas"), "/senhas");
/// assert_eq!(normalize("//nvr//hd/?tab=2"), "/nvr/hd");
/// assert_eq!(normalize(""), "/");
/// ```
#[must_use]
pub fn normalize(path: &str) -> String {
    let trimmed = path.trim();
    let route = trimmed
        .find(['?', '#'])
        .map_or(trimmed, |end| &trimmed[..end]);

    let mut out = String::with_capacity(route.len().saturating_add(1));
    for segment in route.split('/').map(str::trim).filter(|s| !s.is_empty()) {
        out.push('/');
        out.push_str(&segment.to_lowercase());
    }

    if out.is_empty() {
        out.push('/');
    }
    out
}

/// Normalize a raw `page_permissions` list as stored on a profile.
///
/// Non-string and blank entries are dropped instead of invalidating the
/// whole list. Duplicates collapse.
pub fn normalize_allow_list<'a, I>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a serde_json::Value>,
{
    values
        .into_iter()
        .filter_map(|value| match value.as_str() {
            Some(raw) if !raw.trim().is_empty() => Some(normalize(raw)),
            _ => {
                tracing::debug!(entry = %value, "ignoring malformed page permission entry");
                None
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leading_slash_added() {
        assert_eq!(normalize("home"), "/home");
        assert_eq!(normalize("/home"), "/home");
    }

    #[test]
    fn test_case_and_trailing_slash_invariant() {
        assert_eq!(normalize("/Senhas/"), normalize("/senhas"));
        assert_eq!(normalize("/SENHAS"), "/senhas");
    }

    #[test]
    fn test_repeated_slashes_collapse() {
        assert_eq!(normalize("///nvr////hd//"), "/nvr/hd");
    }

    #[test]
    fn test_query_and_fragment_dropped() {
        assert_eq!(normalize("/gastos?mes=3"), "/gastos");
        assert_eq!(normalize("/gastos#topo"), "/gastos");
        assert_eq!(normalize("/gastos/?a=1#b"), "/gastos");
    }

    #[test]
    fn test_root_and_empty() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("   "), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("//"), "/");
        assert_eq!(normalize("?x=1"), "/");
    }

    #[test]
    fn test_whitespace_segments_trimmed() {
        assert_eq!(normalize("  /Senhas / "), "/senhas");
        assert_eq!(normalize("/a/ /b"), "/a/b");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "/",
            "/Senhas/",
            "senhas",
            "//NVR//HD/?x#y",
            "  /a / b ",
            "/Configurações/",
            "/İstanbul",
            "#",
            "/?/",
        ];
        for raw in samples {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
            assert!(once.starts_with('/'));
            assert!(!once.starts_with("//"));
        }
    }

    #[test]
    fn test_allow_list_filters_malformed_entries() {
        let raw = [
            json!("/Senhas/"),
            json!(""),
            json!("   "),
            json!(42),
            json!(null),
            json!({"path": "/home"}),
            json!("home"),
            json!("/senhas"),
        ];
        let set = normalize_allow_list(&raw);
        let expected: BTreeSet<String> = ["/senhas", "/home"].iter().map(|s| (*s).to_owned()).collect();
        assert_eq!(set, expected);
    }

    #[test]
    fn test_allow_list_all_malformed_is_empty() {
        let raw = [json!(1), json!(false)];
        assert!(normalize_allow_list(&raw).is_empty());
    }
}
