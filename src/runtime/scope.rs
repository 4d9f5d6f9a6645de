//! # Namespace Scope
//!
//! Turns the `WATCH_NAMESPACE` setting into the set of namespaces the
//! operator watches.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use thiserror::Error;

static DNS1123_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]{0,61}[a-z0-9])?$")
        .expect("Failed to compile DNS-1123 label regex - this should never happen")
});

/// Namespaces watched by the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceScope {
    /// Cluster-wide
    All,
    /// Allow-list, deduplicated and sorted
    Namespaces(BTreeSet<String>),
}

impl NamespaceScope {
    pub fn contains(&self, namespace: &str) -> bool {
        match self {
            Self::All => true,
            Self::Namespaces(set) => set.contains(namespace),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("WATCH_NAMESPACE '{raw}' does not name any namespace")]
    EmptyAllowList { raw: String },
    #[error("'{namespace}' is not a valid namespace name")]
    InvalidNamespace { namespace: String },
}

/// Resolve the raw `WATCH_NAMESPACE` value
///
/// Unset or blank means cluster-wide. Otherwise a comma-separated list of
/// namespace names.
pub fn resolve_namespace_scope(raw: Option<&str>) -> Result<NamespaceScope, ScopeError> {
    let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
        return Ok(NamespaceScope::All);
    };

    let mut namespaces = BTreeSet::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        if !DNS1123_LABEL.is_match(entry) {
            return Err(ScopeError::InvalidNamespace {
                namespace: entry.to_string(),
            });
        }
        namespaces.insert(entry.to_string());
    }

    if namespaces.is_empty() {
        return Err(ScopeError::EmptyAllowList {
            raw: raw.to_string(),
        });
    }
    Ok(NamespaceScope::Namespaces(namespaces))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_and_blank_are_cluster_wide() {
        assert_eq!(resolve_namespace_scope(None), Ok(NamespaceScope::All));
        assert_eq!(resolve_namespace_scope(Some("")), Ok(NamespaceScope::All));
        assert_eq!(resolve_namespace_scope(Some("  ")), Ok(NamespaceScope::All));
    }

    #[test]
    fn test_list_is_trimmed_and_deduplicated() {
        let scope = resolve_namespace_scope(Some(" argocd, team-a ,argocd")).unwrap();
        let NamespaceScope::Namespaces(set) = scope else {
            panic!("expected namespace allow-list");
        };
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec!["argocd".to_string(), "team-a".to_string()]
        );
    }

    #[test]
    fn test_separators_only_is_an_error() {
        assert!(matches!(
            resolve_namespace_scope(Some(" , ,")),
            Err(ScopeError::EmptyAllowList { .. })
        ));
    }

    #[test]
    fn test_invalid_namespace() {
        assert_eq!(
            resolve_namespace_scope(Some("argocd,Team_A")),
            Err(ScopeError::InvalidNamespace {
                namespace: "Team_A".to_string()
            })
        );
        assert!(resolve_namespace_scope(Some(&"a".repeat(64))).is_err());
    }

    #[test]
    fn test_contains() {
        let scope = resolve_namespace_scope(Some("argocd")).unwrap();
        assert!(scope.contains("argocd"));
        assert!(!scope.contains("default"));
        assert!(NamespaceScope::All.contains("anything"));
    }
}
