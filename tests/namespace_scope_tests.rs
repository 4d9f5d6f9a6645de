//! # Namespace Scope Tests
//!
//! `WATCH_NAMESPACE` as read through the controller configuration and
//! resolved into the watched namespace set.

use argocd_operator::config::ControllerConfig;
use argocd_operator::runtime::{resolve_namespace_scope, NamespaceScope, ScopeError};
use std::collections::BTreeSet;

fn scope_for(raw: Option<&str>) -> Result<NamespaceScope, ScopeError> {
    let config = ControllerConfig::from_lookup(|key| {
        (key == "WATCH_NAMESPACE").then(|| raw.map(str::to_string)).flatten()
    });
    resolve_namespace_scope(config.watch_namespace.as_deref())
}

#[test]
fn test_unset_watches_all_namespaces() {
    assert_eq!(scope_for(None), Ok(NamespaceScope::All));
    assert_eq!(scope_for(Some(" ")), Ok(NamespaceScope::All));
}

#[test]
fn test_allow_list() {
    let expected: BTreeSet<String> = ["argocd", "team-a", "team-b"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(
        scope_for(Some("team-b,argocd, team-a,argocd")),
        Ok(NamespaceScope::Namespaces(expected))
    );
}

#[test]
fn test_single_namespace() {
    let scope = scope_for(Some("argocd")).unwrap();
    assert!(scope.contains("argocd"));
    assert!(!scope.contains("kube-system"));
}

#[test]
fn test_rejected_values() {
    assert!(matches!(
        scope_for(Some(",")),
        Err(ScopeError::EmptyAllowList { .. })
    ));
    assert!(matches!(
        scope_for(Some("argocd,-bad")),
        Err(ScopeError::InvalidNamespace { namespace }) if namespace == "-bad"
    ));
    assert!(matches!(
        scope_for(Some("argo.cd")),
        Err(ScopeError::InvalidNamespace { .. })
    ));
}
