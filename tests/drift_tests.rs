//! # Drift Correction Tests
//!
//! How live children edited by other actors are treated across cycles:
//! - keys other controllers add to labels and annotations are kept
//! - identity fields (Deployment selector) are reported, never rewritten
//! - the Route host is only enforced once the ArgoCD names one
//! - Route fields the operator does not manage survive a correction

mod common;

use argocd_operator::controller::reconciler::ReconcileError;
use argocd_operator::crd::{ArgoCDSpec, Route, RoutePort};
use argocd_operator::runtime::Capabilities;
use common::{argocd, cluster_with, stored, Harness, NAME, NAMESPACE};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use serde_json::json;
use std::collections::BTreeMap;

const REVISION_ANNOTATION: &str = "deployment.kubernetes.io/revision";

fn notifications_name() -> String {
    format!("{NAME}-notifications-controller")
}

fn server_name() -> String {
    format!("{NAME}-server")
}

fn notifications_spec() -> ArgoCDSpec {
    let mut spec = ArgoCDSpec::default();
    spec.notifications.enabled = true;
    spec
}

fn route_spec() -> ArgoCDSpec {
    let mut spec = ArgoCDSpec::default();
    spec.server.route.enabled = true;
    spec
}

#[tokio::test]
async fn test_foreign_annotation_is_kept_without_update() {
    let (client, cr) = cluster_with(&argocd(notifications_spec()));
    let harness = Harness::new(Capabilities::kubernetes());
    harness.cycle(&client, &cr).await.unwrap();

    let mut deployment = client
        .object::<Deployment>(NAMESPACE, &notifications_name())
        .unwrap();
    deployment
        .metadata
        .annotations
        .get_or_insert_with(Default::default)
        .insert(REVISION_ANNOTATION.to_string(), "1".to_string());
    client.seed(&deployment).unwrap();

    client.reset_counts();
    harness.cycle(&client, &stored(&client)).await.unwrap();
    assert_eq!(client.operation_counts().updates, 0);

    let after = client
        .object::<Deployment>(NAMESPACE, &notifications_name())
        .unwrap();
    assert_eq!(
        after.metadata.annotations.unwrap()[REVISION_ANNOTATION],
        "1"
    );
}

#[tokio::test]
async fn test_owned_label_corrected_next_to_foreign_label() {
    let (client, cr) = cluster_with(&argocd(notifications_spec()));
    let harness = Harness::new(Capabilities::kubernetes());
    harness.cycle(&client, &cr).await.unwrap();

    let mut deployment = client
        .object::<Deployment>(NAMESPACE, &notifications_name())
        .unwrap();
    let labels = deployment
        .metadata
        .labels
        .get_or_insert_with(Default::default);
    labels.insert("app.kubernetes.io/part-of".to_string(), "other".to_string());
    labels.insert("team".to_string(), "platform".to_string());
    client.seed(&deployment).unwrap();

    client.reset_counts();
    harness.cycle(&client, &stored(&client)).await.unwrap();
    assert_eq!(client.operation_counts().updates, 1);

    let labels = client
        .object::<Deployment>(NAMESPACE, &notifications_name())
        .unwrap()
        .metadata
        .labels
        .unwrap();
    assert_eq!(labels["app.kubernetes.io/part-of"], "argocd");
    assert_eq!(labels["team"], "platform");
}

#[tokio::test]
async fn test_changed_selector_is_structural_drift() {
    let (client, cr) = cluster_with(&argocd(notifications_spec()));
    let harness = Harness::new(Capabilities::kubernetes());
    harness.cycle(&client, &cr).await.unwrap();

    let mut deployment = client
        .object::<Deployment>(NAMESPACE, &notifications_name())
        .unwrap();
    let foreign_selector = BTreeMap::from([("app".to_string(), "other".to_string())]);
    if let Some(spec) = deployment.spec.as_mut() {
        spec.selector.match_labels = Some(foreign_selector.clone());
    }
    client.seed(&deployment).unwrap();

    client.reset_counts();
    let report = harness.cycle(&client, &stored(&client)).await.unwrap();
    assert_eq!(report.component_errors.len(), 1);
    assert_eq!(report.component_errors[0].component, "notifications");
    assert!(matches!(
        report.component_errors[0].error,
        ReconcileError::StructuralDrift(_)
    ));

    let counts = client.operation_counts();
    assert_eq!(counts.updates, 0);
    assert_eq!(counts.creates, 0);
    assert_eq!(counts.deletes, 0);

    let live = client
        .object::<Deployment>(NAMESPACE, &notifications_name())
        .unwrap();
    assert_eq!(live.spec.unwrap().selector.match_labels, Some(foreign_selector));
}

#[tokio::test]
async fn test_route_host_enforced_only_when_named() {
    let (client, cr) = cluster_with(&argocd(route_spec()));
    let harness = Harness::new(Capabilities::openshift());
    harness.cycle(&client, &cr).await.unwrap();

    // router-assigned host is left alone
    let mut route = client.object::<Route>(NAMESPACE, &server_name()).unwrap();
    route.spec.host = Some("argocd-server-argocd.apps.example.com".to_string());
    client.seed(&route).unwrap();

    client.reset_counts();
    harness.cycle(&client, &stored(&client)).await.unwrap();
    assert_eq!(client.operation_counts().updates, 0);

    let mut named = stored(&client);
    named.spec.server.host = Some("argocd.example.com".to_string());
    let named = client.seed(&named).unwrap();

    client.reset_counts();
    harness.cycle(&client, &named).await.unwrap();
    assert_eq!(client.operation_counts().updates, 1);
    let route = client.object::<Route>(NAMESPACE, &server_name()).unwrap();
    assert_eq!(route.spec.host.as_deref(), Some("argocd.example.com"));
}

#[tokio::test]
async fn test_route_correction_keeps_unmanaged_fields() {
    let (client, cr) = cluster_with(&argocd(route_spec()));
    let harness = Harness::new(Capabilities::openshift());
    harness.cycle(&client, &cr).await.unwrap();

    let mut route = client.object::<Route>(NAMESPACE, &server_name()).unwrap();
    route.spec.port = Some(RoutePort {
        target_port: IntOrString::Int(8080),
    });
    route.spec.extra.insert("path".to_string(), json!("/ui"));
    client.seed(&route).unwrap();

    client.reset_counts();
    let report = harness.cycle(&client, &stored(&client)).await.unwrap();
    assert!(report.is_clean());
    assert_eq!(client.operation_counts().updates, 1);

    let route = client.object::<Route>(NAMESPACE, &server_name()).unwrap();
    assert_eq!(
        route.spec.port.map(|p| p.target_port),
        Some(IntOrString::String("http".to_string()))
    );
    assert_eq!(route.spec.extra.get("path"), Some(&json!("/ui")));
}
