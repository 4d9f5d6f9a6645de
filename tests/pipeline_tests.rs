//! # Reconcile Pipeline Tests
//!
//! Whole-cycle behavior against the in-memory cluster:
//! - a second cycle without external change writes nothing
//! - stale status writes surface as conflicts
//! - cancellation stops the cycle between components
//! - children carry owner references and standard labels

mod common;

use argocd_operator::constants::{LABEL_MANAGED_BY, LABEL_PART_OF, MANAGED_BY_OPERATOR, PART_OF_ARGOCD};
use argocd_operator::controller::reconciler::ReconcileError;
use argocd_operator::crd::{ArgoCD, ArgoCDApplicationSetSpec, ArgoCDDexSpec, ArgoCDSpec};
use argocd_operator::runtime::Capabilities;
use common::{argocd, cluster_with, stored, Harness, NAME, NAMESPACE};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ServiceAccount;
use serde_json::json;

fn full_spec() -> ArgoCDSpec {
    let mut spec = ArgoCDSpec {
        dex: Some(ArgoCDDexSpec {
            open_shift_oauth: true,
            ..Default::default()
        }),
        application_set: Some(ArgoCDApplicationSetSpec::default()),
        ..Default::default()
    };
    spec.notifications.enabled = true;
    spec.server.route.enabled = true;
    spec.server.ingress.enabled = true;
    spec
}

#[tokio::test]
async fn test_second_cycle_performs_no_mutations() {
    let (client, cr) = cluster_with(&argocd(full_spec()));
    let harness = Harness::new(Capabilities::openshift());

    let first = harness.cycle(&client, &cr).await.unwrap();
    assert!(first.is_clean());
    assert!(first.status_persisted);
    let counts = client.operation_counts();
    assert!(counts.creates >= 6, "expected children created: {counts:?}");
    assert_eq!(counts.status_updates, 1);

    client.reset_counts();
    let second = harness.cycle(&client, &stored(&client)).await.unwrap();
    assert!(!second.status_persisted);
    assert_eq!(client.operation_counts().mutations(), 0);
    assert_eq!(second.status, first.status);
}

#[tokio::test]
async fn test_status_records_reconciled_condition_and_generation() {
    let (client, cr) = cluster_with(&argocd(ArgoCDSpec::default()));
    Harness::new(Capabilities::kubernetes())
        .cycle(&client, &cr)
        .await
        .unwrap();

    let status = stored(&client).status.unwrap();
    assert_eq!(status.observed_generation, Some(1));
    let condition = status.condition("Reconciled").unwrap();
    assert_eq!(condition.status, "True");
    assert_eq!(condition.reason.as_deref(), Some("ReconcileSucceeded"));
    assert!(condition.last_transition_time.is_some());
}

#[tokio::test]
async fn test_stale_resource_version_is_a_conflict() {
    let (client, cr) = cluster_with(&argocd(ArgoCDSpec::default()));
    let harness = Harness::new(Capabilities::kubernetes());

    // someone else writes status after our read
    client
        .set_status::<ArgoCD>(NAMESPACE, NAME, json!({"phase": "Pending"}))
        .unwrap();

    let err = harness.cycle(&client, &cr).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Conflict { .. }));
    // corrections made before the status write stay in place
    assert_eq!(client.count::<ServiceAccount>(), 1);
}

#[tokio::test]
async fn test_cancelled_cycle_stops_before_components() {
    let (client, cr) = cluster_with(&argocd(full_spec()));
    let harness = Harness::new(Capabilities::openshift());
    harness.cancellation.cancel();

    let err = harness.cycle(&client, &cr).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Cancelled));
    assert_eq!(client.operation_counts().mutations(), 0);
}

#[tokio::test]
async fn test_children_are_owned_and_labelled() {
    let mut spec = ArgoCDSpec::default();
    spec.notifications.enabled = true;
    let (client, cr) = cluster_with(&argocd(spec));
    Harness::new(Capabilities::kubernetes())
        .cycle(&client, &cr)
        .await
        .unwrap();

    let deployment = client
        .object::<Deployment>(NAMESPACE, &format!("{NAME}-notifications-controller"))
        .unwrap();
    let owners = deployment.metadata.owner_references.unwrap();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].kind, "ArgoCD");
    assert_eq!(owners[0].name, NAME);
    assert_eq!(owners[0].controller, Some(true));

    let labels = deployment.metadata.labels.unwrap();
    assert_eq!(labels[LABEL_MANAGED_BY], MANAGED_BY_OPERATOR);
    assert_eq!(labels[LABEL_PART_OF], PART_OF_ARGOCD);
}

#[tokio::test]
async fn test_unmanaged_fields_are_left_alone() {
    let mut spec = ArgoCDSpec::default();
    spec.notifications.enabled = true;
    let (client, cr) = cluster_with(&argocd(spec));
    let harness = Harness::new(Capabilities::kubernetes());
    harness.cycle(&client, &cr).await.unwrap();

    let name = format!("{NAME}-notifications-controller");
    let mut deployment = client.object::<Deployment>(NAMESPACE, &name).unwrap();
    if let Some(spec) = deployment.spec.as_mut() {
        spec.revision_history_limit = Some(3);
    }
    client.seed(&deployment).unwrap();

    client.reset_counts();
    harness.cycle(&client, &stored(&client)).await.unwrap();
    assert_eq!(client.operation_counts().updates, 0);
    let after = client.object::<Deployment>(NAMESPACE, &name).unwrap();
    assert_eq!(after.spec.unwrap().revision_history_limit, Some(3));
}
