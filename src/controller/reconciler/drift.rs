//! # Drift Reconciliation
//!
//! Converges one child object onto its desired form: create when absent,
//! correct mismatching managed fields in place, refuse to touch identity
//! fields. Deletion is idempotent.

use super::comparison::{FieldComparisonResult, ManagedKind};
use super::error::{ReconcileError, StructuralDriftError};
use crate::client::{kind_of, object_key, ClusterClient, ManagedObject};
use crate::controller::synthesize::{DesiredObject, ObjectKind, ObjectRef};
use crate::crd::Route;
use crate::observability;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::RoleBinding;
use serde_json::Value;
use tracing::{debug, info, warn};

/// What a single reconcile did to the live object
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Convergence {
    Created,
    /// Managed paths that were rewritten
    Updated(Vec<&'static str>),
    Unchanged,
}

fn to_json<K: ManagedObject>(object: &K) -> Result<Value, ReconcileError> {
    serde_json::to_value(object).map_err(|source| ReconcileError::Serialization {
        kind: kind_of::<K>(),
        source,
    })
}

/// Bring the live object in line with `desired`
pub async fn reconcile_object<C, K>(client: &C, desired: &K) -> Result<Convergence, ReconcileError>
where
    C: ClusterClient,
    K: ManagedKind,
{
    let kind = kind_of::<K>();
    let (namespace, name) = object_key(desired);

    let Some(observed) = client.get::<K>(&namespace, &name).await? else {
        client.create(desired).await?;
        info!(kind = %kind, resource.name = %name, resource.namespace = %namespace, "Created {kind} {namespace}/{name}");
        return Ok(Convergence::Created);
    };

    let mut observed_json = to_json(&observed)?;
    let desired_json = to_json(desired)?;
    let comparison =
        FieldComparisonResult::evaluate(K::MANAGED_FIELDS, &observed_json, &desired_json);

    if let Some(drift) = comparison.identity_mismatch() {
        warn!(
            kind = %kind,
            resource.name = %name,
            resource.namespace = %namespace,
            field = drift.path,
            "Structural drift on {kind} {namespace}/{name}: {} cannot be changed in place",
            drift.path
        );
        observability::metrics::increment_structural_drift(&kind);
        return Err(StructuralDriftError {
            kind,
            namespace,
            name,
            field: drift.path.to_string(),
            existing: drift.existing.clone(),
            desired: drift.desired.clone(),
        }
        .into());
    }

    if comparison.is_match() {
        debug!("{kind} {namespace}/{name} is up to date");
        return Ok(Convergence::Unchanged);
    }

    // observed metadata (resourceVersion included) is kept, so the replace is
    // rejected if someone else wrote the object since we read it
    let paths = comparison.apply_desired(&mut observed_json);
    let corrected: K =
        serde_json::from_value(observed_json).map_err(|source| ReconcileError::Serialization {
            kind: kind.clone(),
            source,
        })?;
    client.replace(&corrected).await?;

    info!(
        kind = %kind,
        resource.name = %name,
        resource.namespace = %namespace,
        "Corrected drift on {kind} {namespace}/{name}: {}",
        paths.join(", ")
    );
    observability::metrics::increment_drift_corrections(&kind);
    Ok(Convergence::Updated(paths))
}

/// Delete an object; absence counts as success and returns `false`
pub async fn delete_object<C, K>(
    client: &C,
    namespace: &str,
    name: &str,
) -> Result<bool, ReconcileError>
where
    C: ClusterClient,
    K: ManagedObject,
{
    let deleted = client.delete::<K>(namespace, name).await?;
    if deleted {
        info!("Deleted {} {namespace}/{name}", kind_of::<K>());
    }
    Ok(deleted)
}

/// Delete and create `desired` again
///
/// The only way to change an identity field. Never called by the reconcile
/// pipeline; exposed for operators through `argocdctl recreate`.
pub async fn recreate_object<C, K>(client: &C, desired: &K) -> Result<K, ReconcileError>
where
    C: ClusterClient,
    K: ManagedObject,
{
    let (namespace, name) = object_key(desired);
    delete_object::<C, K>(client, &namespace, &name).await?;
    let created = client.create(desired).await?;
    info!("Recreated {} {namespace}/{name}", kind_of::<K>());
    Ok(created)
}

/// [`reconcile_object`] over any desired object
pub async fn converge_desired<C: ClusterClient>(
    client: &C,
    desired: &DesiredObject,
) -> Result<Convergence, ReconcileError> {
    match desired {
        DesiredObject::RoleBinding(o) => reconcile_object(client, o).await,
        DesiredObject::ServiceAccount(o) => reconcile_object(client, o).await,
        DesiredObject::Deployment(o) => reconcile_object(client, o).await,
        DesiredObject::Ingress(o) => reconcile_object(client, o).await,
        DesiredObject::Route(o) => reconcile_object(client, o).await,
    }
}

/// [`delete_object`] over any object reference
pub async fn delete_ref<C: ClusterClient>(
    client: &C,
    object: &ObjectRef,
) -> Result<bool, ReconcileError> {
    let (namespace, name) = (object.namespace.as_str(), object.name.as_str());
    match object.kind {
        ObjectKind::RoleBinding => delete_object::<C, RoleBinding>(client, namespace, name).await,
        ObjectKind::ServiceAccount => {
            delete_object::<C, ServiceAccount>(client, namespace, name).await
        }
        ObjectKind::Deployment => delete_object::<C, Deployment>(client, namespace, name).await,
        ObjectKind::Ingress => delete_object::<C, Ingress>(client, namespace, name).await,
        ObjectKind::Route => delete_object::<C, Route>(client, namespace, name).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryClient;
    use crate::controller::synthesize::redis_service_account;
    use crate::crd::{ArgoCD, ArgoCDSpec};

    fn argocd() -> ArgoCD {
        let mut cr = ArgoCD::new("test-argocd", ArgoCDSpec::default());
        cr.metadata.namespace = Some("argocd".to_string());
        cr
    }

    #[tokio::test]
    async fn test_create_then_unchanged() {
        let client = InMemoryClient::new();
        let desired = redis_service_account(&argocd());

        assert_eq!(
            reconcile_object(&client, &desired).await.unwrap(),
            Convergence::Created
        );
        assert_eq!(
            reconcile_object(&client, &desired).await.unwrap(),
            Convergence::Unchanged
        );
        assert_eq!(client.operation_counts().mutations(), 1);
    }

    #[tokio::test]
    async fn test_label_drift_is_corrected() {
        let client = InMemoryClient::new();
        let desired = redis_service_account(&argocd());
        let mut live = client.create(&desired).await.unwrap();
        live.metadata
            .labels
            .get_or_insert_with(Default::default)
            .insert("app.kubernetes.io/part-of".to_string(), "something-else".to_string());
        client.replace(&live).await.unwrap();

        let outcome = reconcile_object(&client, &desired).await.unwrap();
        assert_eq!(outcome, Convergence::Updated(vec!["/metadata/labels"]));

        let restored: ServiceAccount = client.object("argocd", "test-argocd-redis").unwrap();
        assert_eq!(restored.metadata.labels, desired.metadata.labels);
    }

    #[tokio::test]
    async fn test_recreate_replaces_object() {
        let client = InMemoryClient::new();
        let desired = redis_service_account(&argocd());
        let first = client.create(&desired).await.unwrap();

        let second = recreate_object(&client, &desired).await.unwrap();
        assert_ne!(first.metadata.resource_version, second.metadata.resource_version);
        assert_eq!(client.operation_counts().deletes, 1);
        assert_eq!(client.operation_counts().creates, 2);
    }

    #[tokio::test]
    async fn test_delete_ref_absent() {
        let client = InMemoryClient::new();
        let object = ObjectRef::new(ObjectKind::Deployment, "argocd", "missing");
        assert!(!delete_ref(&client, &object).await.unwrap());
    }
}
