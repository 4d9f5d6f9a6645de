//! # Cluster Client
//!
//! The narrow slice of the Kubernetes API the reconciler depends on: typed
//! get/create/replace/delete of namespaced objects and status writes.
//!
//! Two implementations exist:
//!
//! - [`KubeClusterClient`] talks to the API server through `kube::Api`
//! - [`InMemoryClient`] keeps objects in a map and is used by the tests

mod kube_client;
pub mod memory;

pub use kube_client::KubeClusterClient;
pub use memory::{InMemoryClient, OperationCounts};

use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::Resource;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use thiserror::Error;

/// Any namespaced, typed Kubernetes object the reconciler can manage
pub trait ManagedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> ManagedObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// Errors surfaced by a [`ClusterClient`]
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: String,
        namespace: String,
        name: String,
    },
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: String,
        namespace: String,
        name: String,
    },
    #[error("conflicting write to {kind} {namespace}/{name}: {message}")]
    Conflict {
        kind: String,
        namespace: String,
        name: String,
        message: String,
    },
    #[error("Kubernetes API error: {0}")]
    Api(#[source] kube::Error),
    #[error("failed to convert {kind}: {source}")]
    Serialization {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Typed access to namespaced objects
///
/// `get` and `delete` treat absence as a normal outcome (`None` / `false`).
/// `replace` and `patch_status` carry a resourceVersion and fail with
/// [`ClientError::Conflict`] when it is stale.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    async fn get<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, ClientError>;

    async fn create<K: ManagedObject>(&self, object: &K) -> Result<K, ClientError>;

    async fn replace<K: ManagedObject>(&self, object: &K) -> Result<K, ClientError>;

    async fn delete<K: ManagedObject>(&self, namespace: &str, name: &str)
        -> Result<bool, ClientError>;

    /// Merge `status` into the status sub-resource
    async fn patch_status<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        status: &serde_json::Value,
    ) -> Result<(), ClientError>;
}

/// `(namespace, name)` of an object, as set in its metadata
pub fn object_key<K: ManagedObject>(object: &K) -> (String, String) {
    let meta = object.meta();
    (
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    )
}

/// Kind name used in errors and logs
pub fn kind_of<K: ManagedObject>() -> String {
    K::kind(&()).to_string()
}
