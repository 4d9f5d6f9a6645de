//! `ClusterClient` backed by the Kubernetes API server.

use super::{kind_of, object_key, ClientError, ClusterClient, ManagedObject};
use crate::constants::FIELD_MANAGER;
use async_trait::async_trait;
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::Client;

/// Wraps a `kube::Client`
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl std::fmt::Debug for KubeClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClusterClient").finish_non_exhaustive()
    }
}

impl KubeClusterClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    fn api<K: ManagedObject>(&self, namespace: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        field_manager: Some(FIELD_MANAGER.to_string()),
        ..Default::default()
    }
}

/// Map API status codes onto the client error taxonomy
fn classify<K: ManagedObject>(error: kube::Error, namespace: &str, name: &str) -> ClientError {
    match error {
        kube::Error::Api(ref response) if response.code == 404 => ClientError::NotFound {
            kind: kind_of::<K>(),
            namespace: namespace.to_string(),
            name: name.to_string(),
        },
        kube::Error::Api(ref response) if response.code == 409 => {
            if response.reason == "AlreadyExists" {
                ClientError::AlreadyExists {
                    kind: kind_of::<K>(),
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                }
            } else {
                ClientError::Conflict {
                    kind: kind_of::<K>(),
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    message: response.message.clone(),
                }
            }
        }
        other => ClientError::Api(other),
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, ClientError> {
        match self.api::<K>(namespace).get(name).await {
            Ok(object) => Ok(Some(object)),
            Err(e) => match classify::<K>(e, namespace, name) {
                ClientError::NotFound { .. } => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn create<K: ManagedObject>(&self, object: &K) -> Result<K, ClientError> {
        let (namespace, name) = object_key(object);
        self.api::<K>(&namespace)
            .create(&post_params(), object)
            .await
            .map_err(|e| classify::<K>(e, &namespace, &name))
    }

    async fn replace<K: ManagedObject>(&self, object: &K) -> Result<K, ClientError> {
        let (namespace, name) = object_key(object);
        self.api::<K>(&namespace)
            .replace(&name, &post_params(), object)
            .await
            .map_err(|e| classify::<K>(e, &namespace, &name))
    }

    async fn delete<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, ClientError> {
        match self
            .api::<K>(namespace)
            .delete(name, &DeleteParams::background())
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match classify::<K>(e, namespace, name) {
                ClientError::NotFound { .. } => Ok(false),
                other => Err(other),
            },
        }
    }

    async fn patch_status<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        status: &serde_json::Value,
    ) -> Result<(), ClientError> {
        // resourceVersion in a merge patch makes the API server reject stale writes
        let mut patch = serde_json::json!({ "status": status });
        if let Some(rv) = resource_version {
            patch["metadata"] = serde_json::json!({ "resourceVersion": rv });
        }

        self.api::<K>(namespace)
            .patch_status(
                name,
                &PatchParams {
                    field_manager: Some(FIELD_MANAGER.to_string()),
                    ..Default::default()
                },
                &Patch::Merge(&patch),
            )
            .await
            .map(|_| ())
            .map_err(|e| classify::<K>(e, namespace, name))
    }
}
