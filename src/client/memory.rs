//! In-memory cluster client for testing
//!
//! Stores objects as JSON keyed by `(kind, namespace, name)`. Writes bump a
//! resourceVersion counter so optimistic concurrency behaves like the API
//! server: a replace or status write carrying a stale version is rejected.

use super::{kind_of, object_key, ClientError, ClusterClient, ManagedObject};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

type ObjectKey = (String, String, String);

/// In-memory `ClusterClient`
#[derive(Debug, Clone, Default)]
pub struct InMemoryClient {
    /// Storage: (kind, namespace, name) -> object JSON
    store: Arc<RwLock<BTreeMap<ObjectKey, Value>>>,
    /// Track operation counts for assertions
    operations: Arc<RwLock<OperationCounts>>,
    next_version: Arc<AtomicU64>,
}

/// Counts of operations performed for testing assertions
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OperationCounts {
    pub gets: usize,
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
    pub status_updates: usize,
}

impl OperationCounts {
    /// Writes that changed stored state
    pub fn mutations(&self) -> usize {
        self.creates + self.updates + self.deletes + self.status_updates
    }
}

fn key<K: ManagedObject>(namespace: &str, name: &str) -> ObjectKey {
    (kind_of::<K>(), namespace.to_string(), name.to_string())
}

fn stored_version(value: &Value) -> Option<&str> {
    value
        .pointer("/metadata/resourceVersion")
        .and_then(Value::as_str)
}

fn to_json<K: ManagedObject>(object: &K) -> Result<Value, ClientError> {
    serde_json::to_value(object).map_err(|source| ClientError::Serialization {
        kind: kind_of::<K>(),
        source,
    })
}

fn from_json<K: ManagedObject>(value: Value) -> Result<K, ClientError> {
    serde_json::from_value(value).map_err(|source| ClientError::Serialization {
        kind: kind_of::<K>(),
        source,
    })
}

/// JSON merge patch (RFC 7386): objects merge, null removes, anything else replaces
fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target_map) = target {
        for (field, value) in patch_map {
            if value.is_null() {
                target_map.remove(field);
            } else {
                merge_patch(
                    target_map.entry(field.clone()).or_insert(Value::Null),
                    value,
                );
            }
        }
    }
}

impl InMemoryClient {
    /// Create a new empty client
    pub fn new() -> Self {
        Self::default()
    }

    fn store_read(&self) -> RwLockReadGuard<'_, BTreeMap<ObjectKey, Value>> {
        self.store.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn store_write(&self) -> RwLockWriteGuard<'_, BTreeMap<ObjectKey, Value>> {
        self.store.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, op: impl FnOnce(&mut OperationCounts)) {
        let mut ops = self
            .operations
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        op(&mut *ops);
    }

    fn stamp(&self, value: &mut Value) {
        let version = self.next_version.fetch_add(1, Ordering::SeqCst) + 1;
        value["metadata"]["resourceVersion"] = Value::String(version.to_string());
    }

    /// Store an object as-is (status included) without counting an operation.
    /// Returns the stored object with its assigned resourceVersion.
    pub fn seed<K: ManagedObject>(&self, object: &K) -> Result<K, ClientError> {
        let (namespace, name) = object_key(object);
        let mut value = to_json(object)?;
        if value.pointer("/metadata/uid").is_none() {
            value["metadata"]["uid"] = Value::String(format!("{namespace}-{name}-uid"));
        }
        self.stamp(&mut value);
        self.store_write()
            .insert(key::<K>(&namespace, &name), value.clone());
        from_json(value)
    }

    /// Read an object without counting an operation
    pub fn object<K: ManagedObject>(&self, namespace: &str, name: &str) -> Option<K> {
        self.store_read()
            .get(&key::<K>(namespace, name))
            .cloned()
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Overwrite stored status without counting an operation
    pub fn set_status<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
        status: Value,
    ) -> Result<(), ClientError> {
        let mut store = self.store_write();
        let value = store
            .get_mut(&key::<K>(namespace, name))
            .ok_or_else(|| ClientError::NotFound {
                kind: kind_of::<K>(),
                namespace: namespace.to_string(),
                name: name.to_string(),
            })?;
        value["status"] = status;
        self.stamp(value);
        Ok(())
    }

    /// Get operation counts for assertions
    pub fn operation_counts(&self) -> OperationCounts {
        self.operations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Reset operation counts
    pub fn reset_counts(&self) {
        self.record(|ops| *ops = OperationCounts::default());
    }

    /// Number of stored objects of kind `K`
    pub fn count<K: ManagedObject>(&self) -> usize {
        let kind = kind_of::<K>();
        self.store_read().keys().filter(|(k, _, _)| *k == kind).count()
    }
}

#[async_trait]
impl ClusterClient for InMemoryClient {
    async fn get<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<K>, ClientError> {
        self.record(|ops| ops.gets += 1);
        let stored = self.store_read().get(&key::<K>(namespace, name)).cloned();
        stored.map(from_json).transpose()
    }

    async fn create<K: ManagedObject>(&self, object: &K) -> Result<K, ClientError> {
        let (namespace, name) = object_key(object);
        let mut value = to_json(object)?;
        {
            let mut store = self.store_write();
            let key = key::<K>(&namespace, &name);
            if store.contains_key(&key) {
                return Err(ClientError::AlreadyExists {
                    kind: kind_of::<K>(),
                    namespace,
                    name,
                });
            }
            value["metadata"]["uid"] = Value::String(format!("{namespace}-{name}-uid"));
            self.stamp(&mut value);
            store.insert(key, value.clone());
        }
        self.record(|ops| ops.creates += 1);
        from_json(value)
    }

    async fn replace<K: ManagedObject>(&self, object: &K) -> Result<K, ClientError> {
        let (namespace, name) = object_key(object);
        let mut value = to_json(object)?;
        {
            let mut store = self.store_write();
            let stored = store
                .get_mut(&key::<K>(&namespace, &name))
                .ok_or_else(|| ClientError::NotFound {
                    kind: kind_of::<K>(),
                    namespace: namespace.clone(),
                    name: name.clone(),
                })?;
            if let Some(expected) = stored_version(&value) {
                if Some(expected) != stored_version(stored) {
                    return Err(ClientError::Conflict {
                        kind: kind_of::<K>(),
                        namespace,
                        name,
                        message: format!("resourceVersion {expected} is stale"),
                    });
                }
            }
            // replace never touches the status sub-resource
            match stored.get("status") {
                Some(status) => value["status"] = status.clone(),
                None => {
                    if let Value::Object(map) = &mut value {
                        map.remove("status");
                    }
                }
            }
            self.stamp(&mut value);
            *stored = value.clone();
        }
        self.record(|ops| ops.updates += 1);
        from_json(value)
    }

    async fn delete<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<bool, ClientError> {
        let removed = self
            .store_write()
            .remove(&key::<K>(namespace, name))
            .is_some();
        if removed {
            self.record(|ops| ops.deletes += 1);
        }
        Ok(removed)
    }

    async fn patch_status<K: ManagedObject>(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<&str>,
        status: &Value,
    ) -> Result<(), ClientError> {
        {
            let mut store = self.store_write();
            let stored = store
                .get_mut(&key::<K>(namespace, name))
                .ok_or_else(|| ClientError::NotFound {
                    kind: kind_of::<K>(),
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                })?;
            if let Some(expected) = resource_version {
                if Some(expected) != stored_version(stored) {
                    return Err(ClientError::Conflict {
                        kind: kind_of::<K>(),
                        namespace: namespace.to_string(),
                        name: name.to_string(),
                        message: format!("resourceVersion {expected} is stale"),
                    });
                }
            }
            if !stored.get("status").is_some_and(Value::is_object) {
                stored["status"] = Value::Object(serde_json::Map::new());
            }
            merge_patch(&mut stored["status"], status);
            self.stamp(stored);
        }
        self.record(|ops| ops.status_updates += 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::ServiceAccount;
    use kube::api::ObjectMeta;

    fn service_account(name: &str) -> ServiceAccount {
        ServiceAccount {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("argocd".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let client = InMemoryClient::new();
        let created = client.create(&service_account("sa")).await.unwrap();
        assert!(created.metadata.resource_version.is_some());

        let fetched: Option<ServiceAccount> = client.get("argocd", "sa").await.unwrap();
        assert_eq!(fetched, Some(created));
        assert_eq!(client.operation_counts().creates, 1);
        assert_eq!(client.operation_counts().gets, 1);
    }

    #[tokio::test]
    async fn test_duplicate_create_fails() {
        let client = InMemoryClient::new();
        client.create(&service_account("sa")).await.unwrap();
        let err = client.create(&service_account("sa")).await.unwrap_err();
        assert!(matches!(err, ClientError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_replace_with_stale_version_conflicts() {
        let client = InMemoryClient::new();
        let first = client.create(&service_account("sa")).await.unwrap();
        client.replace(&first).await.unwrap();

        let err = client.replace(&first).await.unwrap_err();
        assert!(matches!(err, ClientError::Conflict { .. }));
        assert_eq!(client.operation_counts().updates, 1);
    }

    #[tokio::test]
    async fn test_delete_absent_is_not_a_mutation() {
        let client = InMemoryClient::new();
        assert!(!client.delete::<ServiceAccount>("argocd", "sa").await.unwrap());
        assert_eq!(client.operation_counts().mutations(), 0);

        client.create(&service_account("sa")).await.unwrap();
        assert!(client.delete::<ServiceAccount>("argocd", "sa").await.unwrap());
        assert_eq!(client.count::<ServiceAccount>(), 0);
    }

    #[test]
    fn test_merge_patch() {
        let mut target = serde_json::json!({ "a": "1", "b": { "c": "2", "d": "3" } });
        merge_patch(
            &mut target,
            &serde_json::json!({ "a": null, "b": { "c": "4" }, "e": [1] }),
        );
        assert_eq!(
            target,
            serde_json::json!({ "b": { "c": "4", "d": "3" }, "e": [1] })
        );
    }
}
