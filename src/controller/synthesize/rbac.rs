//! Redis RBAC objects.

use super::labels::child_metadata;
use crate::constants::{COMPONENT_REDIS, COMPONENT_REDIS_HA, RBAC_API_GROUP};
use crate::crd::ArgoCD;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};

/// ServiceAccount `<instance>-redis`
pub fn redis_service_account(cr: &ArgoCD) -> ServiceAccount {
    let name = cr.child_name(COMPONENT_REDIS);
    ServiceAccount {
        metadata: child_metadata(cr, &name, COMPONENT_REDIS),
        ..Default::default()
    }
}

/// Role the redis binding points at; HA installs use the `-redis-ha` role
pub fn redis_role_name(cr: &ArgoCD) -> String {
    if cr.spec.ha.enabled {
        cr.child_name(COMPONENT_REDIS_HA)
    } else {
        cr.child_name(COMPONENT_REDIS)
    }
}

/// RoleBinding `<instance>-redis` granting the redis role to the redis ServiceAccount
pub fn redis_role_binding(cr: &ArgoCD) -> RoleBinding {
    let name = cr.child_name(COMPONENT_REDIS);
    RoleBinding {
        metadata: child_metadata(cr, &name, COMPONENT_REDIS),
        role_ref: RoleRef {
            api_group: RBAC_API_GROUP.to_string(),
            kind: "Role".to_string(),
            name: redis_role_name(cr),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: name.clone(),
            namespace: Some(cr.instance_namespace().to_string()),
            ..Default::default()
        }]),
    }
}
