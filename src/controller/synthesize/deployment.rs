//! Workload Deployments: Dex, Keycloak, notifications and applicationset.

use super::labels::{child_metadata, selector_labels};
use crate::config::ControllerConfig;
use crate::constants::*;
use crate::crd::{image_reference, ArgoCD, ArgoCDDexSpec};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::ObjectMeta;

/// Inputs for a single-container workload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadParams {
    pub component: &'static str,
    pub image: String,
    pub replicas: i32,
    pub command: Vec<String>,
}

/// Deployment `<instance>-<component>` selecting on `app.kubernetes.io/name`
pub fn workload_deployment(cr: &ArgoCD, params: WorkloadParams) -> Deployment {
    let name = cr.child_name(params.component);
    let selector = selector_labels(&name);

    Deployment {
        metadata: child_metadata(cr, &name, params.component),
        spec: Some(DeploymentSpec {
            replicas: Some(params.replicas),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: params.component.to_string(),
                        image: Some(params.image),
                        command: Some(params.command),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

fn command(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| (*p).to_string()).collect()
}

/// Effective Dex settings: `sso.dex` wins over the legacy top-level block
pub fn effective_dex_spec(cr: &ArgoCD) -> ArgoCDDexSpec {
    cr.spec
        .sso
        .as_ref()
        .and_then(|sso| sso.dex.clone())
        .or_else(|| cr.spec.dex.clone())
        .unwrap_or_default()
}

pub fn dex_deployment(cr: &ArgoCD, config: &ControllerConfig) -> Deployment {
    let dex = effective_dex_spec(cr);
    workload_deployment(
        cr,
        WorkloadParams {
            component: COMPONENT_DEX,
            image: image_reference(
                dex.image.as_deref(),
                &config.dex_image,
                dex.version.as_deref(),
                DEFAULT_DEX_VERSION,
            ),
            replicas: dex.replicas.unwrap_or(1),
            command: command(&["/shared/argocd-dex", "rundex"]),
        },
    )
}

pub fn keycloak_deployment(cr: &ArgoCD, config: &ControllerConfig) -> Deployment {
    let keycloak = cr
        .spec
        .sso
        .as_ref()
        .and_then(|sso| sso.keycloak.clone())
        .unwrap_or_default();
    workload_deployment(
        cr,
        WorkloadParams {
            component: COMPONENT_KEYCLOAK,
            image: image_reference(
                keycloak.image.as_deref(),
                &config.keycloak_image,
                keycloak.version.as_deref(),
                DEFAULT_KEYCLOAK_VERSION,
            ),
            replicas: keycloak.replicas.unwrap_or(1),
            command: command(&["/opt/keycloak/bin/kc.sh", "start"]),
        },
    )
}

pub fn notifications_deployment(cr: &ArgoCD, config: &ControllerConfig) -> Deployment {
    let notifications = &cr.spec.notifications;
    workload_deployment(
        cr,
        WorkloadParams {
            component: COMPONENT_NOTIFICATIONS,
            image: image_reference(
                notifications.image.as_deref(),
                &cr.argocd_image(&config.argocd_image),
                notifications.version.as_deref(),
                DEFAULT_ARGOCD_VERSION,
            ),
            replicas: notifications.replicas.unwrap_or(1),
            command: command(&["argocd-notifications"]),
        },
    )
}

pub fn applicationset_deployment(cr: &ArgoCD, config: &ControllerConfig) -> Deployment {
    let appset = cr.spec.application_set.clone().unwrap_or_default();
    workload_deployment(
        cr,
        WorkloadParams {
            component: COMPONENT_APPLICATIONSET,
            image: image_reference(
                appset.image.as_deref(),
                &cr.argocd_image(&config.argocd_image),
                appset.version.as_deref(),
                DEFAULT_ARGOCD_VERSION,
            ),
            replicas: appset.replicas.unwrap_or(1),
            command: command(&["entrypoint.sh", "argocd-applicationset-controller"]),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{ArgoCDNotificationsSpec, ArgoCDSSOSpec, ArgoCDSpec, SSOProviderType};

    fn argocd() -> ArgoCD {
        let mut cr = ArgoCD::new("test-argocd", ArgoCDSpec::default());
        cr.metadata.namespace = Some("argocd".to_string());
        cr
    }

    #[test]
    fn test_workload_defaults() {
        let deployment = notifications_deployment(&argocd(), &ControllerConfig::default());
        let spec = deployment.spec.unwrap();

        assert_eq!(
            deployment.metadata.name.as_deref(),
            Some("test-argocd-notifications-controller")
        );
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(
            spec.selector.match_labels.unwrap()[LABEL_NAME],
            "test-argocd-notifications-controller"
        );
        let containers = spec.template.spec.unwrap().containers;
        assert_eq!(containers.len(), 1);
        assert_eq!(
            containers[0].image.as_deref(),
            Some("quay.io/argoproj/argocd:v2.13.1")
        );
    }

    #[test]
    fn test_replicas_and_image_overrides() {
        let mut cr = argocd();
        cr.spec.notifications = ArgoCDNotificationsSpec {
            enabled: true,
            image: Some("registry.local/argocd".to_string()),
            version: Some("v9".to_string()),
            replicas: Some(3),
        };
        let spec = notifications_deployment(&cr, &ControllerConfig::default())
            .spec
            .unwrap();
        assert_eq!(spec.replicas, Some(3));
        assert_eq!(
            spec.template.spec.unwrap().containers[0].image.as_deref(),
            Some("registry.local/argocd:v9")
        );
    }

    #[test]
    fn test_sso_dex_wins_over_legacy() {
        let mut cr = argocd();
        cr.spec.dex = Some(ArgoCDDexSpec {
            replicas: Some(2),
            ..Default::default()
        });
        assert_eq!(effective_dex_spec(&cr).replicas, Some(2));

        cr.spec.sso = Some(ArgoCDSSOSpec {
            provider: SSOProviderType::Dex,
            dex: Some(ArgoCDDexSpec {
                replicas: Some(4),
                ..Default::default()
            }),
            keycloak: None,
        });
        let deployment = dex_deployment(&cr, &ControllerConfig::default());
        assert_eq!(deployment.spec.unwrap().replicas, Some(4));
        assert_eq!(
            deployment.metadata.name.as_deref(),
            Some("test-argocd-dex-server")
        );
    }
}
