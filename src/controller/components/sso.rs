//! SSO provider selection and status.
//!
//! Exclusivity is decided first. Only a legal configuration lets the provider
//! workloads be created, deleted or inspected.

use super::{converge, deployment_status, ComponentReconciler};
use crate::client::ClusterClient;
use crate::config::ControllerConfig;
use crate::constants::{COMPONENT_DEX, COMPONENT_KEYCLOAK, LEGACY_KEYCLOAK_DEPLOYMENT_CONFIG};
use crate::controller::reconciler::aggregate::{StatusField, StatusKey};
use crate::controller::reconciler::context::ReconcileContext;
use crate::controller::reconciler::error::{ConfigurationConflictError, ReconcileError};
use crate::controller::synthesize::{
    dex_deployment, keycloak_deployment, DesiredObject, ObjectKind, ObjectRef,
};
use crate::crd::{ArgoCD, ArgoCDDexSpec, ArgoCDStatus, ComponentStatus, DeploymentConfig, SSOProviderType};
use crate::runtime::capabilities::Capabilities;
use async_trait::async_trait;
use tracing::warn;

/// Which provider, if any, the ArgoCD selects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsoSelection {
    None,
    Dex,
    Keycloak,
}

/// Decide the SSO provider or reject the combination
///
/// Dex counts as configured when it is not disabled operator-wide and either
/// `sso.provider` is dex or the legacy `.spec.dex` block has a connector.
/// Keycloak counts as configured when `sso.provider` is keycloak.
pub fn select_sso_provider(
    cr: &ArgoCD,
    config: &ControllerConfig,
) -> Result<SsoSelection, ConfigurationConflictError> {
    let dex_enabled = !config.dex_disabled;
    let legacy_dex = cr
        .spec
        .dex
        .as_ref()
        .is_some_and(ArgoCDDexSpec::is_configured);

    let Some(sso) = cr.spec.sso.as_ref() else {
        return Ok(if dex_enabled && legacy_dex {
            SsoSelection::Dex
        } else {
            SsoSelection::None
        });
    };
    let sso_dex = sso.dex.as_ref().is_some_and(ArgoCDDexSpec::is_configured);

    match sso.provider {
        SSOProviderType::Keycloak => {
            if dex_enabled && (legacy_dex || sso_dex) {
                Err(ConfigurationConflictError::MultipleSsoConfigured)
            } else if sso.dex.is_some() {
                Err(ConfigurationConflictError::DexConfigWithKeycloakProvider)
            } else {
                Ok(SsoSelection::Keycloak)
            }
        }
        SSOProviderType::Dex => {
            if !dex_enabled {
                Err(ConfigurationConflictError::DexDisabled)
            } else if sso.keycloak.is_some() {
                Err(ConfigurationConflictError::KeycloakConfigWithDexProvider)
            } else if !(sso_dex || legacy_dex) {
                Err(ConfigurationConflictError::MissingDexConfiguration)
            } else {
                Ok(SsoSelection::Dex)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SsoComponent;

impl SsoComponent {
    fn dex_ref(cr: &ArgoCD) -> ObjectRef {
        ObjectRef::new(
            ObjectKind::Deployment,
            cr.instance_namespace(),
            cr.child_name(COMPONENT_DEX),
        )
    }

    fn keycloak_ref(cr: &ArgoCD) -> ObjectRef {
        ObjectRef::new(
            ObjectKind::Deployment,
            cr.instance_namespace(),
            cr.child_name(COMPONENT_KEYCLOAK),
        )
    }

    /// Keycloak may still run from a template-era DeploymentConfig
    async fn keycloak_status<C: ClusterClient>(
        ctx: &ReconcileContext<'_, C>,
        cr: &ArgoCD,
    ) -> Result<ComponentStatus, ReconcileError> {
        let namespace = cr.instance_namespace();
        if ctx.capabilities.template_api {
            if let Some(legacy) = ctx
                .client
                .get::<DeploymentConfig>(namespace, LEGACY_KEYCLOAK_DEPLOYMENT_CONFIG)
                .await?
            {
                let ready = legacy.status.map_or(0, |s| s.ready_replicas);
                return Ok(ComponentStatus::from_replicas(legacy.spec.replicas, ready));
            }
        }
        deployment_status(ctx.client, namespace, &cr.child_name(COMPONENT_KEYCLOAK)).await
    }
}

#[async_trait]
impl<C: ClusterClient + 'static> ComponentReconciler<C> for SsoComponent {
    fn name(&self) -> &'static str {
        "sso"
    }

    fn owned_fields(&self) -> &'static [StatusKey] {
        &[StatusKey::SsoConfig, StatusKey::Sso]
    }

    fn synthesize(
        &self,
        cr: &ArgoCD,
        _capabilities: &Capabilities,
        config: &ControllerConfig,
    ) -> Vec<DesiredObject> {
        match select_sso_provider(cr, config) {
            Ok(SsoSelection::Dex) => vec![DesiredObject::Deployment(dex_deployment(cr, config))],
            Ok(SsoSelection::Keycloak) => {
                vec![DesiredObject::Deployment(keycloak_deployment(cr, config))]
            }
            Ok(SsoSelection::None) | Err(_) => Vec::new(),
        }
    }

    fn stale(
        &self,
        cr: &ArgoCD,
        _capabilities: &Capabilities,
        config: &ControllerConfig,
    ) -> Vec<ObjectRef> {
        match select_sso_provider(cr, config) {
            Ok(SsoSelection::Dex) => vec![Self::keycloak_ref(cr)],
            Ok(SsoSelection::Keycloak) => vec![Self::dex_ref(cr)],
            Ok(SsoSelection::None) => vec![Self::dex_ref(cr), Self::keycloak_ref(cr)],
            // leave whatever runs untouched until the conflict is resolved
            Err(_) => Vec::new(),
        }
    }

    async fn reconcile(
        &self,
        ctx: &ReconcileContext<'_, C>,
        cr: &ArgoCD,
    ) -> Result<(), ReconcileError> {
        if let Err(conflict) = select_sso_provider(cr, ctx.config) {
            warn!(
                resource.name = cr.instance_name(),
                resource.namespace = cr.instance_namespace(),
                "{conflict}"
            );
            return Err(conflict.into());
        }
        let desired = <Self as ComponentReconciler<C>>::synthesize(self, cr, ctx.capabilities, ctx.config);
        let stale = <Self as ComponentReconciler<C>>::stale(self, cr, ctx.capabilities, ctx.config);
        converge(ctx.client, &desired, &stale).await
    }

    async fn compute_status(
        &self,
        ctx: &ReconcileContext<'_, C>,
        cr: &ArgoCD,
        _current: &ArgoCDStatus,
    ) -> Result<Vec<StatusField>, ReconcileError> {
        let (config_state, provider_state) = match select_sso_provider(cr, ctx.config) {
            Err(_) => (ComponentStatus::Failed, ComponentStatus::Failed),
            Ok(SsoSelection::None) => (ComponentStatus::Unknown, ComponentStatus::Unknown),
            Ok(SsoSelection::Dex) => (
                ComponentStatus::Success,
                deployment_status(
                    ctx.client,
                    cr.instance_namespace(),
                    &cr.child_name(COMPONENT_DEX),
                )
                .await?,
            ),
            Ok(SsoSelection::Keycloak) => (
                ComponentStatus::Success,
                Self::keycloak_status(ctx, cr).await?,
            ),
        };
        Ok(vec![
            StatusField::state(StatusKey::SsoConfig, config_state),
            StatusField::state(StatusKey::Sso, provider_state),
        ])
    }
}
