//! Argo CD server exposure: Ingress and OpenShift Route `<instance>-server`.

use super::labels::{child_metadata, owner_annotations};
use crate::constants::{COMPONENT_SERVER, SERVER_TLS_SECRET};
use crate::crd::{
    ArgoCD, Route, RoutePort, RouteSpec, RouteTargetReference, RouteTlsConfig,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;

/// User annotations extended with the owner annotations, which always win
fn exposure_metadata(cr: &ArgoCD, extra: &BTreeMap<String, String>) -> ObjectMeta {
    let name = cr.child_name(COMPONENT_SERVER);
    let mut metadata = child_metadata(cr, &name, COMPONENT_SERVER);
    let mut annotations = extra.clone();
    annotations.extend(owner_annotations(cr));
    metadata.annotations = Some(annotations);
    metadata
}

pub fn server_ingress(cr: &ArgoCD) -> Ingress {
    let spec = &cr.spec.server.ingress;
    let host = cr.server_host();
    let service = cr.child_name(COMPONENT_SERVER);

    Ingress {
        metadata: exposure_metadata(cr, &spec.annotations),
        spec: Some(IngressSpec {
            ingress_class_name: spec.ingress_class_name.clone(),
            rules: Some(vec![IngressRule {
                host: Some(host.clone()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "ImplementationSpecific".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: service,
                                port: Some(ServiceBackendPort {
                                    name: Some("http".to_string()),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            tls: spec.tls.then(|| {
                vec![IngressTLS {
                    hosts: Some(vec![host]),
                    secret_name: Some(SERVER_TLS_SECRET.to_string()),
                }]
            }),
            ..Default::default()
        }),
        status: None,
    }
}

pub fn server_route(cr: &ArgoCD) -> Route {
    let spec = &cr.spec.server.route;

    Route {
        metadata: exposure_metadata(cr, &spec.annotations),
        spec: RouteSpec {
            host: cr.spec.server.host.clone().filter(|h| !h.is_empty()),
            to: RouteTargetReference {
                kind: "Service".to_string(),
                name: cr.child_name(COMPONENT_SERVER),
                weight: Some(100),
            },
            port: Some(RoutePort {
                target_port: IntOrString::String("http".to_string()),
            }),
            tls: spec.tls.then(|| RouteTlsConfig {
                termination: "edge".to_string(),
                insecure_edge_termination_policy: Some("Redirect".to_string()),
                extra: BTreeMap::new(),
            }),
            wildcard_policy: Some("None".to_string()),
            extra: BTreeMap::new(),
        },
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ANNOTATION_OWNER_NAME;
    use crate::crd::ArgoCDSpec;

    fn argocd() -> ArgoCD {
        let mut cr = ArgoCD::new("argocd", ArgoCDSpec::default());
        cr.metadata.namespace = Some("argocd".to_string());
        cr
    }

    #[test]
    fn test_ingress_defaults() {
        let ingress = server_ingress(&argocd());
        let spec = ingress.spec.unwrap();
        let rule = &spec.rules.unwrap()[0];

        assert_eq!(ingress.metadata.name.as_deref(), Some("argocd-server"));
        assert_eq!(rule.host.as_deref(), Some("argocd"));
        let backend = rule.http.as_ref().unwrap().paths[0]
            .backend
            .service
            .clone()
            .unwrap();
        assert_eq!(backend.name, "argocd-server");
        assert_eq!(backend.port.unwrap().name.as_deref(), Some("http"));
        assert!(spec.tls.is_none());
        assert!(spec.ingress_class_name.is_none());
    }

    #[test]
    fn test_ingress_tls_and_class() {
        let mut cr = argocd();
        cr.spec.server.host = Some("argocd.example.com".to_string());
        cr.spec.server.ingress.tls = true;
        cr.spec.server.ingress.ingress_class_name = Some("nginx".to_string());

        let spec = server_ingress(&cr).spec.unwrap();
        let tls = spec.tls.unwrap();
        assert_eq!(tls[0].hosts, Some(vec!["argocd.example.com".to_string()]));
        assert_eq!(spec.ingress_class_name.as_deref(), Some("nginx"));
    }

    #[test]
    fn test_owner_annotations_override_user_annotations() {
        let mut cr = argocd();
        cr.spec
            .server
            .route
            .annotations
            .insert(ANNOTATION_OWNER_NAME.to_string(), "spoofed".to_string());
        cr.spec
            .server
            .route
            .annotations
            .insert("haproxy.router.openshift.io/timeout".to_string(), "5m".to_string());

        let annotations = server_route(&cr).metadata.annotations.unwrap();
        assert_eq!(annotations[ANNOTATION_OWNER_NAME], "argocd");
        assert_eq!(annotations["haproxy.router.openshift.io/timeout"], "5m");
    }

    #[test]
    fn test_route_edge_tls() {
        let mut cr = argocd();
        let route = server_route(&cr);
        assert!(route.spec.tls.is_none());
        assert!(route.spec.host.is_none());
        assert_eq!(route.spec.to.name, "argocd-server");

        cr.spec.server.route.tls = true;
        let tls = server_route(&cr).spec.tls.unwrap();
        assert_eq!(tls.termination, "edge");
    }
}
