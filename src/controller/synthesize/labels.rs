//! Labels, annotations and metadata shared by every child object.

use crate::constants::*;
use crate::crd::ArgoCD;
use kube::api::ObjectMeta;
use kube::Resource;
use std::collections::BTreeMap;

/// The five standard labels
pub fn common_labels(cr: &ArgoCD, name: &str, component: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (LABEL_NAME.to_string(), name.to_string()),
        (LABEL_PART_OF.to_string(), PART_OF_ARGOCD.to_string()),
        (LABEL_INSTANCE.to_string(), cr.instance_name().to_string()),
        (LABEL_MANAGED_BY.to_string(), MANAGED_BY_OPERATOR.to_string()),
        (LABEL_COMPONENT.to_string(), component.to_string()),
    ])
}

/// Annotations pointing back at the owning ArgoCD
pub fn owner_annotations(cr: &ArgoCD) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            ANNOTATION_OWNER_NAME.to_string(),
            cr.instance_name().to_string(),
        ),
        (
            ANNOTATION_OWNER_NAMESPACE.to_string(),
            cr.instance_namespace().to_string(),
        ),
    ])
}

/// Selector used by child workloads
pub fn selector_labels(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(LABEL_NAME.to_string(), name.to_string())])
}

/// Metadata for a child object named `name`
///
/// The controller owner reference is only set once the ArgoCD has a uid, which
/// keeps synthesis total for resources that were never persisted.
pub fn child_metadata(cr: &ArgoCD, name: &str, component: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(cr.instance_namespace().to_string()),
        labels: Some(common_labels(cr, name, component)),
        annotations: Some(owner_annotations(cr)),
        owner_references: cr.controller_owner_ref(&()).map(|owner| vec![owner]),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ArgoCDSpec;

    fn argocd() -> ArgoCD {
        let mut cr = ArgoCD::new("test-argocd", ArgoCDSpec::default());
        cr.metadata.namespace = Some("argocd".to_string());
        cr
    }

    #[test]
    fn test_common_labels() {
        let labels = common_labels(&argocd(), "test-argocd-redis", "redis");
        assert_eq!(labels.len(), 5);
        assert_eq!(labels[LABEL_NAME], "test-argocd-redis");
        assert_eq!(labels[LABEL_PART_OF], "argocd");
        assert_eq!(labels[LABEL_INSTANCE], "test-argocd");
        assert_eq!(labels[LABEL_MANAGED_BY], "argocd-operator");
        assert_eq!(labels[LABEL_COMPONENT], "redis");
    }

    #[test]
    fn test_owner_reference_requires_uid() {
        let mut cr = argocd();
        assert!(child_metadata(&cr, "n", "c").owner_references.is_none());

        cr.metadata.uid = Some("1234".to_string());
        let owners = child_metadata(&cr, "n", "c").owner_references.unwrap();
        assert_eq!(owners[0].kind, "ArgoCD");
        assert_eq!(owners[0].controller, Some(true));
    }
}
