//! # Field Comparison
//!
//! Generic desired-vs-observed comparison over a per-kind table of managed
//! JSON pointers. Fields outside the table are never read or written, so
//! values defaulted by the API server or set by other controllers do not
//! register as drift.

use crate::client::ManagedObject;
use crate::crd::Route;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::ServiceAccount;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::api::rbac::v1::RoleBinding;
use serde_json::{Map, Value};

/// How a managed field is reconciled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Corrected in place whenever it differs
    Enforce,
    /// Corrected only when the desired object sets it
    EnforceWhenSet,
    /// Map whose desired keys are enforced; keys added by others are kept
    EnforceKeys,
    /// Must never be corrected in place; a mismatch is structural drift
    Identity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagedField {
    pub pointer: &'static str,
    pub policy: FieldPolicy,
}

impl ManagedField {
    pub const fn enforce(pointer: &'static str) -> Self {
        Self {
            pointer,
            policy: FieldPolicy::Enforce,
        }
    }

    pub const fn when_set(pointer: &'static str) -> Self {
        Self {
            pointer,
            policy: FieldPolicy::EnforceWhenSet,
        }
    }

    pub const fn keys(pointer: &'static str) -> Self {
        Self {
            pointer,
            policy: FieldPolicy::EnforceKeys,
        }
    }

    pub const fn identity(pointer: &'static str) -> Self {
        Self {
            pointer,
            policy: FieldPolicy::Identity,
        }
    }
}

// other controllers annotate our children too (deployment revision, generated route host)
const LABELS: ManagedField = ManagedField::keys("/metadata/labels");
const ANNOTATIONS: ManagedField = ManagedField::keys("/metadata/annotations");

/// A kind whose drift is reconciled through a managed-field table
pub trait ManagedKind: ManagedObject {
    const MANAGED_FIELDS: &'static [ManagedField];
}

impl ManagedKind for RoleBinding {
    const MANAGED_FIELDS: &'static [ManagedField] = &[
        LABELS,
        ANNOTATIONS,
        ManagedField::enforce("/subjects"),
        ManagedField::identity("/roleRef"),
    ];
}

impl ManagedKind for ServiceAccount {
    const MANAGED_FIELDS: &'static [ManagedField] = &[LABELS, ANNOTATIONS];
}

impl ManagedKind for Deployment {
    const MANAGED_FIELDS: &'static [ManagedField] = &[
        LABELS,
        ANNOTATIONS,
        ManagedField::enforce("/spec/replicas"),
        ManagedField::enforce("/spec/template/metadata/labels"),
        ManagedField::enforce("/spec/template/spec/containers/0/image"),
        ManagedField::enforce("/spec/template/spec/containers/0/command"),
        ManagedField::identity("/spec/selector"),
    ];
}

impl ManagedKind for Ingress {
    const MANAGED_FIELDS: &'static [ManagedField] = &[
        LABELS,
        ANNOTATIONS,
        ManagedField::enforce("/spec/ingressClassName"),
        ManagedField::enforce("/spec/rules"),
        ManagedField::enforce("/spec/tls"),
    ];
}

impl ManagedKind for Route {
    const MANAGED_FIELDS: &'static [ManagedField] = &[
        LABELS,
        ANNOTATIONS,
        ManagedField::when_set("/spec/host"),
        ManagedField::enforce("/spec/to"),
        ManagedField::enforce("/spec/port"),
        ManagedField::keys("/spec/tls"),
    ];
}

/// Outcome of comparing one managed field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldComparison {
    pub path: &'static str,
    pub existing: Value,
    pub desired: Value,
    pub mismatch: bool,
    pub policy: FieldPolicy,
}

impl FieldComparison {
    pub fn is_identity(&self) -> bool {
        self.policy == FieldPolicy::Identity
    }

    /// Value written back when this field is corrected
    pub fn corrected(&self) -> Value {
        match (self.policy, &self.existing, &self.desired) {
            (FieldPolicy::EnforceKeys, Value::Object(existing), Value::Object(desired))
                if !desired.is_empty() =>
            {
                let mut merged = existing.clone();
                merged.extend(desired.iter().map(|(k, v)| (k.clone(), v.clone())));
                Value::Object(merged)
            }
            _ => self.desired.clone(),
        }
    }
}

/// Ordered comparison of every managed field of one object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldComparisonResult {
    pub fields: Vec<FieldComparison>,
}

impl FieldComparisonResult {
    /// Compare `existing` against `desired` at each managed pointer
    pub fn evaluate(table: &[ManagedField], existing: &Value, desired: &Value) -> Self {
        let fields = table
            .iter()
            .map(|field| {
                let existing = existing.pointer(field.pointer).cloned().unwrap_or(Value::Null);
                let desired = desired.pointer(field.pointer).cloned().unwrap_or(Value::Null);
                let mismatch = match field.policy {
                    FieldPolicy::EnforceWhenSet if is_blank(&desired) => false,
                    FieldPolicy::EnforceKeys => !contains_entries(&existing, &desired),
                    _ => !values_equal(&existing, &desired),
                };
                FieldComparison {
                    path: field.pointer,
                    existing,
                    desired,
                    mismatch,
                    policy: field.policy,
                }
            })
            .collect();
        Self { fields }
    }

    pub fn is_match(&self) -> bool {
        self.fields.iter().all(|f| !f.mismatch)
    }

    /// First identity field that differs, if any
    pub fn identity_mismatch(&self) -> Option<&FieldComparison> {
        self.fields.iter().find(|f| f.mismatch && f.is_identity())
    }

    pub fn mismatched_paths(&self) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.mismatch)
            .map(|f| f.path)
            .collect()
    }

    /// Copy desired values onto `target` at every mismatching mutable path
    pub fn apply_desired(&self, target: &mut Value) -> Vec<&'static str> {
        self.fields
            .iter()
            .filter(|f| f.mismatch && !f.is_identity())
            .filter(|f| set_pointer(target, f.path, f.corrected()))
            .map(|f| f.path)
            .collect()
    }
}

/// Absent, null, `{}`, `[]` and `""` all mean "unset"
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

pub fn values_equal(a: &Value, b: &Value) -> bool {
    (is_blank(a) && is_blank(b)) || a == b
}

/// Every entry of a non-empty desired map is present in `existing` with the
/// same value. Blank or non-map values fall back to [`values_equal`].
fn contains_entries(existing: &Value, desired: &Value) -> bool {
    match (existing, desired) {
        (Value::Object(have), Value::Object(want)) if !want.is_empty() => {
            want.iter().all(|(key, value)| have.get(key) == Some(value))
        }
        _ => values_equal(existing, desired),
    }
}

fn unescape(token: &str) -> String {
    token.replace("~1", "/").replace("~0", "~")
}

fn child_mut<'v>(parent: &'v mut Value, token: &str) -> Option<&'v mut Value> {
    if !parent.is_object() && !parent.is_array() {
        *parent = Value::Object(Map::new());
    }
    match parent {
        Value::Array(items) => match token.parse::<usize>() {
            Ok(i) => items.get_mut(i),
            Err(_) => None,
        },
        Value::Object(map) => Some(map.entry(token.to_string()).or_insert(Value::Null)),
        _ => None,
    }
}

/// Write `value` at `pointer`, creating intermediate objects as needed.
/// A null value removes the key. Returns false when an array index is out of range.
pub fn set_pointer(root: &mut Value, pointer: &str, value: Value) -> bool {
    let tokens: Vec<String> = pointer.split('/').skip(1).map(unescape).collect();
    let Some((last, parents)) = tokens.split_last() else {
        *root = value;
        return true;
    };

    let mut current = root;
    for token in parents {
        match child_mut(current, token) {
            Some(next) => current = next,
            None => return false,
        }
    }

    if !current.is_object() && !current.is_array() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Array(items) => match last.parse::<usize>() {
            Ok(i) if i < items.len() => {
                items[i] = value;
                true
            }
            Ok(i) if i == items.len() => {
                items.push(value);
                true
            }
            _ => false,
        },
        Value::Object(map) => {
            if value.is_null() {
                map.remove(last.as_str());
            } else {
                map.insert(last.clone(), value);
            }
            true
        }
        _ => false,
    }
}
