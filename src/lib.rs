//! # Argo CD Operator Library
//!
//! Core reconciliation logic for the Argo CD operator.
//!
//! An `ArgoCD` custom resource is turned into a set of child objects (redis RBAC,
//! SSO provider workloads, server exposure, notifications and applicationset
//! controllers). Every cycle synthesizes the desired objects, corrects drift on
//! the managed fields only, and rolls per-component health into the composite
//! status on the resource.
//!
//! Tests are included in the module files and under `tests/`.

pub mod client;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod runtime;

pub use crd::*;
