//! # Runtime Module
//!
//! Process runtime for the operator: startup, platform capability probing,
//! namespace scoping, the watch loop and error handling.

pub mod capabilities;
pub mod error_policy;
pub mod initialization;
pub mod scope;
pub mod watch_loop;

pub use capabilities::Capabilities;
pub use error_policy::*;
pub use initialization::*;
pub use scope::{resolve_namespace_scope, NamespaceScope, ScopeError};
pub use watch_loop::*;
