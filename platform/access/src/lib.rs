//! Access-control and data-scoping engine for the EIR suite.
//!
//! Everything in this crate is a pure function of a [`Principal`] snapshot:
//! no storage access, no shared state, no side effects. The HTTP layer
//! resolves the principal, asks this crate for a decision or a scope filter,
//! and is responsible for persisting the resulting [`AccessDecision`] to the
//! audit log.

pub mod decision;
pub mod level;
pub mod matrix;
pub mod principal;
pub mod response;
pub mod rules;
pub mod scope;

pub use decision::{AccessDecision, DecisionReason, DeviceSnapshot, can_access_device, can_access_imei};
pub use level::{AccessLevel, DataScope, Operation, parse_level, parse_scope};
pub use matrix::{PermissionMatrix, PermissionsSummary};
pub use principal::Principal;
pub use response::{ResourceKind, redact};
pub use rules::{AccessRule, parse_rules};
pub use scope::ScopeFilter;
