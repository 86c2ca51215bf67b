//! The per-request principal snapshot.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::level::{AccessLevel, DataScope, Operation};
use crate::rules::AccessRule;

/// Immutable snapshot of an authenticated user, loaded once per request.
///
/// Anonymous callers are represented as `Option<&Principal>::None` at the
/// decision seams rather than as a sentinel value here. Optional attributes
/// are plain `Option`s or empty collections; empty `allowed_brands`,
/// `allowed_ranges` and `custom_operations` mean "no restriction of that
/// kind configured".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub level: AccessLevel,
    /// Stored scope override; `None` falls back to the level default.
    pub data_scope: Option<DataScope>,
    pub organization: Option<String>,
    pub is_active: bool,
    pub allowed_brands: Vec<String>,
    /// Ordered allow-list rules; evaluation is first-match-wins.
    pub allowed_ranges: Vec<AccessRule>,
    /// When non-empty, fully replaces the default permission matrix row.
    pub custom_operations: HashSet<Operation>,
}

impl Principal {
    /// Bare principal at a given level, everything else defaulted. Mostly a
    /// test and fixture convenience.
    pub fn with_level(id: Uuid, level: AccessLevel) -> Self {
        Self {
            id,
            level,
            data_scope: None,
            organization: None,
            is_active: true,
            allowed_brands: Vec::new(),
            allowed_ranges: Vec::new(),
            custom_operations: HashSet::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.level == AccessLevel::Admin
    }
}
