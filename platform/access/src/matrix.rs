//! Default permission and scope tables, plus per-principal resolution.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::level::{AccessLevel, DataScope, Operation};
use crate::principal::Principal;
use crate::rules::AccessRule;

/// The level-indexed default tables. Built once at startup and shared; the
/// engine never re-reads configuration per call.
#[derive(Clone, Debug)]
pub struct PermissionMatrix {
    permissions: HashMap<AccessLevel, HashSet<Operation>>,
    scopes: HashMap<AccessLevel, DataScope>,
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::new(stock_permissions(), stock_scopes())
    }
}

impl PermissionMatrix {
    /// Build a matrix from explicit tables. Levels missing from `permissions`
    /// get an empty operation set; levels missing from `scopes` get
    /// `DataScope::None`. Both directions fail closed.
    pub fn new(
        permissions: HashMap<AccessLevel, HashSet<Operation>>,
        scopes: HashMap<AccessLevel, DataScope>,
    ) -> Self {
        Self {
            permissions,
            scopes,
        }
    }

    /// The default operation set for a level.
    pub fn default_operations(&self, level: AccessLevel) -> &HashSet<Operation> {
        static EMPTY: std::sync::OnceLock<HashSet<Operation>> = std::sync::OnceLock::new();
        self.permissions
            .get(&level)
            .unwrap_or_else(|| EMPTY.get_or_init(HashSet::new))
    }

    /// The default data scope for a level.
    pub fn default_scope(&self, level: AccessLevel) -> DataScope {
        self.scopes.get(&level).copied().unwrap_or(DataScope::None)
    }

    /// May this principal perform `operation`?
    ///
    /// Anonymous callers get the `Visitor` row. Inactive principals are
    /// denied outright regardless of their stored level or overrides. A
    /// non-empty custom operation set replaces the default row entirely; it
    /// is never merged with it.
    pub fn has_permission(&self, principal: Option<&Principal>, operation: Operation) -> bool {
        let Some(principal) = principal else {
            return self
                .default_operations(AccessLevel::Visitor)
                .contains(&operation);
        };
        if !principal.is_active {
            return false;
        }
        if !principal.custom_operations.is_empty() {
            return principal.custom_operations.contains(&operation);
        }
        self.default_operations(principal.level).contains(&operation)
    }

    /// Serializable overview of a principal's effective permissions, used by
    /// the permission-management surface.
    pub fn summarize(&self, principal: &Principal) -> PermissionsSummary {
        let default = sorted_tokens(self.default_operations(principal.level));
        let effective = if principal.custom_operations.is_empty() {
            default.clone()
        } else {
            sorted_tokens(&principal.custom_operations)
        };
        PermissionsSummary {
            user_id: principal.id.to_string(),
            access_level: principal.level,
            data_scope: principal
                .data_scope
                .unwrap_or_else(|| self.default_scope(principal.level)),
            organization: principal.organization.clone(),
            is_active: principal.is_active,
            default_operations: default,
            effective_operations: effective,
            allowed_brands: principal.allowed_brands.clone(),
            allowed_ranges: principal.allowed_ranges.clone(),
        }
    }
}

fn sorted_tokens(operations: &HashSet<Operation>) -> Vec<&'static str> {
    let mut tokens: Vec<&'static str> = operations.iter().map(|op| op.as_str()).collect();
    tokens.sort_unstable();
    tokens
}

#[derive(Clone, Debug, Serialize)]
pub struct PermissionsSummary {
    pub user_id: String,
    pub access_level: AccessLevel,
    pub data_scope: DataScope,
    pub organization: Option<String>,
    pub is_active: bool,
    pub default_operations: Vec<&'static str>,
    pub effective_operations: Vec<&'static str>,
    pub allowed_brands: Vec<String>,
    pub allowed_ranges: Vec<AccessRule>,
}

fn stock_permissions() -> HashMap<AccessLevel, HashSet<Operation>> {
    use Operation::*;
    let mut table = HashMap::new();
    table.insert(AccessLevel::Visitor, HashSet::from([ReadImei]));
    table.insert(AccessLevel::Basic, HashSet::from([ReadImei, SearchImei]));
    table.insert(
        AccessLevel::Limited,
        HashSet::from([ReadImei, SearchImei, ReadDevice, ReadAnalytics]),
    );
    table.insert(
        AccessLevel::Standard,
        HashSet::from([
            ReadImei,
            SearchImei,
            ReadDevice,
            CreateDevice,
            UpdateDevice,
            ReadSim,
            CreateSim,
            UpdateSim,
            ReadUser,
            ReadSearchHistory,
        ]),
    );
    table.insert(
        AccessLevel::Elevated,
        HashSet::from([
            ReadImei,
            SearchImei,
            UpdateImeiStatus,
            ReadDevice,
            CreateDevice,
            UpdateDevice,
            DeleteDevice,
            ReadSim,
            CreateSim,
            UpdateSim,
            DeleteSim,
            ReadUser,
            ReadAnalytics,
            ReadSearchHistory,
            ReadAudit,
        ]),
    );
    table.insert(
        AccessLevel::Admin,
        Operation::CATALOG.into_iter().collect(),
    );
    table
}

fn stock_scopes() -> HashMap<AccessLevel, DataScope> {
    HashMap::from([
        (AccessLevel::Visitor, DataScope::None),
        (AccessLevel::Basic, DataScope::Own),
        (AccessLevel::Limited, DataScope::Brands),
        (AccessLevel::Standard, DataScope::Own),
        (AccessLevel::Elevated, DataScope::Organization),
        (AccessLevel::Admin, DataScope::All),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn principal(level: AccessLevel) -> Principal {
        Principal::with_level(Uuid::new_v4(), level)
    }

    #[test]
    fn anonymous_gets_exactly_the_visitor_row() {
        let matrix = PermissionMatrix::default();
        for op in Operation::CATALOG {
            assert_eq!(
                matrix.has_permission(None, op),
                matrix
                    .default_operations(AccessLevel::Visitor)
                    .contains(&op)
            );
        }
        assert!(matrix.has_permission(None, Operation::ReadImei));
        assert!(!matrix.has_permission(None, Operation::SearchImei));
    }

    #[test]
    fn admin_row_covers_the_whole_catalog() {
        let matrix = PermissionMatrix::default();
        let admin = principal(AccessLevel::Admin);
        for op in Operation::CATALOG {
            assert!(matrix.has_permission(Some(&admin), op), "{:?}", op);
        }
    }

    #[test]
    fn inactive_principal_is_denied_everything() {
        let matrix = PermissionMatrix::default();
        let mut admin = principal(AccessLevel::Admin);
        admin.is_active = false;
        admin.custom_operations = Operation::CATALOG.into_iter().collect();
        for op in Operation::CATALOG {
            assert!(!matrix.has_permission(Some(&admin), op), "{:?}", op);
        }
    }

    #[test]
    fn custom_operations_replace_the_default_row() {
        let matrix = PermissionMatrix::default();
        let mut user = principal(AccessLevel::Elevated);
        user.custom_operations = HashSet::from([Operation::ReadAudit]);
        assert!(matrix.has_permission(Some(&user), Operation::ReadAudit));
        // Elevated would normally get read_imei; the override removed it.
        assert!(!matrix.has_permission(Some(&user), Operation::ReadImei));
    }

    #[test]
    fn no_operation_implies_another() {
        let matrix = PermissionMatrix::default();
        let user = principal(AccessLevel::Standard);
        assert!(matrix.has_permission(Some(&user), Operation::UpdateDevice));
        assert!(!matrix.has_permission(Some(&user), Operation::DeleteDevice));
    }

    #[test]
    fn levels_missing_from_custom_tables_fail_closed() {
        let matrix = PermissionMatrix::new(HashMap::new(), HashMap::new());
        let user = principal(AccessLevel::Admin);
        assert!(!matrix.has_permission(Some(&user), Operation::ReadImei));
        assert_eq!(matrix.default_scope(AccessLevel::Admin), DataScope::None);
    }

    #[test]
    fn summary_reports_effective_override() {
        let matrix = PermissionMatrix::default();
        let mut user = principal(AccessLevel::Basic);
        user.custom_operations = HashSet::from([Operation::ReadAudit]);
        let summary = matrix.summarize(&user);
        assert_eq!(summary.effective_operations, vec!["read_audit"]);
        assert_eq!(summary.default_operations, vec!["read_imei", "search_imei"]);
        assert_eq!(summary.data_scope, DataScope::Own);
    }
}
