//! Scope resolution: from a principal snapshot to a storage-agnostic filter.

use serde::Serialize;
use uuid::Uuid;

use crate::level::DataScope;
use crate::matrix::PermissionMatrix;
use crate::principal::Principal;
use crate::rules::AccessRule;

/// Data-visibility envelope handed to the storage layer.
///
/// This is a descriptor, not a query: `platform-db` translates it into a
/// predicate. Keeping the engine on this side of the seam means it never
/// issues queries and can be exercised without a database.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ScopeFilter {
    /// Always-false predicate: the caller sees nothing.
    None,
    /// Rows owned by the principal.
    Own { owner_id: Uuid },
    /// Rows belonging to the principal's organization.
    Organization { organization: String },
    /// Rows whose brand is on the allow-list.
    Brands { brands: Vec<String> },
    /// Rows whose identifier satisfies any of the allow-list rules.
    Ranges { rules: Vec<AccessRule> },
    /// No narrowing at all.
    All,
}

impl PermissionMatrix {
    /// Derive the data filter for a principal.
    ///
    /// A stored scope overrides the level default; otherwise the companion
    /// scope table applies. Pure function of the snapshot: no storage access,
    /// and the principal is never mutated. Scopes whose payload is missing on
    /// the principal (an `Organization` scope without an organization, an
    /// empty brand or rule list) collapse to `ScopeFilter::None`.
    pub fn resolve_scope(&self, principal: Option<&Principal>) -> ScopeFilter {
        let Some(principal) = principal else {
            return ScopeFilter::None;
        };
        let scope = principal
            .data_scope
            .unwrap_or_else(|| self.default_scope(principal.level));
        match scope {
            DataScope::None => ScopeFilter::None,
            DataScope::Own => ScopeFilter::Own {
                owner_id: principal.id,
            },
            DataScope::Organization => match principal.organization.clone() {
                Some(organization) => ScopeFilter::Organization { organization },
                None => ScopeFilter::None,
            },
            DataScope::Brands => {
                if principal.allowed_brands.is_empty() {
                    ScopeFilter::None
                } else {
                    ScopeFilter::Brands {
                        brands: principal.allowed_brands.clone(),
                    }
                }
            }
            DataScope::Ranges => {
                if principal.allowed_ranges.is_empty() {
                    ScopeFilter::None
                } else {
                    ScopeFilter::Ranges {
                        rules: principal.allowed_ranges.clone(),
                    }
                }
            }
            DataScope::All => ScopeFilter::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::AccessLevel;
    use uuid::Uuid;

    #[test]
    fn anonymous_resolves_to_none() {
        let matrix = PermissionMatrix::default();
        assert_eq!(matrix.resolve_scope(None), ScopeFilter::None);
    }

    #[test]
    fn elevated_defaults_to_organization_scope() {
        let matrix = PermissionMatrix::default();
        let mut principal = Principal::with_level(Uuid::new_v4(), AccessLevel::Elevated);
        principal.organization = Some("acme-telecom".into());
        assert_eq!(
            matrix.resolve_scope(Some(&principal)),
            ScopeFilter::Organization {
                organization: "acme-telecom".into()
            }
        );
    }

    #[test]
    fn organization_scope_without_organization_sees_nothing() {
        let matrix = PermissionMatrix::default();
        let principal = Principal::with_level(Uuid::new_v4(), AccessLevel::Elevated);
        assert_eq!(matrix.resolve_scope(Some(&principal)), ScopeFilter::None);
    }

    #[test]
    fn stored_scope_overrides_the_level_default() {
        let matrix = PermissionMatrix::default();
        let id = Uuid::new_v4();
        let mut principal = Principal::with_level(id, AccessLevel::Elevated);
        principal.data_scope = Some(crate::level::DataScope::Own);
        assert_eq!(
            matrix.resolve_scope(Some(&principal)),
            ScopeFilter::Own { owner_id: id }
        );
    }

    #[test]
    fn admin_defaults_to_all() {
        let matrix = PermissionMatrix::default();
        let principal = Principal::with_level(Uuid::new_v4(), AccessLevel::Admin);
        assert_eq!(matrix.resolve_scope(Some(&principal)), ScopeFilter::All);
    }

    #[test]
    fn empty_brand_list_collapses_to_none() {
        let matrix = PermissionMatrix::default();
        let principal = Principal::with_level(Uuid::new_v4(), AccessLevel::Limited);
        assert_eq!(matrix.resolve_scope(Some(&principal)), ScopeFilter::None);
    }

    #[test]
    fn standard_defaults_to_own_rows() {
        let matrix = PermissionMatrix::default();
        let id = Uuid::new_v4();
        let principal = Principal::with_level(id, AccessLevel::Standard);
        assert_eq!(
            matrix.resolve_scope(Some(&principal)),
            ScopeFilter::Own { owner_id: id }
        );
    }
}
