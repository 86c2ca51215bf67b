//! Loading principal snapshots out of the users table.

use std::collections::HashSet;

use entity::users;
use platform_access::{Operation, Principal, parse_level, parse_rules, parse_scope};
use platform_authn::PrincipalStore;
use platform_db::DbPool;
use sea_orm::EntityTrait;
use tracing::warn;
use uuid::Uuid;

// Free function rather than a `From` impl so fixtures and the permissions
// endpoint can convert rows they already hold without cloning them first.
pub fn principal_from_model(model: &users::Model) -> Principal {
    let allowed_brands = model
        .allowed_brands
        .as_ref()
        .and_then(|value| value.as_array().cloned())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    let allowed_ranges = model
        .allowed_imei_ranges
        .as_ref()
        .map(parse_rules)
        .unwrap_or_default();

    let custom_operations = model
        .permissions
        .as_ref()
        .and_then(|value| value.get("operations"))
        .and_then(|ops| ops.as_array())
        .map(|items| {
            let mut set = HashSet::new();
            for item in items {
                match item.as_str().and_then(Operation::parse) {
                    Some(op) => {
                        set.insert(op);
                    }
                    None => warn!(user_id = %model.id, ?item, "dropping unknown operation token"),
                }
            }
            set
        })
        .unwrap_or_default();

    Principal {
        id: model.id,
        level: parse_level(&model.access_level),
        data_scope: model.data_scope.as_deref().and_then(parse_scope),
        organization: model.organization.clone(),
        is_active: model.is_active,
        allowed_brands,
        allowed_ranges,
        custom_operations,
    }
}

/// Borrowed view over the connection pool that the resolution state machine
/// can load principals through.
pub struct PrincipalRepo<'a>(pub &'a DbPool);

impl PrincipalStore for PrincipalRepo<'_> {
    async fn find_principal(&self, id: Uuid) -> anyhow::Result<Option<Principal>> {
        let row = users::Entity::find_by_id(id).one(self.0).await?;
        Ok(row.as_ref().map(principal_from_model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use platform_access::{AccessLevel, AccessRule, DataScope};
    use serde_json::json;

    fn model() -> users::Model {
        users::Model {
            id: Uuid::new_v4(),
            email: "party@example.com".into(),
            display_name: None,
            access_level: "limited".into(),
            data_scope: Some("ranges".into()),
            organization: Some("acme-telecom".into()),
            is_active: true,
            allowed_brands: Some(json!(["Samsung", "Nokia"])),
            allowed_imei_ranges: Some(json!([
                {"type": "prefix", "prefix": "3527"},
                {"type": "nonsense"},
            ])),
            permissions: Some(json!({"operations": ["read_imei", "bogus_op"]})),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn model_fields_map_onto_the_principal() {
        let principal = principal_from_model(&model());
        assert_eq!(principal.level, AccessLevel::Limited);
        assert_eq!(principal.data_scope, Some(DataScope::Ranges));
        assert_eq!(principal.allowed_brands, vec!["Samsung", "Nokia"]);
        assert_eq!(
            principal.allowed_ranges,
            vec![AccessRule::Prefix {
                prefix: "3527".into()
            }]
        );
        assert_eq!(
            principal.custom_operations,
            HashSet::from([Operation::ReadImei])
        );
    }

    #[test]
    fn garbage_level_and_scope_strings_degrade_safely() {
        let mut row = model();
        row.access_level = "superuser".into();
        row.data_scope = Some("galaxy".into());
        let principal = principal_from_model(&row);
        assert_eq!(principal.level, AccessLevel::Basic);
        assert_eq!(principal.data_scope, None);
    }

    #[test]
    fn absent_json_columns_mean_no_restrictions() {
        let mut row = model();
        row.allowed_brands = None;
        row.allowed_imei_ranges = None;
        row.permissions = None;
        let principal = principal_from_model(&row);
        assert!(principal.allowed_brands.is_empty());
        assert!(principal.allowed_ranges.is_empty());
        assert!(principal.custom_operations.is_empty());
    }
}
