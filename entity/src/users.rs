use sea_orm::prelude::{DateTimeWithTimeZone, *};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub display_name: Option<String>,
    /// Stored level token; parsed through `platform_access::parse_level`.
    pub access_level: String,
    /// Stored scope override token, if any.
    pub data_scope: Option<String>,
    pub organization: Option<String>,
    pub is_active: bool,
    /// JSON array of brand names.
    pub allowed_brands: Option<Json>,
    /// JSON array of access-rule objects.
    pub allowed_imei_ranges: Option<Json>,
    /// JSON object; `operations` holds the custom operation override.
    pub permissions: Option<Json>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::devices::Entity")]
    Devices,
}

impl Related<super::devices::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Devices.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
