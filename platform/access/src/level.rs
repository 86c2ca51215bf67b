//! Ordered access levels, the operation catalog and data scopes.

use serde::{Deserialize, Serialize};

/// Hierarchical access tier. Comparison is always by position in
/// [`AccessLevel::SEQUENCE`], never by name.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Visitor,
    Basic,
    Limited,
    Standard,
    Elevated,
    Admin,
}

impl AccessLevel {
    /// Fixed ordering, lowest tier first.
    pub const SEQUENCE: [AccessLevel; 6] = [
        AccessLevel::Visitor,
        AccessLevel::Basic,
        AccessLevel::Limited,
        AccessLevel::Standard,
        AccessLevel::Elevated,
        AccessLevel::Admin,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::Visitor => "visitor",
            AccessLevel::Basic => "basic",
            AccessLevel::Limited => "limited",
            AccessLevel::Standard => "standard",
            AccessLevel::Elevated => "elevated",
            AccessLevel::Admin => "admin",
        }
    }

    fn index(self) -> usize {
        Self::SEQUENCE
            .iter()
            .position(|level| *level == self)
            .unwrap_or(0)
    }

    /// Minimum-level check by ordinal position.
    pub fn at_least(self, minimum: AccessLevel) -> bool {
        self.index() >= minimum.index()
    }
}

/// Map a stored level string to a canonical level, case-insensitively.
///
/// Unrecognized or empty input maps to `Basic`, not `Visitor`. The upstream
/// system shipped with this default and account visibility depends on it, so
/// it is kept as-is. Do not change without a data migration.
pub fn parse_level(value: &str) -> AccessLevel {
    match value.trim().to_ascii_lowercase().as_str() {
        "visitor" => AccessLevel::Visitor,
        "basic" => AccessLevel::Basic,
        "limited" => AccessLevel::Limited,
        "standard" => AccessLevel::Standard,
        "elevated" => AccessLevel::Elevated,
        "admin" => AccessLevel::Admin,
        _ => AccessLevel::Basic,
    }
}

/// Fine-grained action catalog. Operations are opaque tokens: no operation
/// implies another, callers must check exactly what they intend to do.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ReadImei,
    SearchImei,
    UpdateImeiStatus,
    ReadDevice,
    CreateDevice,
    UpdateDevice,
    DeleteDevice,
    AssignDevice,
    ReadSim,
    CreateSim,
    UpdateSim,
    DeleteSim,
    ReadUser,
    CreateUser,
    UpdateUser,
    DeleteUser,
    ReadAnalytics,
    ReadSearchHistory,
    ReadAudit,
    BulkOperations,
    ManagePermissions,
    SystemConfig,
}

impl Operation {
    /// Every operation the system knows about; `Admin` gets all of them.
    pub const CATALOG: [Operation; 22] = [
        Operation::ReadImei,
        Operation::SearchImei,
        Operation::UpdateImeiStatus,
        Operation::ReadDevice,
        Operation::CreateDevice,
        Operation::UpdateDevice,
        Operation::DeleteDevice,
        Operation::AssignDevice,
        Operation::ReadSim,
        Operation::CreateSim,
        Operation::UpdateSim,
        Operation::DeleteSim,
        Operation::ReadUser,
        Operation::CreateUser,
        Operation::UpdateUser,
        Operation::DeleteUser,
        Operation::ReadAnalytics,
        Operation::ReadSearchHistory,
        Operation::ReadAudit,
        Operation::BulkOperations,
        Operation::ManagePermissions,
        Operation::SystemConfig,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::ReadImei => "read_imei",
            Operation::SearchImei => "search_imei",
            Operation::UpdateImeiStatus => "update_imei_status",
            Operation::ReadDevice => "read_device",
            Operation::CreateDevice => "create_device",
            Operation::UpdateDevice => "update_device",
            Operation::DeleteDevice => "delete_device",
            Operation::AssignDevice => "assign_device",
            Operation::ReadSim => "read_sim",
            Operation::CreateSim => "create_sim",
            Operation::UpdateSim => "update_sim",
            Operation::DeleteSim => "delete_sim",
            Operation::ReadUser => "read_user",
            Operation::CreateUser => "create_user",
            Operation::UpdateUser => "update_user",
            Operation::DeleteUser => "delete_user",
            Operation::ReadAnalytics => "read_analytics",
            Operation::ReadSearchHistory => "read_search_history",
            Operation::ReadAudit => "read_audit",
            Operation::BulkOperations => "bulk_operations",
            Operation::ManagePermissions => "manage_permissions",
            Operation::SystemConfig => "system_config",
        }
    }

    /// Parse a stored operation token. Unknown tokens yield `None` so that
    /// bad configuration rows never grant anything.
    pub fn parse(value: &str) -> Option<Self> {
        Self::CATALOG
            .iter()
            .copied()
            .find(|op| op.as_str() == value)
    }
}

/// Breadth of data a principal may see.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataScope {
    None,
    Own,
    Organization,
    Brands,
    Ranges,
    All,
}

impl DataScope {
    pub fn as_str(self) -> &'static str {
        match self {
            DataScope::None => "none",
            DataScope::Own => "own",
            DataScope::Organization => "organization",
            DataScope::Brands => "brands",
            DataScope::Ranges => "ranges",
            DataScope::All => "all",
        }
    }
}

/// Map a stored scope string to a canonical scope. Unlike levels, an
/// unrecognized scope has no fallback: the level default applies instead.
pub fn parse_scope(value: &str) -> Option<DataScope> {
    match value.trim().to_ascii_lowercase().as_str() {
        "none" => Some(DataScope::None),
        "own" => Some(DataScope::Own),
        "organization" => Some(DataScope::Organization),
        "brands" => Some(DataScope::Brands),
        "ranges" => Some(DataScope::Ranges),
        "all" => Some(DataScope::All),
        _ => None,
    }
}
