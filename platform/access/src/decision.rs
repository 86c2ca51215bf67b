//! The decision engine: composes the rule matcher, permission matrix and
//! scope semantics into yes/no answers with structured reasoning.
//!
//! Precedence is encoded as an ordered pipeline of named steps, each
//! returning a terminal decision or passing to the next step. Range rules
//! are checked before brand lists, and both before the default outcome;
//! the presence of any range rules puts the principal into allow-list-only
//! mode. Reordering these steps changes who can see what.

use serde::Serialize;
use uuid::Uuid;

use crate::principal::Principal;
use crate::rules::{AccessRule, first_match};

/// Why a decision came out the way it did. Kebab-case tokens end up in audit
/// records and API error payloads.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecisionReason {
    PublicAccess,
    AdminAccess,
    RangeMatch,
    RangeNoMatch,
    BrandMatch,
    BrandRestricted,
    OwnerMatch,
    OrganizationAccess,
    StandardAccess,
    AnonymousDenied,
    Denied,
}

impl DecisionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionReason::PublicAccess => "public-access",
            DecisionReason::AdminAccess => "admin-access",
            DecisionReason::RangeMatch => "range-match",
            DecisionReason::RangeNoMatch => "range-no-match",
            DecisionReason::BrandMatch => "brand-match",
            DecisionReason::BrandRestricted => "brand-restricted",
            DecisionReason::OwnerMatch => "owner-match",
            DecisionReason::OrganizationAccess => "organization-access",
            DecisionReason::StandardAccess => "standard-access",
            DecisionReason::AnonymousDenied => "anonymous-denied",
            DecisionReason::Denied => "denied",
        }
    }
}

/// Outcome of one authorization check. Constructed fresh per call and never
/// cached: the entity side of a check (ownership, brand) can change between
/// requests.
#[derive(Clone, Debug, Serialize)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<AccessRule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_brand: Option<String>,
}

impl AccessDecision {
    pub fn allow(reason: DecisionReason) -> Self {
        Self {
            allowed: true,
            reason,
            matched_rule: None,
            matched_brand: None,
        }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self {
            allowed: false,
            reason,
            matched_rule: None,
            matched_brand: None,
        }
    }

    fn with_rule(mut self, rule: AccessRule) -> Self {
        self.matched_rule = Some(rule);
        self
    }

    fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.matched_brand = Some(brand.into());
        self
    }
}

/// Entity snapshot for device-level checks. Loaded by the caller at call
/// time; the engine does not guarantee linearizability against concurrent
/// entity mutation.
#[derive(Clone, Debug)]
pub struct DeviceSnapshot {
    pub owner_id: Option<Uuid>,
    pub brand: Option<String>,
    pub organization: Option<String>,
}

/// May `principal` look up `imei`?
///
/// `lookup_brand` resolves the brand of the device carrying this IMEI; it is
/// only invoked when the principal actually has a brand allow-list and no
/// range rules, so callers can hand in a cheap closure over data they have
/// already fetched. A `None` result (unknown IMEI, device without a brand)
/// skips the brand step entirely.
pub fn can_access_imei<F>(
    principal: Option<&Principal>,
    imei: &str,
    lookup_brand: F,
) -> AccessDecision
where
    F: FnOnce(&str) -> Option<String>,
{
    let Some(principal) = principal else {
        // Anonymous lookups are allowed; the response layer strips them
        // down to public fields and the limiter has already run.
        return AccessDecision::allow(DecisionReason::PublicAccess);
    };
    admin_step(principal)
        .or_else(|| range_step(principal, imei))
        .or_else(|| brand_step(principal, imei, lookup_brand))
        .unwrap_or_else(|| AccessDecision::allow(DecisionReason::StandardAccess))
}

/// May `principal` access this device?
pub fn can_access_device(principal: Option<&Principal>, device: &DeviceSnapshot) -> AccessDecision {
    let Some(principal) = principal else {
        return AccessDecision::deny(DecisionReason::AnonymousDenied);
    };
    admin_step(principal)
        .or_else(|| owner_step(principal, device))
        .or_else(|| device_brand_step(principal, device))
        .or_else(|| organization_step(principal, device))
        .unwrap_or_else(|| AccessDecision::deny(DecisionReason::Denied))
}

fn admin_step(principal: &Principal) -> Option<AccessDecision> {
    principal
        .is_admin()
        .then(|| AccessDecision::allow(DecisionReason::AdminAccess))
}

/// Any configured range rule makes the rule list authoritative: a miss is a
/// denial even when a brand list would have allowed the identifier.
fn range_step(principal: &Principal, imei: &str) -> Option<AccessDecision> {
    if principal.allowed_ranges.is_empty() {
        return None;
    }
    Some(match first_match(&principal.allowed_ranges, imei) {
        Some(rule) => {
            AccessDecision::allow(DecisionReason::RangeMatch).with_rule(rule.clone())
        }
        None => AccessDecision::deny(DecisionReason::RangeNoMatch),
    })
}

fn brand_step<F>(principal: &Principal, imei: &str, lookup_brand: F) -> Option<AccessDecision>
where
    F: FnOnce(&str) -> Option<String>,
{
    if principal.allowed_brands.is_empty() {
        return None;
    }
    let brand = lookup_brand(imei)?;
    Some(if principal.allowed_brands.contains(&brand) {
        AccessDecision::allow(DecisionReason::BrandMatch).with_brand(brand)
    } else {
        AccessDecision::deny(DecisionReason::BrandRestricted).with_brand(brand)
    })
}

fn owner_step(principal: &Principal, device: &DeviceSnapshot) -> Option<AccessDecision> {
    (device.owner_id == Some(principal.id))
        .then(|| AccessDecision::allow(DecisionReason::OwnerMatch))
}

fn device_brand_step(principal: &Principal, device: &DeviceSnapshot) -> Option<AccessDecision> {
    if principal.allowed_brands.is_empty() {
        return None;
    }
    Some(match device.brand.as_deref() {
        Some(brand) if principal.allowed_brands.iter().any(|b| b == brand) => {
            AccessDecision::allow(DecisionReason::BrandMatch).with_brand(brand)
        }
        Some(brand) => AccessDecision::deny(DecisionReason::BrandRestricted).with_brand(brand),
        // Brand-scoped principals cannot see unbranded devices.
        None => AccessDecision::deny(DecisionReason::BrandRestricted),
    })
}

/// Partial narrowing: most devices do not carry an organization yet, so an
/// organization-scoped principal is allowed through unless the device
/// carries a contradicting one.
fn organization_step(principal: &Principal, device: &DeviceSnapshot) -> Option<AccessDecision> {
    if principal.data_scope != Some(crate::level::DataScope::Organization) {
        return None;
    }
    let organization = principal.organization.as_deref()?;
    match device.organization.as_deref() {
        None => Some(AccessDecision::allow(DecisionReason::OrganizationAccess)),
        Some(theirs) if theirs == organization => {
            Some(AccessDecision::allow(DecisionReason::OrganizationAccess))
        }
        Some(_) => None,
    }
}
