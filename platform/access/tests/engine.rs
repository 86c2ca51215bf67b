//! End-to-end scenarios across the matrix, scope resolver and decision
//! engine, written against the public API only.

use std::collections::HashSet;

use platform_access::{
    AccessLevel, AccessRule, DecisionReason, Operation, PermissionMatrix, Principal, ScopeFilter,
    can_access_imei, parse_level,
};
use uuid::Uuid;

const IMEI: &str = "352745080123456";

#[test]
fn concerned_party_with_prefix_rule() {
    let mut party = Principal::with_level(Uuid::new_v4(), AccessLevel::Limited);
    party.allowed_ranges = vec![AccessRule::Prefix {
        prefix: "3527".into(),
    }];
    let decision = can_access_imei(Some(&party), IMEI, |_| None);
    assert!(decision.allowed);
    assert_eq!(decision.reason, DecisionReason::RangeMatch);
}

#[test]
fn concerned_party_outside_their_ranges() {
    let mut party = Principal::with_level(Uuid::new_v4(), AccessLevel::Limited);
    party.allowed_ranges = vec![AccessRule::Exact {
        imeis: vec!["111".into()],
    }];
    let decision = can_access_imei(Some(&party), IMEI, |_| None);
    assert!(!decision.allowed);
    assert_eq!(decision.reason, DecisionReason::RangeNoMatch);
}

#[test]
fn a_freshly_loaded_account_with_garbage_level_acts_as_basic() {
    let matrix = PermissionMatrix::default();
    let principal = Principal::with_level(Uuid::new_v4(), parse_level("whatever"));
    assert_eq!(principal.level, AccessLevel::Basic);
    assert!(matrix.has_permission(Some(&principal), Operation::SearchImei));
    assert!(!matrix.has_permission(Some(&principal), Operation::ReadDevice));
}

#[test]
fn suspended_admin_keeps_nothing() {
    let matrix = PermissionMatrix::default();
    let mut admin = Principal::with_level(Uuid::new_v4(), AccessLevel::Admin);
    admin.is_active = false;
    admin.custom_operations = HashSet::from([Operation::SystemConfig]);
    assert!(!matrix.has_permission(Some(&admin), Operation::ReadImei));
    assert!(!matrix.has_permission(Some(&admin), Operation::SystemConfig));
}

#[test]
fn scope_and_permission_agree_for_an_elevated_operator() {
    let matrix = PermissionMatrix::default();
    let mut operator = Principal::with_level(Uuid::new_v4(), AccessLevel::Elevated);
    operator.organization = Some("acme-telecom".into());
    assert!(matrix.has_permission(Some(&operator), Operation::UpdateImeiStatus));
    assert_eq!(
        matrix.resolve_scope(Some(&operator)),
        ScopeFilter::Organization {
            organization: "acme-telecom".into()
        }
    );
}

#[test]
fn decision_does_not_mutate_the_principal() {
    let mut party = Principal::with_level(Uuid::new_v4(), AccessLevel::Limited);
    party.allowed_ranges = vec![AccessRule::Prefix {
        prefix: "3527".into(),
    }];
    let before = format!("{:?}", party);
    let _ = can_access_imei(Some(&party), IMEI, |_| None);
    assert_eq!(before, format!("{:?}", party));
}
