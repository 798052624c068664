//! Property-based tests for core types.

use proptest::prelude::*;

use crate::{AuditLevel, PolicyConfig, UserInfo};

fn any_level() -> impl Strategy<Value = AuditLevel> {
    prop::sample::select(AuditLevel::ALL.to_vec())
}

proptest! {
    #[test]
    fn level_display_parses_back(level in any_level()) {
        prop_assert_eq!(level.to_string().parse::<AuditLevel>().unwrap(), level);
    }

    #[test]
    fn level_gates_are_monotonic(a in any_level(), b in any_level()) {
        if a <= b {
            prop_assert!(!a.records_request_body() || b.records_request_body());
            prop_assert!(!a.records_response_body() || b.records_response_body());
            prop_assert!(!a.is_enabled() || b.is_enabled());
        }
    }

    #[test]
    fn response_body_implies_request_body(level in any_level()) {
        prop_assert!(!level.records_response_body() || level.records_request_body());
    }

    #[test]
    fn policy_yaml_keeps_level(level in any_level(), name in "p-[a-z0-9]{1,20}") {
        let yaml = format!("name: {name}\nauditLevel: {level}\n");
        let policies = PolicyConfig::from_yaml(&yaml).unwrap();
        prop_assert_eq!(policies.len(), 1);
        prop_assert_eq!(policies[0].level, level);
        prop_assert_eq!(&policies[0].name, &name);
    }

    #[test]
    fn named_user_is_never_empty(name in "[a-z]{1,12}") {
        prop_assert!(!UserInfo::new(name).is_empty());
    }
}
