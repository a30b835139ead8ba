//! Unit tests for privilege tiers and node scoping.
//!
//! Run with: cargo test --test scope_unit_test

use envhub::auth::{Claims, NodeScope, Principal, Privilege};

fn principal(level: i32) -> Principal {
    Principal {
        username: "alice".to_string(),
        institute: "iiser-p".to_string(),
        privilege: Privilege::from_level(level),
    }
}

#[test]
fn privilege_levels_map_to_tiers() {
    assert_eq!(Privilege::from_level(i32::MIN), Privilege::Service);
    assert_eq!(Privilege::from_level(-1), Privilege::Service);
    assert_eq!(Privilege::from_level(0), Privilege::Service);
    assert_eq!(Privilege::from_level(1), Privilege::InstituteAdmin);
    assert_eq!(Privilege::from_level(2), Privilege::Owner);
    assert_eq!(Privilege::from_level(3), Privilege::InstituteViewer);
    assert_eq!(Privilege::from_level(4), Privilege::Restricted);
    assert_eq!(Privilege::from_level(i32::MAX), Privilege::Restricted);
}

#[test]
fn institute_tiers_see_the_whole_institute() {
    for level in [1, 3] {
        assert_eq!(
            principal(level).scope(),
            NodeScope::Institute("iiser-p".to_string()),
            "level {level} should scope by institute"
        );
    }
}

#[test]
fn other_tiers_see_only_their_own_nodes() {
    for level in [-1, 0, 2, 4, 99] {
        assert_eq!(
            principal(level).scope(),
            NodeScope::Owner("alice".to_string()),
            "level {level} should scope by owner"
        );
    }
}

#[test]
fn mutation_gate_cuts_off_above_level_two() {
    for level in [-1, 0, 1, 2] {
        assert!(principal(level).can_mutate_nodes(), "level {level}");
    }
    for level in [3, 4, 99] {
        assert!(!principal(level).can_mutate_nodes(), "level {level}");
    }
}

#[test]
fn unrestricted_delete_needs_level_below_two() {
    for level in [-1, 0, 1] {
        assert!(principal(level).can_delete_any_node(), "level {level}");
    }
    // Owners fall back to uid + owner matching
    assert!(!principal(2).can_delete_any_node());
    assert!(!principal(3).can_delete_any_node());
}

#[test]
fn claims_resolve_to_principal() {
    let claims = Claims {
        username: "bob".to_string(),
        institute: "nio-goa".to_string(),
        privilege: 3,
        exp: 4_102_444_800,
        iat: 1_700_000_000,
    };

    let principal = Principal::from(claims);
    assert_eq!(principal.username, "bob");
    assert_eq!(principal.institute, "nio-goa");
    assert_eq!(principal.privilege, Privilege::InstituteViewer);
    assert_eq!(principal.scope(), NodeScope::Institute("nio-goa".to_string()));
}
