// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Permission gating and audit specs.

use em_core::{FakeClock, PermissionLevel};
use em_engine::Permissions;

#[test]
fn builder_domain_gating_with_audit_trail() {
    let perms = Permissions::new(FakeClock::new());
    perms.set_level("bob", PermissionLevel::Builder);
    perms.add_domain("bob", "/areas/castle/");

    let cases = [
        ("/areas/castle/room1", true),
        ("/areas/castle/npcs/g", true),
        ("/areas/town/x", false),
        ("/std/object", false),
    ];
    for (index, (path, expected)) in cases.iter().enumerate() {
        assert_eq!(perms.can_write(Some("bob"), path), *expected, "path {path}");
        assert_eq!(perms.audit_len(), index + 1);
        let entry = &perms.audit_log(1)[0];
        assert_eq!(entry.success, *expected);
        assert_eq!(entry.target, *path);
    }
}

#[test]
fn export_import_round_trips_exactly() {
    let perms = Permissions::new(FakeClock::new());
    perms.set_level("alice", PermissionLevel::SeniorBuilder);
    perms.set_level("bob", PermissionLevel::Builder);
    perms.add_domain("bob", "/areas/castle/");
    perms.add_domain("bob", "/areas/keep/");

    let exported = perms.export();
    let other = Permissions::new(FakeClock::new());
    other.import(exported.clone());
    assert_eq!(other.export(), exported);
}

#[test]
fn contract_file_format_is_accepted() {
    let raw = r#"{ "levels": {"alice": 2, "bob": 1}, "domains": {"bob": ["/areas/castle/"]} }"#;
    let data: em_core::PermissionsData = serde_json::from_str(raw).unwrap();

    let perms = Permissions::new(FakeClock::new());
    perms.import(data);
    assert_eq!(perms.level_for("alice"), PermissionLevel::SeniorBuilder);
    assert!(perms.can_write(Some("bob"), "/areas/castle/tower"));
    assert!(!perms.can_write(Some("alice"), "/areas/castle/tower"));
}
