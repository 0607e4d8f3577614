// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn levels_are_ordered() {
    assert!(PermissionLevel::Player < PermissionLevel::Builder);
    assert!(PermissionLevel::Builder < PermissionLevel::SeniorBuilder);
    assert!(PermissionLevel::SeniorBuilder < PermissionLevel::Administrator);
}

#[parameterized(
    player = { PermissionLevel::Player, 0 },
    builder = { PermissionLevel::Builder, 1 },
    senior = { PermissionLevel::SeniorBuilder, 2 },
    admin = { PermissionLevel::Administrator, 3 },
)]
fn level_ranks(level: PermissionLevel, rank: u8) {
    assert_eq!(level.rank(), rank);
    assert_eq!(PermissionLevel::try_from(rank).unwrap(), level);
}

#[test]
fn level_serializes_as_number() {
    let json = serde_json::to_string(&PermissionLevel::SeniorBuilder).unwrap();
    assert_eq!(json, "2");
    let back: PermissionLevel = serde_json::from_str("3").unwrap();
    assert_eq!(back, PermissionLevel::Administrator);
}

#[test]
fn unknown_level_rejected() {
    assert!(serde_json::from_str::<PermissionLevel>("9").is_err());
}

#[test]
fn permissions_data_matches_contract_format() {
    let json = r#"{ "levels": {"alice": 2, "bob": 1}, "domains": {"bob": ["/areas/castle/"]} }"#;
    let data: PermissionsData = serde_json::from_str(json).unwrap();
    assert_eq!(data.levels["alice"], PermissionLevel::SeniorBuilder);
    assert_eq!(data.levels["bob"], PermissionLevel::Builder);
    assert_eq!(data.domains["bob"], vec!["/areas/castle/".to_string()]);

    let round = serde_json::to_string(&data).unwrap();
    let back: PermissionsData = serde_json::from_str(&round).unwrap();
    assert_eq!(back, data);
}

#[test]
fn audit_entry_serde() {
    let entry = AuditEntry {
        at_ms: 1_000,
        player: "bob".into(),
        action: AuditAction::Write,
        target: "/areas/castle/room1".into(),
        success: true,
        detail: "domain /areas/castle/".into(),
    };
    let json = serde_json::to_string(&entry).unwrap();
    assert!(json.contains("\"write\""));
    let back: AuditEntry = serde_json::from_str(&json).unwrap();
    assert_eq!(back, entry);
}
