// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs;
use tempfile::TempDir;

fn mudlib(files: &[(&str, &str)]) -> (TempDir, Compiler) {
    let dir = TempDir::new().unwrap();
    for (rel, source) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, source).unwrap();
    }
    let compiler = Compiler::new(Arc::new(ScriptHost::new()), dir.path());
    (dir, compiler)
}

#[test]
fn source_path_resolution() {
    let (dir, compiler) = mudlib(&[]);
    assert_eq!(
        compiler.source_path(&ObjectPath::new("/areas/town/bakery")),
        dir.path().join("areas/town/bakery.rhai")
    );
}

#[test]
fn content_path_round_trip() {
    let (dir, compiler) = mudlib(&[]);
    let file = dir.path().join("areas/town/bakery.rhai");
    assert_eq!(
        compiler.content_path_for(&file),
        Some(ObjectPath::new("/areas/town/bakery"))
    );
    assert!(compiler.content_path_for(&dir.path().join("areas/notes.txt")).is_none());
    assert!(compiler.content_path_for(Path::new("/elsewhere/x.rhai")).is_none());
}

#[test]
fn load_builds_configured_instance() {
    let (_dir, compiler) = mudlib(&[(
        "areas/town/bakery.rhai",
        r#"fn on_create() { this.short_desc = "the bakery"; this.loaves = 12; }"#,
    )]);

    let module = compiler.load("/areas/town/bakery").unwrap();
    assert_eq!(module.instance.object_id().as_str(), "/areas/town/bakery");
    assert!(!module.instance.is_clone());
    assert_eq!(module.instance.short_desc(), "the bakery");
    assert_eq!(module.instance.props().get("loaves").unwrap().as_int().unwrap(), 12);
    assert!(module.script.has_fn("on_create"));
}

#[test]
fn missing_source_is_a_compile_error() {
    let (_dir, compiler) = mudlib(&[]);
    let err = compiler.load("/areas/missing").unwrap_err();
    assert_eq!(err.path.as_str(), "/areas/missing");
}

#[test]
fn syntax_error_reports_diagnostic() {
    let (_dir, compiler) = mudlib(&[("bad.rhai", "fn on_create( {")]);
    let err = compiler.load("/bad").unwrap_err();
    assert!(!err.detail.is_empty());
}

#[test]
fn recompile_yields_independent_scripts() {
    let (dir, compiler) = mudlib(&[("obj.rhai", "fn flavor() { \"stale\" }")]);
    let first = compiler.load("/obj").unwrap();

    fs::write(dir.path().join("obj.rhai"), "fn flavor() { \"fresh\" }\nfn extra() { }").unwrap();
    let second = compiler.load("/obj").unwrap();

    assert!(!Arc::ptr_eq(&first.script, &second.script));
    assert!(!first.script.has_fn("extra"));
    assert!(second.script.has_fn("extra"));
}
