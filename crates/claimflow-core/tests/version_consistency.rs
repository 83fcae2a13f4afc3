//! Ensures all workspace crates use `version.workspace = true` and that
//! the workspace version matches the compiled crate version.

use std::path::{Path, PathBuf};

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .ancestors()
        .nth(2)
        .unwrap()
        .to_path_buf()
}

fn read_toml(path: &Path) -> toml::Value {
    let text = std::fs::read_to_string(path).unwrap();
    text.parse().unwrap()
}

/// Read the workspace version from the root Cargo.toml.
fn workspace_version() -> String {
    let doc = read_toml(&workspace_root().join("Cargo.toml"));
    doc["workspace"]["package"]["version"]
        .as_str()
        .unwrap()
        .to_string()
}

#[test]
fn all_members_use_workspace_version() {
    let root = workspace_root();
    let doc = read_toml(&root.join("Cargo.toml"));
    let members = doc["workspace"]["members"].as_array().unwrap();
    assert!(!members.is_empty());

    for member in members {
        let member = member.as_str().unwrap();
        let manifest = read_toml(&root.join(member).join("Cargo.toml"));
        let inherits = manifest["package"]["version"]
            .get("workspace")
            .and_then(|v| v.as_bool())
            == Some(true);
        assert!(inherits, "{member} should use version.workspace = true");
    }
}

#[test]
fn workspace_version_matches_cargo_pkg() {
    assert_eq!(workspace_version(), claimflow_core::VERSION);
}

#[test]
fn internal_dependency_versions_match_workspace() {
    let doc = read_toml(&workspace_root().join("Cargo.toml"));
    let version = workspace_version();
    for name in ["claimflow-core", "claimflow-state"] {
        let dep = &doc["workspace"]["dependencies"][name];
        assert_eq!(
            dep["version"].as_str(),
            Some(version.as_str()),
            "{name} workspace dependency version"
        );
    }
}
