//! End-to-end runs of the `autodep` binary.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn autodep(dir: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_autodep"));
    cmd.current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn create_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "package.json", r#"{"name":"my-app","version":"1.0.0"}"#);
    write(
        root,
        "node_modules/left-pad/package.json",
        r#"{"name":"left-pad","version":"1.3.0"}"#,
    );
    write(root, "node_modules/left-pad/index.js", "module.exports = pad;");
    write(root, "app/app.js", "import pad from 'left-pad';\n");
    write(root, "tests/app-test.js", "import './helpers';\n");
    dir
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    autodep(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("append"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn test_check_uses_defaults_without_config() {
    let dir = TempDir::new().unwrap();
    autodep(dir.path())
        .args(["check", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[bundles]"))
        .stderr(predicate::str::contains("using defaults"));
}

#[test]
fn test_check_rejects_unknown_default_bundle() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "autodep.toml",
        "[bundles]\nnames = [\"app\"]\ndefault = \"vendor\"\nrules = []\n",
    );
    autodep(dir.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("vendor"));
}

#[test]
fn test_check_fs_reports_missing_tree() {
    let dir = TempDir::new().unwrap();
    autodep(dir.path())
        .args(["check", "--fs"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("source tree not found"));
}

#[test]
fn test_analyze_writes_snapshot() {
    let dir = create_project();
    autodep(dir.path())
        .args(["analyze", "--out", "deps.json", "--token-mode", "content"])
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("deps.json")).unwrap()).unwrap();
    assert_eq!(json["app"]["staticImports"][0]["specifier"], "left-pad");
    assert_eq!(
        json["app"]["staticImports"][0]["importedBy"][0]["sourceFile"],
        "app/app.js"
    );
    assert!(json["tests"]["staticImports"].as_array().unwrap().is_empty());
}

#[test]
fn test_analyze_skips_uninstalled_packages() {
    let dir = create_project();
    write(dir.path(), "app/other.js", "import Component from '@ember/component';\n");
    autodep(dir.path())
        .args(["analyze", "--out", "deps.json"])
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("deps.json")).unwrap()).unwrap();
    let specifiers: Vec<&str> = json["app"]["staticImports"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|i| i["specifier"].as_str())
        .collect();
    assert_eq!(specifiers, vec!["left-pad"]);
}

#[test]
fn test_analyze_broken_package_fails_with_hint() {
    let dir = create_project();
    write(
        dir.path(),
        "node_modules/broken/package.json",
        r#"{"name":"broken","main":"dist/missing.js"}"#,
    );
    write(dir.path(), "app/other.js", "import 'broken';\n");
    autodep(dir.path())
        .arg("analyze")
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken"))
        .stderr(predicate::str::contains("package.exclude"));
}

#[test]
fn test_append_without_config_section_fails() {
    let dir = create_project();
    autodep(dir.path())
        .arg("append")
        .assert()
        .failure()
        .stderr(predicate::str::contains("[append]"));
}

#[test]
fn test_build_merges_generated_bundle() {
    let dir = create_project();
    let root = dir.path();
    write(
        root,
        "autodep.toml",
        r#"
[append]
upstream_dir = "dist"
generated_dir = "tmp/generated"
output_dir = "out"

[append.mappings."assets/vendor.js"]
js = "app"
"#,
    );
    write(root, "dist/index.html", "<html></html>");
    write(root, "dist/assets/vendor.js", "define('jquery');");
    write(root, "tmp/generated/app/chunk.0.js", "define('left-pad');");

    autodep(root)
        .args(["build", "--token-mode", "content"])
        .assert()
        .success();

    assert!(root.join("dist/autodep-deps.json").is_file());
    assert_eq!(
        fs::read_to_string(root.join("out/index.html")).unwrap(),
        "<html></html>"
    );
    assert_eq!(
        fs::read_to_string(root.join("out/assets/vendor.js")).unwrap(),
        "define('jquery');;\ndefine('left-pad');"
    );
}
