//! End-to-end analysis builds against a real directory.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use autodep::{
    ListOptions, NativeRuntime, OxcModuleParser, Package, Pipeline, PipelineOptions,
    RuleBundlePolicy, SourceTree, SplitError, TokenMode,
};
use tempfile::TempDir;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().expect("parent")).expect("create parent");
    fs::write(path, content).expect("write file");
}

fn create_project() -> TempDir {
    let dir = TempDir::new().expect("temp dir");
    let root = dir.path();

    write(root, "package.json", r#"{"name":"my-app","version":"0.0.1"}"#);
    write(
        root,
        "node_modules/left-pad/package.json",
        r#"{"name":"left-pad","version":"1.3.0","main":"lib/index"}"#,
    );
    write(root, "node_modules/left-pad/lib/index.js", "module.exports = pad;");
    write(
        root,
        "node_modules/@scope/icons/package.json",
        r#"{"name":"@scope/icons","version":"4.1.0"}"#,
    );
    write(root, "node_modules/@scope/icons/index.js", "export {};");
    write(root, "node_modules/@scope/icons/svg/a.js", "export default 'a';");

    write(
        root,
        "app/app.js",
        "import pad from 'left-pad';\nimport { helper } from './helper';\n",
    );
    write(root, "app/helper.js", "export const helper = 1;\n");
    write(
        root,
        "app/icons.js",
        "export function load(name) { return import(`@scope/icons/svg/${name}.js`); }\n",
    );
    write(root, "tests/app-test.js", "import pad from 'left-pad';\n");

    dir
}

fn pipeline(root: &Path) -> Pipeline {
    let package = Arc::new(Package::new("my-app", root));
    let mut options = PipelineOptions::new(vec![
        SourceTree::new(root.join("app"), Arc::clone(&package))
            .with_path_prefix("app/")
            .with_tree_kind("app"),
        SourceTree::new(root.join("tests"), package)
            .with_path_prefix("tests/")
            .with_tree_kind("tests"),
    ]);
    options.list_options = ListOptions {
        token_mode: TokenMode::Content,
        ..ListOptions::default()
    };

    Pipeline::new(
        options,
        Arc::new(NativeRuntime::new()),
        Arc::new(OxcModuleParser::new()),
        Arc::new(RuleBundlePolicy::default()),
    )
}

#[tokio::test]
async fn test_resolves_packages_and_templates() {
    let dir = create_project();
    let mut pipeline = pipeline(dir.path());

    let outcome = pipeline.build().await.unwrap();
    let app = outcome.deps.get("app").unwrap();

    assert_eq!(app.static_imports.len(), 1);
    let left_pad = &app.static_imports[0];
    assert_eq!(left_pad.specifier, "left-pad");
    assert_eq!(
        left_pad.entrypoint,
        dir.path().join("node_modules/left-pad/lib/index.js")
    );
    // app importer wins over the tests importer: declared first
    let importers: Vec<&str> = left_pad
        .imported_by
        .iter()
        .map(|i| i.source_file.as_str())
        .collect();
    assert_eq!(importers, vec!["app/app.js", "tests/app-test.js"]);

    assert_eq!(app.dynamic_template_imports.len(), 1);
    let template = &app.dynamic_template_imports[0];
    assert_eq!(template.cooked_quasis, vec!["@scope/icons/svg/", ".js"]);
    assert_eq!(template.expression_name_hints, vec![Some("name".to_string())]);
    assert_eq!(
        template.entrypoint,
        dir.path().join("node_modules/@scope/icons/svg/")
    );

    assert!(outcome.deps.get("tests").unwrap().is_empty());
}

#[tokio::test]
async fn test_incremental_rebuilds() {
    let dir = create_project();
    let mut pipeline = pipeline(dir.path());

    let first = pipeline.build().await.unwrap();
    let second = pipeline.build().await.unwrap();
    assert!(!second.recomputed);
    assert!(Arc::ptr_eq(&first.deps, &second.deps));

    fs::remove_file(dir.path().join("app/icons.js")).unwrap();
    let third = pipeline.build().await.unwrap();
    assert!(third.recomputed);
    assert!(third.deps.get("app").unwrap().dynamic_template_imports.is_empty());
}

#[tokio::test]
async fn test_relative_dynamic_import_fails() {
    let dir = create_project();
    write(dir.path(), "app/lazy.js", "import('./helper');\n");
    let mut pipeline = pipeline(dir.path());

    let err = pipeline.build().await.unwrap_err();
    assert!(matches!(
        err,
        autodep::Error::Split(SplitError::RelativeDynamicImport { .. })
    ));
    assert!(err.to_string().contains("app/lazy.js"));
}

#[tokio::test]
async fn test_syntax_errors_are_recovered() {
    let dir = create_project();
    write(dir.path(), "app/broken.js", "import from from from;\n");
    let mut pipeline = pipeline(dir.path());

    let outcome = pipeline.build().await.unwrap();
    assert_eq!(outcome.deps.get("app").unwrap().static_imports.len(), 1);
}

#[tokio::test]
async fn test_uninstalled_packages_are_skipped() {
    let dir = create_project();
    write(
        dir.path(),
        "app/component.js",
        "import Component from '@ember/component';\nimport pad from 'left-pad';\n",
    );
    let mut pipeline = pipeline(dir.path());

    let outcome = pipeline.build().await.unwrap();
    let app = outcome.deps.get("app").unwrap();
    let specifiers: Vec<&str> = app
        .static_imports
        .iter()
        .map(|i| i.specifier.as_str())
        .collect();
    assert_eq!(specifiers, vec!["left-pad"]);
}

#[tokio::test]
async fn test_installed_package_without_entry_is_fatal() {
    let dir = create_project();
    write(
        dir.path(),
        "node_modules/broken/package.json",
        r#"{"name":"broken","main":"dist/missing.js"}"#,
    );
    write(dir.path(), "app/broken.js", "import 'broken';\n");
    let mut pipeline = pipeline(dir.path());

    let err = pipeline.build().await.unwrap_err();
    assert!(err.to_string().contains("broken"), "{}", err);
}

#[tokio::test]
async fn test_write_deps_snapshot() {
    let dir = create_project();
    let mut pipeline = pipeline(dir.path());
    pipeline.build().await.unwrap();

    let out = dir.path().join("dist/deps.json");
    pipeline.write_deps(&out).await.unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
    assert_eq!(json["app"]["staticImports"][0]["specifier"], "left-pad");
    assert!(json["tests"]["staticImports"].as_array().unwrap().is_empty());
}
