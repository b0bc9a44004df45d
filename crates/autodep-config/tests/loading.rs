use std::path::PathBuf;

use autodep::TokenMode;
use autodep_config::{ConfigError, ConfigFormat, ConfigLoader, ConfigOverrides};
use figment::Jail;

fn loader(jail: &Jail) -> ConfigLoader {
    ConfigLoader::new(jail.directory())
}

#[test]
fn defaults_without_config_file() {
    Jail::expect_with(|jail| {
        let loaded = loader(jail).load().map_err(|e| e.to_string())?;

        assert!(loaded.source.is_none());
        assert_eq!(loaded.config.trees.len(), 2);
        assert_eq!(loaded.config.trees[0].root, jail.directory().join("app"));
        assert_eq!(loaded.config.bundles.names, vec!["app", "tests"]);
        assert_eq!(loaded.config.settings.token_mode, TokenMode::Stat);
        Ok(())
    });
}

#[test]
fn toml_file_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "autodep.toml",
            r#"
[package]
exclude = ["@ember/string"]

[[trees]]
root = "src"
prefix = "src/"

[bundles]
names = ["app", "admin"]
rules = [{ prefix = "src/admin/", bundle = "admin" }]

[append]
upstream_dir = "dist"
generated_dir = "tmp/generated"
output_dir = "dist-final"

[append.mappings."assets/vendor"]
js = "app"
css = "app"
"#,
        )?;

        let loaded = loader(jail).load().map_err(|e| e.to_string())?;
        let config = loaded.config;

        assert_eq!(loaded.source.map(|s| s.format), Some(ConfigFormat::Toml));
        assert_eq!(config.package.exclude, vec!["@ember/string"]);
        assert_eq!(config.trees.len(), 1);
        assert_eq!(config.trees[0].root, jail.directory().join("src"));
        assert_eq!(config.bundles.default, "app");

        let append = config.append_options().expect("append section");
        assert_eq!(append.upstream_dir, jail.directory().join("dist"));
        assert_eq!(append.mappings["assets/vendor"]["css"], "app");
        Ok(())
    });
}

#[test]
fn package_json_field() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "package.json",
            r#"{
                "name": "my-app",
                "autodep": {
                    "package": { "aliases": { "lodash": "lodash-es" } },
                    "settings": { "token_mode": "content" }
                }
            }"#,
        )?;

        let loaded = loader(jail).load().map_err(|e| e.to_string())?;
        assert_eq!(loaded.source.map(|s| s.format), Some(ConfigFormat::PackageJson));
        assert_eq!(loaded.config.package.aliases["lodash"], "lodash-es");
        assert_eq!(loaded.config.settings.token_mode, TokenMode::Content);
        Ok(())
    });
}

#[test]
fn environment_overrides_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "autodep.toml",
            r#"
[settings]
max_concurrency = 2
"#,
        )?;
        jail.set_env("AUTODEP_SETTINGS__MAX_CONCURRENCY", "6");
        jail.set_env("AUTODEP_OUTPUT__DEPS_FILE", "out/deps.json");

        let config = loader(jail).load().map_err(|e| e.to_string())?.config;
        assert_eq!(config.settings.max_concurrency, Some(6));
        assert_eq!(config.output.deps_file, jail.directory().join("out/deps.json"));
        Ok(())
    });
}

#[test]
fn cli_overrides_environment() {
    Jail::expect_with(|jail| {
        jail.set_env("AUTODEP_SETTINGS__MAX_CONCURRENCY", "6");

        let config = loader(jail)
            .with_overrides(ConfigOverrides {
                max_concurrency: Some(1),
                token_mode: Some(TokenMode::Content),
                deps_file: Some(PathBuf::from("/abs/deps.json")),
            })
            .load()
            .map_err(|e| e.to_string())?
            .config;

        assert_eq!(config.settings.max_concurrency, Some(1));
        assert_eq!(config.settings.token_mode, TokenMode::Content);
        assert_eq!(config.output.deps_file, PathBuf::from("/abs/deps.json"));
        Ok(())
    });
}

#[test]
fn explicit_missing_file() {
    Jail::expect_with(|jail| {
        let err = loader(jail).with_file("nope.toml").load().unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
        Ok(())
    });
}

#[test]
fn invalid_values_are_reported() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "autodep.toml",
            r#"
[bundles]
names = ["app"]
default = "vendor"
"#,
        )?;

        let err = loader(jail).load().unwrap_err();
        assert!(matches!(err, ConfigError::SchemaValidation { .. }));
        assert!(err.to_string().contains("'vendor'"), "{}", err);
        Ok(())
    });
}
