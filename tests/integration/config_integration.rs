//! Integration tests for the layered configuration

use crate::integration::test_utils::EnvGuard;
use std::path::PathBuf;
use stowage::config::{BackendKind, ConfigLoader};
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "HOME",
    "XDG_CONFIG_HOME",
    "STOWAGE_ENV",
    "STOWAGE_BACKEND__BASE_URL",
    "STOWAGE_NAVIGATION__ACTIVITY_LIMIT",
];

fn isolated_env(dir: &TempDir) -> EnvGuard {
    let guard = EnvGuard::new(ENV_VARS);
    std::env::set_var("HOME", dir.path().join("home"));
    std::env::set_var("XDG_CONFIG_HOME", dir.path().join("xdg"));
    for name in &ENV_VARS[2..] {
        std::env::remove_var(name);
    }
    guard
}

fn write(path: PathBuf, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

#[test]
fn defaults_apply_without_any_file() {
    let dir = TempDir::new().unwrap();
    let _env = isolated_env(&dir);
    let config = ConfigLoader::load(dir.path()).unwrap();
    assert_eq!(config.backend.kind, BackendKind::Http);
    assert_eq!(config.backend.timeout_secs, 30);
    assert_eq!(config.navigation.max_ancestor_depth, 64);
    assert!(config.validate().is_err());
}

#[test]
fn workspace_file_overrides_user_file() {
    let dir = TempDir::new().unwrap();
    let _env = isolated_env(&dir);
    write(
        dir.path().join("xdg").join("stowage").join("config.toml"),
        r#"
[backend]
base_url = "https://user.example.com"
timeout_secs = 10
"#,
    );
    let workspace = dir.path().join("workspace");
    write(
        workspace.join("config").join("config.toml"),
        r#"
[backend]
base_url = "https://workspace.example.com"
"#,
    );

    let config = ConfigLoader::load(&workspace).unwrap();
    assert_eq!(
        config.backend.base_url.as_deref(),
        Some("https://workspace.example.com")
    );
    assert_eq!(config.backend.timeout_secs, 10);
    assert!(config.validate().is_ok());
}

#[test]
fn environment_file_and_variables_take_precedence() {
    let dir = TempDir::new().unwrap();
    let _env = isolated_env(&dir);
    write(
        dir.path().join("config").join("config.toml"),
        "[navigation]\nactivity_limit = 5\n",
    );
    write(
        dir.path().join("config").join("staging.toml"),
        "[navigation]\nactivity_limit = 7\nmax_ancestor_depth = 12\n",
    );
    std::env::set_var("STOWAGE_ENV", "staging");
    let config = ConfigLoader::load(dir.path()).unwrap();
    assert_eq!(config.navigation.activity_limit, 7);
    assert_eq!(config.navigation.max_ancestor_depth, 12);

    std::env::set_var("STOWAGE_NAVIGATION__ACTIVITY_LIMIT", "9");
    std::env::set_var("STOWAGE_BACKEND__BASE_URL", "http://localhost:8080");
    let config = ConfigLoader::load(dir.path()).unwrap();
    assert_eq!(config.navigation.activity_limit, 9);
    assert_eq!(
        config.backend.base_url.as_deref(),
        Some("http://localhost:8080")
    );
}

#[test]
fn fixture_backend_from_explicit_file() {
    let dir = TempDir::new().unwrap();
    let _env = isolated_env(&dir);
    let file = dir.path().join("stowage.toml");
    write(
        file.clone(),
        r#"
[backend]
kind = "fixture"
fixture_path = "forest.json"

[logging]
level = "debug"
format = "json"
"#,
    );
    let config = ConfigLoader::load_from_file(&file).unwrap();
    assert_eq!(config.backend.kind, BackendKind::Fixture);
    assert_eq!(config.backend.fixture_path, Some(PathBuf::from("forest.json")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert!(config.validate().is_ok());

    assert!(ConfigLoader::load_from_file(&dir.path().join("missing.toml")).is_err());
}
