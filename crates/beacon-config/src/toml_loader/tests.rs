//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use std::path::Path;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_beacon_config.toml"));
    assert!(matches!(
        result,
        Err(beacon_common::ConfigError::FileNotFound(_))
    ));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r##"
[identity]
handle = "zed"
display_name = "Zed"

[call]
stun_servers = ["stun:stun.example.org:3478", "stuns:stun.example.org:5349"]
"##,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.identity.handle, "zed");
    assert_eq!(config.identity.display_name, "Zed");
    assert_eq!(config.call.stun_servers.len(), 2);
    // Defaults preserved
    assert!(config.call.media.video);
    assert_eq!(config.bus.namespace, "beacon-room");
    assert_eq!(config.chat.max_messages_per_room, 500);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(
        result,
        Err(beacon_common::ConfigError::ParseError(_))
    ));
}

#[test]
fn invalid_values_are_returned_with_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[bus]
capacity = 0
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.bus.capacity, 0);
}

#[test]
fn create_and_load_default_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("beacon").join("config.toml");

    create_default_config(&path).unwrap();
    assert!(path.exists());

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.identity.handle, "guest");
    assert_eq!(config.logging.level, crate::schema::LogLevel::Info);
}

#[test]
fn default_config_toml_is_valid() {
    use super::template::default_config_toml;
    use crate::schema::BeaconConfig;

    let config: BeaconConfig = toml::from_str(&default_config_toml()).unwrap();
    assert!(crate::validation::validate(&config).is_ok());
}

#[test]
fn config_path_prefers_the_environment() {
    use super::paths::resolve_config_path;
    use std::path::PathBuf;

    let platform = Some(PathBuf::from("/home/amy/.config"));
    let path = resolve_config_path(Some("/tmp/sim.toml".into()), platform.clone()).unwrap();
    assert_eq!(path, PathBuf::from("/tmp/sim.toml"));

    let path = resolve_config_path(Some("".into()), platform.clone()).unwrap();
    assert_eq!(path, PathBuf::from("/home/amy/.config/beacon/config.toml"));

    let path = resolve_config_path(None, platform).unwrap();
    assert!(path.ends_with("beacon/config.toml"));

    let err = resolve_config_path(None, None).unwrap_err().to_string();
    assert!(err.contains(CONFIG_PATH_ENV));
}

#[test]
fn existing_config_is_never_overwritten() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[identity]\nhandle = \"amy\"\n").unwrap();

    create_default_config(&path).unwrap();
    let config = load_from_path(&path).unwrap();
    assert_eq!(config.identity.handle, "amy");
}
