//! Tests for the full validation pipeline.

use super::*;

#[test]
fn default_config_validates() {
    let config = BeaconConfig::default();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_empty_handle() {
    let mut config = BeaconConfig::default();
    config.identity.handle = String::new();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("identity.handle"));
}

#[test]
fn catches_unnormalised_handle() {
    let mut config = BeaconConfig::default();
    config.identity.handle = "Amy Smith".into();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("a-z, 0-9 and _"));
}

#[test]
fn catches_long_handle() {
    let mut config = BeaconConfig::default();
    config.identity.handle = "a".repeat(21);
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("longer than 20"));
}

#[test]
fn catches_turn_url_in_stun_list() {
    let mut config = BeaconConfig::default();
    config.call.stun_servers = vec!["turn:relay.example.org".into()];
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("call.stun_servers"));
}

#[test]
fn empty_stun_list_is_allowed() {
    let mut config = BeaconConfig::default();
    config.call.stun_servers.clear();
    assert!(validate(&config).is_ok());
}

#[test]
fn catches_zero_bus_capacity() {
    let mut config = BeaconConfig::default();
    config.bus.capacity = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("bus.capacity must be between 1 and 65536, got 0"));
}

#[test]
fn catches_volume_out_of_range() {
    let mut config = BeaconConfig::default();
    config.alerts.volume = 1.5;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("alerts.volume must be between 0 and 1, got 1.5"));

    config.alerts.volume = 1.0;
    assert!(validate(&config).is_ok());
}

#[test]
fn collects_multiple_errors() {
    let mut config = BeaconConfig::default();
    config.bus.namespace = " ".into();
    config.chat.max_messages_per_room = 0;
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("bus.namespace"));
    assert!(err.contains("chat.max_messages_per_room"));
}
