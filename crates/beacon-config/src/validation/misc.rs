//! Per-section validators: identity, call, bus, chat, and alerts.

use crate::schema::BeaconConfig;

use std::fmt::Display;
use std::ops::RangeInclusive;

/// Record `name` as out of range unless `value` lies in `range`.
fn check_range<T>(errors: &mut Vec<String>, name: &str, value: T, range: RangeInclusive<T>)
where
    T: PartialOrd + Display,
{
    if !range.contains(&value) {
        errors.push(format!(
            "{name} must be between {} and {}, got {value}",
            range.start(),
            range.end()
        ));
    }
}

/// Longest handle accepted in a room.
pub(crate) const MAX_HANDLE_LEN: usize = 20;

/// Validate that the handle is non-empty and already normalised.
pub(crate) fn validate_identity(errors: &mut Vec<String>, config: &BeaconConfig) {
    let handle = &config.identity.handle;
    if handle.is_empty() {
        errors.push("identity.handle must not be empty".into());
        return;
    }
    if handle.len() > MAX_HANDLE_LEN {
        errors.push(format!(
            "identity.handle '{handle}' is longer than {MAX_HANDLE_LEN} characters"
        ));
    }
    if !handle
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        errors.push(format!(
            "identity.handle '{handle}' may only contain a-z, 0-9 and _"
        ));
    }
}

/// Validate STUN URLs and the event buffer.
pub(crate) fn validate_call(errors: &mut Vec<String>, config: &BeaconConfig) {
    for url in &config.call.stun_servers {
        if !(url.starts_with("stun:") || url.starts_with("stuns:")) {
            errors.push(format!(
                "call.stun_servers entry '{url}' must start with stun: or stuns:"
            ));
        }
    }
    check_range(errors, "call.event_capacity", config.call.event_capacity, 1..=65536);
}

/// Validate bus namespace and capacity.
pub(crate) fn validate_bus(errors: &mut Vec<String>, config: &BeaconConfig) {
    if config.bus.namespace.trim().is_empty() {
        errors.push("bus.namespace must not be empty".into());
    }
    check_range(errors, "bus.capacity", config.bus.capacity, 1..=65536);
}

/// Validate chat history bounds.
pub(crate) fn validate_chat(errors: &mut Vec<String>, config: &BeaconConfig) {
    check_range(
        errors,
        "chat.max_messages_per_room",
        config.chat.max_messages_per_room,
        1..=10000,
    );
}

/// Validate alert tone volume.
pub(crate) fn validate_alerts(errors: &mut Vec<String>, config: &BeaconConfig) {
    check_range(errors, "alerts.volume", config.alerts.volume, 0.0..=1.0);
}
