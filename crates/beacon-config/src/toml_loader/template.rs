//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Beacon Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[identity]
handle = "guest"         # a-z, 0-9 and _ only, at most 20 characters
# display_name = ""      # defaults to the handle

[call]
# stun_servers = ["stun:stun.l.google.com:19302"]   # no TURN support
# event_capacity = 256   # 1-65536

[call.media]
# audio = true
# video = true

[bus]
# namespace = "beacon-room"
# capacity = 256         # 1-65536

[chat]
# max_messages_per_room = 500   # 1-10000

[alerts]
# enabled = true
# volume = 0.25          # 0.0-1.0
# desktop_notifications = true

[logging]
# level = "INFO"         # TRACE, DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}
