use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("identity error: {0}")]
    Identity(String),

    #[error("call error: {0}")]
    Call(String),

    #[error("media error: {0}")]
    Media(String),

    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert_eq!(err.to_string(), "config file not found: /tmp/missing.toml");

        let err = ConfigError::ParseError("unexpected token".into());
        assert_eq!(err.to_string(), "config parse error: unexpected token");

        let err = ConfigError::ValidationError("identity.handle is empty".into());
        assert_eq!(
            err.to_string(),
            "config validation error: identity.handle is empty"
        );
    }

    #[test]
    fn beacon_error_from_config() {
        let config_err = ConfigError::ParseError("bad toml".into());
        let err: BeaconError = config_err.into();
        assert!(matches!(err, BeaconError::Config(_)));
        assert!(err.to_string().contains("bad toml"));
    }

    #[test]
    fn beacon_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: BeaconError = io_err.into();
        assert!(matches!(err, BeaconError::Io(_)));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn beacon_error_other_variants() {
        let err = BeaconError::Identity("empty handle".into());
        assert_eq!(err.to_string(), "identity error: empty handle");

        let err = BeaconError::Call("cannot join while active".into());
        assert_eq!(err.to_string(), "call error: cannot join while active");

        let err = BeaconError::Media("camera denied".into());
        assert_eq!(err.to_string(), "media error: camera denied");

        let err = BeaconError::Other("something went wrong".into());
        assert_eq!(err.to_string(), "something went wrong");
    }
}
