//! Shared building blocks for the Beacon workspace: the umbrella error
//! type, id helpers, and the in-app notification queue.

pub mod errors;
pub mod id;
pub mod notifications;

pub use errors::{BeaconError, ConfigError};
pub use id::{prefixed_id, SessionId};
pub use notifications::{Notification, NotificationLevel, NotificationQueue};

pub type Result<T> = std::result::Result<T, BeaconError>;
