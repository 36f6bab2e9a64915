pub mod config;
pub mod detect;
pub mod when;

pub use config::{AppConfig, ConfigError, LoadOptions};
pub use detect::{DetectorConfig, SessionDetector};
pub use when::{format_when, WhenParser};
