//! User preferences and settings management.
//!
//! Settings live in a JSON file resolved through the XDG Base Directory
//! conventions.

pub mod settings;

pub use settings::{SettingsError, SettingsManager, UserSettings, get_config_path};
