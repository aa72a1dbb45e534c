//! User preference management with XDG Base Directory compliance.
//!
//! Settings are stored as JSON under the XDG config directory and control
//! where the playlist and assets come from, how the session reacts to
//! skips and natural track ends, and the default log filter.

use std::{
    env::var,
    fs::{create_dir_all, read_to_string, write},
    io::Error as StdError,
    path::PathBuf,
};

use {
    parking_lot::{RwLock, RwLockReadGuard},
    serde::{Deserialize, Serialize},
    serde_json::{Error as SerdeJsonError, from_str, to_string_pretty},
    thiserror::Error,
    tracing::debug,
};

/// Error type for settings operations.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Failed to read or write settings file.
    #[error("IO error: {0}")]
    IoError(#[from] StdError),
    /// Failed to serialize or deserialize settings.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] SerdeJsonError),
    /// Invalid settings value.
    #[error("Invalid settings value: {reason}")]
    InvalidValue { reason: String },
}

/// Serializable user settings structure with default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    /// JSON playlist file; the built-in playlist is used when unset.
    pub playlist_path: Option<String>,
    /// Directory media references are resolved against; unchecked when unset.
    pub asset_directory: Option<String>,
    /// Whether selecting a track starts playback immediately.
    pub play_on_select: bool,
    /// Whether next/previous always start playback (otherwise the
    /// playing/paused intent is carried over).
    pub autoplay_on_skip: bool,
    /// Whether a natural track end advances to the next track.
    pub auto_advance: bool,
    /// Looping preference restored at startup.
    pub looping: bool,
    /// Interval between engine status updates in milliseconds.
    pub status_interval_ms: u64,
    /// Duration assumed for tracks without a duration hint.
    pub default_track_ms: u64,
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            playlist_path: None,
            asset_directory: None,
            play_on_select: true,
            autoplay_on_skip: true,
            auto_advance: true,
            looping: false,
            status_interval_ms: 250,
            default_track_ms: 180_000,
            log_filter: "info".to_string(),
        }
    }
}

impl UserSettings {
    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidValue` describing the first bad value.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.status_interval_ms == 0 {
            return Err(SettingsError::InvalidValue {
                reason: "status_interval_ms must be greater than zero".to_string(),
            });
        }
        if self.default_track_ms == 0 {
            return Err(SettingsError::InvalidValue {
                reason: "default_track_ms must be greater than zero".to_string(),
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(SettingsError::InvalidValue {
                reason: "log_filter must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Handles loading, saving, and validation of user preferences.
#[derive(Debug)]
pub struct SettingsManager {
    /// Thread-safe user settings storage.
    settings: RwLock<UserSettings>,
    /// Path to the configuration file on disk.
    config_path: PathBuf,
}

impl SettingsManager {
    /// Creates a new settings manager with default config path.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk.
    pub fn new() -> Result<Self, SettingsError> {
        Self::with_config_path(get_config_path())
    }

    /// Creates a new settings manager with a custom config path.
    ///
    /// # Arguments
    ///
    /// * `config_path` - Custom path for the settings file
    ///
    /// # Returns
    ///
    /// A `Result` containing the `SettingsManager` or a `SettingsError`.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if settings cannot be loaded from disk or
    /// hold invalid values.
    pub fn with_config_path(config_path: PathBuf) -> Result<Self, SettingsError> {
        if let Some(parent) = config_path.parent() {
            create_dir_all(parent)?;
        }

        let settings: UserSettings = if config_path.exists() {
            debug!("Loading settings from existing file: {:?}", config_path);
            let contents = read_to_string(&config_path)?;
            from_str(&contents)?
        } else {
            debug!("Using default settings, no file at {:?}", config_path);
            UserSettings::default()
        };
        settings.validate()?;

        Ok(SettingsManager {
            settings: RwLock::new(settings),
            config_path,
        })
    }

    /// Gets the current settings.
    pub fn get_settings(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.settings.read()
    }

    /// Gets the configuration file path.
    pub fn get_config_path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Validates, applies and saves new settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the settings are invalid or cannot be
    /// saved to disk. Invalid settings are not applied.
    pub fn update_settings(&self, new_settings: UserSettings) -> Result<(), SettingsError> {
        new_settings.validate()?;
        *self.settings.write() = new_settings;
        self.save_settings()
    }

    /// Records the looping preference and saves it.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the settings cannot be saved to disk.
    pub fn set_looping(&self, looping: bool) -> Result<(), SettingsError> {
        let mut updated = self.get_settings().clone();
        updated.looping = looping;
        self.update_settings(updated)
    }

    /// Saves the current settings to disk.
    fn save_settings(&self) -> Result<(), SettingsError> {
        debug!("Saving settings to file: {:?}", self.config_path);
        let contents = to_string_pretty(&*self.settings.read())?;
        write(&self.config_path, contents)?;
        Ok(())
    }
}

/// Path of the settings file under the XDG config directory.
#[must_use]
pub fn get_config_path() -> PathBuf {
    let mut config_dir = get_xdg_config_home();
    config_dir.push("songdeck");
    config_dir.push("settings.json");
    config_dir
}

/// Gets the XDG config home directory following the XDG Base Directory conventions.
///
/// Uses `XDG_CONFIG_HOME` environment variable if set, otherwise defaults to $HOME/.config
fn get_xdg_config_home() -> PathBuf {
    if let Ok(config_home) = var("XDG_CONFIG_HOME")
        && !config_home.is_empty()
    {
        return PathBuf::from(config_home);
    }

    if let Ok(home) = var("HOME") {
        let mut path = PathBuf::from(home);
        path.push(".config");
        return path;
    }

    PathBuf::from(".")
}
