//! Volume preference persistence.
//!
//! The mixer saves its three sliders through the [`VolumeStore`] key-value
//! interface. [`TomlStore`] keeps them in a TOML file, by default at
//! `~/.config/cadence/preferences.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use cadence_common::PreferencesResult;
use tracing::{debug, info, warn};

/// Default preferences file name.
pub const PREFERENCES_FILE_NAME: &str = "preferences.toml";

/// Default preferences directory (relative to config).
pub const PREFERENCES_DIR_NAME: &str = "cadence";

/// Key of the master slider.
pub const MASTER_VOLUME_KEY: &str = "masterVolume";

/// Key of the sound-effect slider.
pub const SOUND_VOLUME_KEY: &str = "soundVolume";

/// Key of the music slider.
pub const MUSIC_VOLUME_KEY: &str = "musicVolume";

/// Durable float key-value storage.
pub trait VolumeStore {
    /// Stored value for `key`, or `default` if absent.
    fn get_float(&self, key: &str, default: f32) -> f32;

    /// Store `value` under `key`. Not durable until [`flush`](Self::flush).
    fn put_float(&mut self, key: &str, value: f32);

    /// Make stored values durable.
    fn flush(&mut self) -> PreferencesResult<()>;
}

/// In-memory store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: BTreeMap<String, f32>,
    flushes: usize,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flushes so far.
    #[must_use]
    pub const fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl VolumeStore for MemoryStore {
    fn get_float(&self, key: &str, default: f32) -> f32 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn put_float(&mut self, key: &str, value: f32) {
        self.values.insert(key.to_string(), value);
    }

    fn flush(&mut self) -> PreferencesResult<()> {
        self.flushes += 1;
        Ok(())
    }
}

/// Store backed by a flat TOML table.
#[derive(Debug, Clone)]
pub struct TomlStore {
    path: PathBuf,
    values: BTreeMap<String, f32>,
    dirty: bool,
}

impl TomlStore {
    /// Open the store at `path`. A missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> PreferencesResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            info!("Preferences file not found at {:?}, using defaults", path);
            return Ok(Self::empty(path));
        }

        let contents = fs::read_to_string(&path)?;
        let values: BTreeMap<String, f32> = toml::from_str(&contents)?;
        info!("Preferences loaded from {:?}", path);
        Ok(Self {
            path,
            values,
            dirty: false,
        })
    }

    /// Open the store at `path`, starting empty if the file is unreadable.
    #[must_use]
    pub fn open_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::open(path).unwrap_or_else(|e| {
            warn!("Failed to read preferences from {:?}: {}, using defaults", path, e);
            Self::empty(path.to_path_buf())
        })
    }

    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            values: BTreeMap::new(),
            dirty: false,
        }
    }

    /// Returns the default preferences path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        // Try XDG config first, then fall back to home
        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir)
                .join(PREFERENCES_DIR_NAME)
                .join(PREFERENCES_FILE_NAME);
        }

        if let Some(home) = dirs::home_dir() {
            return home
                .join(".config")
                .join(PREFERENCES_DIR_NAME)
                .join(PREFERENCES_FILE_NAME);
        }

        PathBuf::from(PREFERENCES_FILE_NAME)
    }

    /// File backing this store.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether there are unflushed changes.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl VolumeStore for TomlStore {
    fn get_float(&self, key: &str, default: f32) -> f32 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn put_float(&mut self, key: &str, value: f32) {
        let changed = self
            .values
            .insert(key.to_string(), value)
            .map_or(true, |old| old.to_bits() != value.to_bits());
        self.dirty |= changed;
    }

    fn flush(&mut self) -> PreferencesResult<()> {
        if !self.dirty && self.path.exists() {
            debug!("Preferences unchanged, skipping write");
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let contents = toml::to_string(&self.values)?;
        fs::write(&self.path, contents)?;
        self.dirty = false;

        info!("Preferences saved to {:?}", self.path);
        Ok(())
    }
}
