//! Engine configuration.
//!
//! Loop timing, mixer sizing, the preferences location and the demo scene
//! settings. Loaded from and saved to a TOML file.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use cadence_audio::mixer::{MixerConfig, DEFAULT_HEAR_RANGE, DEFAULT_MAX_VOICES};
use cadence_audio::preferences::TomlStore;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::demo::DemoConfig;

/// Configuration file name.
const CONFIG_FILE: &str = "cadence.toml";

/// Engine configuration parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // === Loop Settings ===
    /// Target frames per second
    pub target_fps: u32,
    /// Seconds between scene ticks (<= 0 disables ticking)
    pub tick_rate: f32,
    /// How long the headless loop runs, in seconds
    pub run_seconds: f32,

    // === Audio Settings ===
    /// Distance at which positional sounds fall silent
    pub hear_range: f32,
    /// Maximum simultaneous sound voices
    pub max_voices: usize,
    /// Volume preferences file (None = platform default)
    pub preferences_path: Option<PathBuf>,

    // === Demo Settings ===
    /// Demo scene assets and motion
    pub demo: DemoConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            // Loop
            target_fps: 60,
            tick_rate: 1.0 / 5.0,
            run_seconds: 10.0,

            // Audio
            hear_range: DEFAULT_HEAR_RANGE,
            max_voices: DEFAULT_MAX_VOICES,
            preferences_path: None,

            // Demo
            demo: DemoConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default file location.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from a specific path.
    /// Returns default config if file doesn't exist or is invalid.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            info!("Config file not found, using defaults");
            return Self::default();
        }

        match fs::File::open(path) {
            Ok(mut file) => {
                let mut contents = String::new();
                if let Err(e) = file.read_to_string(&mut contents) {
                    warn!("Failed to read config file: {e}");
                    return Self::default();
                }

                match toml::from_str(&contents) {
                    Ok(config) => {
                        info!("Loaded config from {}", path.display());
                        config
                    },
                    Err(e) => {
                        warn!("Failed to parse config file: {e}");
                        Self::default()
                    },
                }
            },
            Err(e) => {
                warn!("Failed to open config file: {e}");
                Self::default()
            },
        }
    }

    /// Save configuration to a specific path.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut file = fs::File::create(path)?;
        file.write_all(contents.as_bytes())?;

        info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Default configuration file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            return PathBuf::from(config_dir).join("cadence").join(CONFIG_FILE);
        }

        if let Some(home) = dirs::home_dir() {
            return home.join(".config").join("cadence").join(CONFIG_FILE);
        }

        PathBuf::from(CONFIG_FILE)
    }

    /// Volume preferences file to use.
    #[must_use]
    pub fn preferences_path(&self) -> PathBuf {
        self.preferences_path
            .clone()
            .unwrap_or_else(TomlStore::default_path)
    }

    /// Mixer settings derived from this config.
    #[must_use]
    pub fn mixer_config(&self) -> MixerConfig {
        MixerConfig::default()
            .with_hear_range(self.hear_range)
            .with_max_voices(self.max_voices)
    }

    /// Seconds per rendered frame.
    #[must_use]
    pub fn frame_budget_secs(&self) -> f32 {
        1.0 / self.target_fps.max(1) as f32
    }
}
