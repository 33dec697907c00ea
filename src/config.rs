// Metronome configuration - RON file with session defaults

use std::fs;
use std::path::{Path, PathBuf};

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

use crate::sequencer::{Tempo, TimeSignature};

const APP_DIR: &str = "practice-metronome";
const CONFIG_FILE: &str = "config.ron";

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("RON serialization error: {0}")]
    RonSerialize(#[from] ron::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetronomeConfig {
    /// Tempo used when there is no previous session
    pub default_bpm: u32,
    /// Lower bound of the tempo controls
    pub min_bpm: u32,
    /// Upper bound of the tempo controls
    pub max_bpm: u32,
    pub time_signature: TimeSignature,
    /// Click volume (0.0 to 1.0)
    pub volume: f32,
    /// Capacity of the tick event ring buffer
    pub event_capacity: usize,
    /// Capacity of the click command ring buffer
    pub click_capacity: usize,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            default_bpm: Tempo::DEFAULT_BPM,
            min_bpm: Tempo::MIN_BPM,
            max_bpm: Tempo::MAX_BPM,
            time_signature: TimeSignature::four_four(),
            volume: 0.5,
            event_capacity: 256,
            click_capacity: 64,
        }
    }
}

impl MetronomeConfig {
    /// `<config dir>/practice-metronome/config.ron`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config: Self = ron::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, or fall back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = ron::ser::to_string_pretty(self, PrettyConfig::default())?;
        fs::write(path, text)?;
        log::info!("Config saved: {:?}", path);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_bpm == 0 {
            return Err(ConfigError::Invalid("min_bpm must be > 0".to_string()));
        }
        if self.min_bpm > self.max_bpm {
            return Err(ConfigError::Invalid(format!(
                "min_bpm ({}) is above max_bpm ({})",
                self.min_bpm, self.max_bpm
            )));
        }
        if !(self.min_bpm..=self.max_bpm).contains(&self.default_bpm) {
            return Err(ConfigError::Invalid(format!(
                "default_bpm {} is outside {}..={}",
                self.default_bpm, self.min_bpm, self.max_bpm
            )));
        }
        self.time_signature
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(ConfigError::Invalid(format!(
                "volume {} is outside 0.0..=1.0",
                self.volume
            )));
        }
        if self.event_capacity == 0 || self.click_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel capacities must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Hold a requested tempo within the configured bounds
    pub fn clamp_tempo(&self, bpm: u32) -> Tempo {
        Tempo::clamped_to(bpm, self.min_bpm, self.max_bpm)
    }
}
