use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use crate::error::{CaptionerError, Result};

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "captioner.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scripts: ScriptsConfig,
    pub database: DatabaseConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptsConfig {
    /// Caption generator; called as `<cmd> input output --model M --start S --end E`
    pub transcribe: String,
    /// Caption burner; called as `<cmd> captions video audio output width height --start S --end E`
    pub burn_captions: String,
    /// Trimmer; called as `<cmd> input output start duration --fade-duration=N`
    pub trim_and_fade: String,
    /// Kill a stage that runs longer than this many seconds. Unset means wait forever.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite file holding clip progress
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Transcription model name passed to the caption generator
    pub model: String,
    /// Burned video width
    pub width: u32,
    /// Burned video height
    pub height: u32,
    /// Window start in seconds
    pub start_time: u32,
    /// Window end in seconds
    pub end_time: u32,
    /// Fade-out length in seconds
    pub fade_duration: u32,
    /// How long the edit prompt waits for an answer
    pub pause_timeout_secs: u64,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            transcribe: "./scripts/generate_captions.py".to_string(),
            burn_captions: "./scripts/burn_captions.py".to_string(),
            trim_and_fade: "./scripts/trim_and_fade.py".to_string(),
            timeout_secs: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".captioner").join("clips.db"),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            width: 1080,
            height: 1920,
            start_time: 0,
            end_time: 30,
            fade_duration: crate::pipeline::DEFAULT_FADE_DURATION,
            pause_timeout_secs: 60,
        }
    }
}

impl ScriptsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CaptionerError::Config(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&content)?)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CaptionerError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| CaptionerError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Load `path` if given, else `captioner.toml` from the working directory, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }
}
