//! Run configuration.
//!
//! Every knob has a default, so an empty TOML file (or no file at all) is a
//! valid configuration. The CLI layers its flags on top of whatever was
//! loaded.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::retry::RetryPolicy;
use crate::{Error, Result};

/// What to do with slides that have no speaker notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotesPolicy {
    /// Leave the slide out of the video.
    #[default]
    Skip,
    /// Show the slide over a silent placeholder track.
    Silence,
}

impl NotesPolicy {
    /// Parse a policy name as given on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "skip" => Some(Self::Skip),
            "silence" => Some(Self::Silence),
            _ => None,
        }
    }
}

/// Which speech engine synthesizes the notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsEngineKind {
    /// Google Translate's speech endpoint (network).
    #[default]
    Google,
    /// Local espeak-ng process.
    Espeak,
}

impl TtsEngineKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "google" => Some(Self::Google),
            "espeak" | "espeak-ng" => Some(Self::Espeak),
            _ => None,
        }
    }
}

/// Retry settings for speech synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of synthesis attempts per slide.
    pub max_attempts: u32,
    /// Fixed wait between attempts, in milliseconds.
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1000,
            delay_ms: 5000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms))
    }
}

/// Names or paths of the external binaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: String,
    pub pdftoppm: String,
    pub espeak: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".to_string(),
            pdftoppm: "pdftoppm".to_string(),
            espeak: "espeak-ng".to_string(),
        }
    }
}

/// Speech engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    pub engine: TtsEngineKind,
    /// Base URL of the Google speech endpoint.
    pub endpoint: String,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            engine: TtsEngineKind::Google,
            endpoint: "https://translate.google.com/translate_tts".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Complete configuration for one narration run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Speech language code (e.g. `en`, `de`).
    pub language: String,
    /// Number of slides processed concurrently.
    pub workers: usize,
    pub notes_policy: NotesPolicy,
    /// Length of the placeholder track used by [`NotesPolicy::Silence`].
    pub silence_seconds: f64,
    /// Resolution used when rasterizing PDF pages.
    pub raster_dpi: u32,
    pub retry: RetryConfig,
    pub tools: ToolsConfig,
    pub tts: TtsConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            workers: 1,
            notes_policy: NotesPolicy::Skip,
            silence_seconds: 2.0,
            raster_dpi: 200,
            retry: RetryConfig::default(),
            tools: ToolsConfig::default(),
            tts: TtsConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_toml(&text)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if !(self.silence_seconds.is_finite() && self.silence_seconds > 0.0) {
            return Err(Error::Config("silence_seconds must be positive".into()));
        }
        if self.raster_dpi == 0 {
            return Err(Error::Config("raster_dpi must be positive".into()));
        }
        if self.language.trim().is_empty() {
            return Err(Error::Config("language must not be empty".into()));
        }
        Ok(())
    }

    /// Retry policy for speech synthesis.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.policy()
    }
}
