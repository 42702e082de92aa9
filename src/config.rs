use crate::gesture::GestureTimings;
use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub gesture: GestureConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub tones: TonesConfig,
    #[serde(default)]
    pub log: LogConfig,
}

// ============================================================================
// Gesture Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct GestureConfig {
    /// Press duration that starts listening (ms)
    #[serde(default = "default_hold_ms")]
    pub hold_ms: u64,
    /// Maximum gap between two presses of a double-tap (ms)
    #[serde(default = "default_double_tap_ms")]
    pub double_tap_ms: u64,
    /// How long a touch hides the mouse press synthesized for it (ms)
    #[serde(default = "default_touch_suppress_ms")]
    pub touch_suppress_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            hold_ms: default_hold_ms(),
            double_tap_ms: default_double_tap_ms(),
            touch_suppress_ms: default_touch_suppress_ms(),
        }
    }
}

impl GestureConfig {
    pub fn timings(&self) -> GestureTimings {
        GestureTimings {
            hold: Duration::from_millis(self.hold_ms),
            double_tap: Duration::from_millis(self.double_tap_ms),
            touch_suppress: Duration::from_millis(self.touch_suppress_ms),
        }
    }
}

fn default_hold_ms() -> u64 {
    800
}

fn default_double_tap_ms() -> u64 {
    300
}

fn default_touch_suppress_ms() -> u64 {
    600
}

// ============================================================================
// Recognition Config
// ============================================================================

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionEngine {
    /// Typed text stands in for speech (default)
    #[default]
    Keyboard,
    /// No recognition available, activations report unsupported
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Deserialize)]
pub struct RecognitionConfig {
    #[serde(default)]
    pub engine: RecognitionEngine,
    /// Recognition language tag
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Report microphone permission as refused on every start
    #[serde(default)]
    pub deny_microphone: bool,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            engine: RecognitionEngine::default(),
            lang: default_lang(),
            deny_microphone: false,
        }
    }
}

fn default_lang() -> String {
    "en-US".into()
}

// ============================================================================
// Speech / Tones / Log Config
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// TTS program, e.g. "espeak" or "say". Empty disables spoken output.
    #[serde(default)]
    pub command: String,
    /// Extra arguments placed before the text
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: String::new(),
            args: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TonesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Peak amplitude (0.0-1.0)
    #[serde(default = "default_tone_volume")]
    pub volume: f32,
}

impl Default for TonesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: default_tone_volume(),
        }
    }
}

fn default_tone_volume() -> f32 {
    0.1
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    /// Log file for the interactive terminal mode
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

fn default_log_file() -> PathBuf {
    "voicenav.log".into()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load from `path`, falling back to defaults when the file does not exist
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        let timings = config.gesture.timings();
        assert_eq!(timings.hold, Duration::from_millis(800));
        assert_eq!(timings.double_tap, Duration::from_millis(300));
        assert_eq!(timings.touch_suppress, Duration::from_millis(600));
        assert_eq!(config.recognition.engine, RecognitionEngine::Keyboard);
        assert_eq!(config.recognition.lang, "en-US");
        assert!(config.speech.enabled);
        assert!(config.speech.command.is_empty());
        assert!(config.tones.enabled);
    }

    #[test]
    fn test_partial_file() {
        let config = Config::parse(
            r#"
            [gesture]
            hold_ms = 1000

            [recognition]
            engine = "none"

            [speech]
            command = "espeak"
            args = ["-s", "170"]
            "#,
        )
        .unwrap();
        assert_eq!(config.gesture.hold_ms, 1000);
        assert_eq!(config.gesture.double_tap_ms, 300);
        assert_eq!(config.recognition.engine, RecognitionEngine::Disabled);
        assert_eq!(config.speech.command, "espeak");
        assert_eq!(config.speech.args, vec!["-s", "170"]);
        assert_eq!(config.log.file, PathBuf::from("voicenav.log"));
    }

    #[test]
    fn test_empty_file() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.gesture.hold_ms, 800);
    }

    #[test]
    fn test_invalid_file() {
        assert!(Config::parse("[gesture]\nhold_ms = \"long\"").is_err());
        assert!(Config::parse("[recognition]\nengine = \"whisper\"").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load(Path::new("does/not/exist/voicenav.toml")).unwrap();
        assert_eq!(config.tones.volume, 0.1);
    }
}
