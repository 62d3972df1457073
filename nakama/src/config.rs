//! Persistent application configuration.
//!
//! Stored as JSON in a platform-appropriate config directory. Fields missing
//! from an older file are filled in from the defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Screen rectangle around the event header: portrait on the left, the two
/// text lines on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Region {
    #[serde(alias = "x")]
    pub x_offset: i32,
    #[serde(alias = "y")]
    pub y_offset: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for Region {
    fn default() -> Self {
        Self {
            x_offset: 596,
            y_offset: 382,
            width: 355,
            height: 74,
        }
    }
}

impl Region {
    pub fn rect(&self) -> ie::Rect {
        ie::Rect::new(self.x_offset, self.y_offset, self.width, self.height)
    }
}

/// On-disk configuration for the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capture region, relative to the game window.
    pub region: Region,

    /// Delay between scans (seconds).
    #[serde(alias = "scan_speed")]
    pub scan_interval_s: f32,

    /// Whether the worker starts scanning right away.
    pub scanning_enabled: bool,

    /// Base similarity an OCR line needs to resolve to an event.
    pub text_match_confidence: f64,

    /// Minimum template correlation for a portrait hit.
    pub portrait_match_threshold: f32,

    /// Identical portrait hits in a row before the character is trusted.
    pub require_hits: u32,

    /// Portrait misses on the same event before a label is requested.
    pub require_misses: u32,

    /// Minimum time between two label requests (seconds).
    pub prompt_cooldown_s: f32,

    /// How long a label request waits for an answer (seconds).
    pub prompt_timeout_s: f32,

    /// Event titles containing one of these must match `ambiguous_cutoff`.
    pub ambiguous_phrases: Vec<String>,
    pub ambiguous_cutoff: f64,

    /// OCR input preparation.
    pub ocr: ie::PreprocessOptions,

    /// Write the last binarized OCR input to the cache directory.
    pub debug_mode: bool,

    pub events_dir: PathBuf,
    pub portraits_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            region: Region::default(),
            scan_interval_s: 0.5,
            scanning_enabled: false,
            text_match_confidence: 0.7,
            portrait_match_threshold: 0.70,
            require_hits: 2,
            require_misses: 2,
            prompt_cooldown_s: 15.0,
            prompt_timeout_s: 20.0,
            ambiguous_phrases: vec!["inspiration".to_string(), "summer camp".to_string()],
            ambiguous_cutoff: 0.95,
            ocr: ie::PreprocessOptions::default(),
            debug_mode: false,
            events_dir: PathBuf::from("events"),
            portraits_dir: PathBuf::from("assets/portraits"),
        }
    }
}

impl Config {
    /// Path to the config file.
    pub fn path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("config_dir() unavailable")?;
        Ok(base.join("umanakama.json"))
    }

    /// Where debug snapshots go.
    pub fn debug_dir() -> Option<PathBuf> {
        dirs::cache_dir().map(|p| p.join("UmaNakama"))
    }

    /// Load configuration from disk, falling back to defaults on any error.
    pub fn load_or_default() -> Self {
        match Self::try_load() {
            Ok(cfg) => cfg,
            Err(err) => {
                tracing::warn!(error = %format!("{err:#}"), "failed to load config; using defaults");
                Self::default()
            }
        }
    }

    /// Try to load configuration from disk.
    pub fn try_load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let json = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        let cfg = serde_json::from_str(&json).with_context(|| format!("parse {:?}", path))?;
        Ok(cfg)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("serialize config")?;
        fs::write(path, json).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    pub fn scan_interval(&self) -> Duration {
        seconds(self.scan_interval_s.clamp(MIN_SCAN_INTERVAL_S, MAX_SCAN_INTERVAL_S))
    }

    pub fn gate_settings(&self) -> crate::gate::GateSettings {
        crate::gate::GateSettings {
            require_hits: self.require_hits.max(1),
            require_misses: self.require_misses.max(1),
            cooldown: seconds(self.prompt_cooldown_s),
        }
    }

    pub fn prompt_timeout(&self) -> Duration {
        seconds(self.prompt_timeout_s)
    }

    pub fn matcher(&self) -> data::FuzzyEventMatcher {
        data::FuzzyEventMatcher::new(self.ambiguous_phrases.clone(), self.ambiguous_cutoff)
    }
}

const MIN_SCAN_INTERVAL_S: f32 = 0.05;
const MAX_SCAN_INTERVAL_S: f32 = 3600.0;

/// Negative and NaN values are zero; values too large for a `Duration` saturate.
fn seconds(value: f32) -> Duration {
    Duration::try_from_secs_f32(value.max(0.0)).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn partial_file_is_backfilled() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("umanakama.json");
        fs::write(&path, r#"{"region": {"x": 10, "y": 20, "width": 300, "height": 60}, "scan_speed": 1.5}"#).unwrap();

        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.region.rect(), ie::Rect::new(10, 20, 300, 60));
        assert_eq!(cfg.scan_interval_s, 1.5);
        assert_eq!(cfg.require_hits, 2);
        assert_eq!(cfg.ambiguous_phrases, vec!["inspiration".to_string(), "summer camp".to_string()]);
        assert_eq!(cfg.ocr.threshold, 50);
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("umanakama.json");
        let cfg = Config {
            debug_mode: true,
            text_match_confidence: 0.8,
            ..Default::default()
        };
        cfg.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("umanakama.json");
        fs::write(&path, "{").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn out_of_range_durations_do_not_panic() {
        let cfg: Config = serde_json::from_str(
            r#"{"prompt_cooldown_s": 1e30, "prompt_timeout_s": -3.0, "scan_interval_s": 1e30}"#,
        )
        .unwrap();
        assert_eq!(cfg.gate_settings().cooldown, Duration::MAX);
        assert_eq!(cfg.prompt_timeout(), Duration::ZERO);
        assert_eq!(cfg.scan_interval(), Duration::from_secs(3600));

        let tiny = Config {
            scan_interval_s: 0.0,
            prompt_cooldown_s: f32::NAN,
            ..Default::default()
        };
        assert_eq!(tiny.scan_interval(), Duration::from_secs_f32(0.05));
        assert_eq!(tiny.gate_settings().cooldown, Duration::ZERO);
    }
}
