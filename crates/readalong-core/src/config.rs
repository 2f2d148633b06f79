use crate::settings::{self, NavigatorSettings};
use crate::source::{DataSource, DEFAULT_DATA_SOURCE};
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User configuration. Every field is optional; missing ones fall back to
/// the defaults in [`crate::settings`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resync_tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lookahead: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_scroll_margin: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_tolerance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jump_offset: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advance_delay_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter_scan_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smooth_scroll_ms: Option<u64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Update only the stored speed, keeping whatever else the file holds.
    pub fn save_speed(config_path: &Path, speed: f64) -> Result<()> {
        let mut config = Self::load_from(config_path).unwrap_or_else(|_| Self::new());
        config.speed = Some(settings::clamp_speed(speed));
        config.save_to(config_path)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("readalong").join("config.json"))
    }

    pub fn data_source(&self) -> DataSource {
        DataSource::parse(self.data_source.as_deref().unwrap_or(DEFAULT_DATA_SOURCE))
    }

    pub fn speed(&self) -> f64 {
        settings::clamp_speed(self.speed.unwrap_or(settings::DEFAULT_SPEED))
    }

    /// Resolve to concrete settings. Non-positive lengths are ignored.
    pub fn navigator_settings(&self) -> NavigatorSettings {
        let defaults = NavigatorSettings::default();
        let positive = |value: Option<f64>, fallback: f64| {
            value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(fallback)
        };
        let non_negative = |value: Option<f64>, fallback: f64| {
            value.filter(|v| v.is_finite() && *v >= 0.0).unwrap_or(fallback)
        };
        let millis = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_millis).unwrap_or(fallback)
        };

        NavigatorSettings {
            line_height: positive(self.line_height, defaults.line_height),
            base_rate: positive(self.base_rate, defaults.base_rate),
            resync_tolerance: non_negative(self.resync_tolerance, defaults.resync_tolerance),
            lookahead: non_negative(self.lookahead, defaults.lookahead),
            manual_scroll_margin: non_negative(self.manual_scroll_margin, defaults.manual_scroll_margin),
            end_tolerance: non_negative(self.end_tolerance, defaults.end_tolerance),
            jump_offset: non_negative(self.jump_offset, defaults.jump_offset),
            advance_delay: millis(self.advance_delay_ms, defaults.advance_delay),
            chapter_scan_interval: millis(self.chapter_scan_interval_ms, defaults.chapter_scan_interval),
            smooth_scroll: millis(self.smooth_scroll_ms, defaults.smooth_scroll),
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.navigator_settings(), NavigatorSettings::default());
        assert_eq!(config.data_source(), DataSource::default());
        assert_eq!(config.speed(), settings::DEFAULT_SPEED);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readalong").join("config.json");
        let config = Config {
            data_source: Some("https://example.com/bible.json".to_string()),
            speed: Some(1.5),
            lookahead: Some(48.0),
            advance_delay_ms: Some(500),
            ..Config::new()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        let settings = loaded.navigator_settings();
        assert_eq!(settings.lookahead, 48.0);
        assert_eq!(settings.advance_delay, Duration::from_millis(500));
        assert_eq!(settings.jump_offset, settings::DEFAULT_JUMP_OFFSET);
    }

    #[test]
    fn test_partial_file_and_bad_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"line_height": -3, "speed": 42}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.navigator_settings().line_height, settings::DEFAULT_LINE_HEIGHT);
        assert_eq!(config.speed(), settings::MAX_SPEED);
    }

    #[test]
    fn test_save_speed_keeps_other_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"data_source": "/srv/bible.json", "speed": 1.0}"#).unwrap();

        Config::save_speed(&path, 2.34).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.speed, Some(2.34));
        assert_eq!(config.data_source.as_deref(), Some("/srv/bible.json"));
    }
}
