use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Service configuration, loaded from a JSON file next to the binary.
/// A default file is written on first run so every knob is discoverable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub realtime: RealtimeConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
    #[serde(default)]
    pub webserver: WebserverConfig,
}

/// Message store settings. The SQLite file is owned and written by the
/// external gateway logger; this service only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Realtime push path settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Seconds between watermark polls for new uplink records.
    pub poll_interval_secs: u64,
    /// Seconds between active-session status log lines.
    pub status_interval_secs: u64,
}

/// Statistics engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    /// Trailing window length for recency counts and the hourly histogram.
    pub window_hours: i64,
    /// Reference zone as a fixed UTC offset. Every timestamp comparison in
    /// the service happens in this one zone.
    pub utc_offset_hours: i32,
    /// Restrict per-device counts to the trailing window instead of the
    /// full table.
    pub device_counts_windowed: bool,
}

/// Webserver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebserverConfig {
    pub host: String,
    pub port: u16,
    /// Per-session outbound queue capacity. A session that falls this many
    /// frames behind is treated as failed and dropped.
    pub ws_buffer_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "data/lora_messages.db".to_string(),
        }
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            status_interval_secs: 60,
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            utc_offset_hours: 0,
            device_counts_windowed: false,
        }
    }
}

impl Default for WebserverConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ws_buffer_size: 64,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            realtime: RealtimeConfig::default(),
            statistics: StatisticsConfig::default(),
            webserver: WebserverConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            let default_config = Self::default();
            default_config.save(path)?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;

        config.validate()?;

        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path))?;

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.realtime.poll_interval_secs == 0 {
            anyhow::bail!("realtime.poll_interval_secs must be at least 1");
        }
        if self.realtime.status_interval_secs == 0 {
            anyhow::bail!("realtime.status_interval_secs must be at least 1");
        }
        if !(1..=168).contains(&self.statistics.window_hours) {
            anyhow::bail!("statistics.window_hours must be between 1 and 168");
        }
        if !(-23..=23).contains(&self.statistics.utc_offset_hours) {
            anyhow::bail!("statistics.utc_offset_hours must be between -23 and 23");
        }
        if self.webserver.ws_buffer_size == 0 {
            anyhow::bail!("webserver.ws_buffer_size must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.realtime.poll_interval_secs, 5);
        assert_eq!(config.statistics.window_hours, 24);
        assert_eq!(config.statistics.utc_offset_hours, 0);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"webserver": {"host": "0.0.0.0", "port": 9000, "ws_buffer_size": 16}}"#)
                .unwrap();
        assert_eq!(config.webserver.host, "0.0.0.0");
        assert_eq!(config.webserver.port, 9000);
        assert_eq!(config.realtime.poll_interval_secs, 5);
        assert_eq!(config.database.path, "data/lora_messages.db");
    }

    #[test]
    fn load_writes_defaults_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let path_str = path.to_string_lossy().to_string();

        let config = Config::load(&path_str).unwrap();
        assert!(path.exists());
        assert_eq!(config.statistics.window_hours, 24);

        // Second load parses the file that was just written.
        let reloaded = Config::load(&path_str).unwrap();
        assert_eq!(reloaded.webserver.port, config.webserver.port);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut config = Config::default();
        config.statistics.window_hours = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.statistics.utc_offset_hours = 30;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.realtime.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }
}
