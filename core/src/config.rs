//! Configuration management (`config.toml`)
//!
//! Handles loading, saving, and providing defaults for the recorder settings.
//! Settings are stored in TOML format in the platform-specific config directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ChannelError;
use crate::log_store::validate_name;
use crate::snapshot::ChannelShape;

/// Recorder configuration.
///
/// Every section has defaults, so a partial file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Control-loop timing
    #[serde(default)]
    pub timing: TimingConfig,
    /// Where recordings are stored
    #[serde(default)]
    pub storage: StorageConfig,
    /// Channels in registration (and advance) order
    #[serde(default = "default_channels")]
    pub channels: Vec<ChannelConfig>,
}

/// Control-loop timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Control-loop rate in Hz (default: 50, a 20ms period)
    #[serde(default = "default_tick_rate")]
    pub tick_rate: u32,
    /// Per-tick time above which a warning is logged, in microseconds (default: 2000)
    #[serde(default = "default_cpu_budget_us")]
    pub cpu_budget_us: u64,
}

/// Recording storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding recordings (default: `<data dir>/recordings`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    /// File extension of recordings (default: "jrl")
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Sync recordings to disk when they are closed (default: true)
    #[serde(default = "default_true")]
    pub sync_on_close: bool,
}

/// One logical joystick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Channel name, also the suffix of its log names
    pub name: String,
    /// Number of axes (default: 6)
    #[serde(default = "default_axes")]
    pub axes: u8,
    /// Number of buttons (default: 12)
    #[serde(default = "default_buttons")]
    pub buttons: u8,
    /// Gamepad input slot feeding this channel
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamepad: Option<usize>,
}

fn default_tick_rate() -> u32 {
    50
}
fn default_cpu_budget_us() -> u64 {
    2000
}
fn default_extension() -> String {
    "jrl".to_string()
}
fn default_true() -> bool {
    true
}
fn default_axes() -> u8 {
    6
}
fn default_buttons() -> u8 {
    12
}

fn default_channels() -> Vec<ChannelConfig> {
    ["drive", "util"]
        .into_iter()
        .enumerate()
        .map(|(slot, name)| ChannelConfig {
            name: name.to_string(),
            axes: default_axes(),
            buttons: default_buttons(),
            gamepad: Some(slot),
        })
        .collect()
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            timing: TimingConfig::default(),
            storage: StorageConfig::default(),
            channels: default_channels(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_rate: default_tick_rate(),
            cpu_budget_us: default_cpu_budget_us(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            extension: default_extension(),
            sync_on_close: default_true(),
        }
    }
}

impl TimingConfig {
    /// Fixed control-loop period
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate.max(1) as f64)
    }

    pub fn cpu_budget(&self) -> Duration {
        Duration::from_micros(self.cpu_budget_us)
    }

    /// Convert a real-time duration to a tick count, rounded to the nearest tick.
    ///
    /// Durations shorter than half a period round to zero ticks and are rejected.
    pub fn ticks_for(&self, duration: Duration) -> Result<u64, ChannelError> {
        let rate = self.tick_rate.max(1) as u128;
        // ticks = duration * rate, rounded half up, in integer nanoseconds
        let ticks = (duration.as_nanos() * rate * 2 + 1_000_000_000) / 2_000_000_000;
        match u64::try_from(ticks) {
            Ok(0) => Err(ChannelError::InvalidDuration { ticks: 0 }),
            Ok(ticks) => Ok(ticks),
            Err(_) => Err(ChannelError::InvalidDuration { ticks: u64::MAX }),
        }
    }
}

impl StorageConfig {
    /// Base directory with the platform default applied
    pub fn resolved_base_dir(&self) -> PathBuf {
        self.base_dir
            .clone()
            .or_else(|| data_dir().map(|dir| dir.join("recordings")))
            .unwrap_or_else(|| PathBuf::from("recordings"))
    }
}

impl ChannelConfig {
    pub fn shape(&self) -> ChannelShape {
        ChannelShape::new(self.axes, self.buttons)
    }
}

impl ReplayConfig {
    /// Check the configuration for problems.
    ///
    /// Returns a list of messages; an empty list means the configuration is usable.
    pub fn validate(&self) -> Vec<String> {
        use std::collections::HashSet;
        let mut problems = Vec::new();

        if self.timing.tick_rate == 0 {
            problems.push("timing.tick_rate must be greater than 0".to_string());
        }
        if self.storage.extension.is_empty() || self.storage.extension.contains(['.', '/', '\\'])
        {
            problems.push(format!(
                "storage.extension '{}' is not a plain file extension",
                self.storage.extension
            ));
        }
        if self.channels.is_empty() {
            problems.push("at least one channel must be configured".to_string());
        }

        let mut names = HashSet::new();
        let mut slots = HashSet::new();
        for channel in &self.channels {
            if channel.name.is_empty() {
                problems.push("channel name must not be empty".to_string());
            } else if validate_name(&channel.name).is_err() {
                problems.push(format!(
                    "channel name '{}' cannot be used in a log name",
                    channel.name
                ));
            } else if !names.insert(channel.name.as_str()) {
                problems.push(format!("channel '{}' is configured twice", channel.name));
            }
            if channel.shape().record_size() == 0 {
                problems.push(format!(
                    "channel '{}' has no axes and no buttons",
                    channel.name
                ));
            }
            if let Some(slot) = channel.gamepad
                && !slots.insert(slot)
            {
                problems.push(format!(
                    "channel '{}' shares gamepad slot {} with another channel",
                    channel.name, slot
                ));
            }
        }

        problems
    }
}

/// Error loading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("io", "joyreplay", "joyreplay")
}

/// Returns the platform-specific configuration directory.
///
/// Returns `None` if the home directory cannot be determined.
pub fn config_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().to_path_buf())
}

/// Returns the platform-specific data directory where recordings live by default.
pub fn data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Default location of `config.toml`
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Loads the configuration from the platform config directory.
///
/// Returns default values if the file doesn't exist or cannot be parsed.
pub fn load() -> ReplayConfig {
    match config_path() {
        Some(path) if path.exists() => load_from(&path).unwrap_or_else(|e| {
            tracing::warn!("{}; using default configuration", e);
            ReplayConfig::default()
        }),
        _ => ReplayConfig::default(),
    }
}

/// Loads the configuration from an explicit path.
pub fn load_from(path: &Path) -> Result<ReplayConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Saves the configuration to the platform config directory.
///
/// Creates the directory if it doesn't exist.
pub fn save(config: &ReplayConfig) -> std::io::Result<()> {
    match config_path() {
        Some(path) => save_to(config, &path),
        None => Ok(()),
    }
}

/// Saves the configuration to an explicit path.
pub fn save_to(config: &ReplayConfig, path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    // =============================================================
    // Default value tests
    // =============================================================

    #[test]
    fn test_config_default() {
        let config = ReplayConfig::default();
        assert_eq!(config.timing.tick_rate, 50);
        assert_eq!(config.timing.tick_period(), Duration::from_millis(20));
        assert_eq!(config.storage.extension, "jrl");
        assert!(config.storage.sync_on_close);
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[0].name, "drive");
        assert_eq!(config.channels[1].name, "util");
        assert_eq!(config.channels[1].shape(), ChannelShape::new(6, 12));
        assert!(config.validate().is_empty());
    }

    // =============================================================
    // TOML serialization tests
    // =============================================================

    #[test]
    fn test_config_deserialize_empty() {
        let config: ReplayConfig = toml::from_str("").unwrap();
        assert_eq!(config, ReplayConfig::default());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let toml_str = r#"
[timing]
tick_rate = 100

[[channels]]
name = "pilot"
axes = 2
buttons = 1
"#;
        let config: ReplayConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.timing.tick_rate, 100);
        assert_eq!(config.timing.cpu_budget_us, 2000); // default
        assert_eq!(config.channels.len(), 1);
        assert_eq!(config.channels[0].shape(), ChannelShape::new(2, 1));
        assert_eq!(config.channels[0].gamepad, None);
    }

    #[test]
    fn test_config_serialize_roundtrip() {
        let mut config = ReplayConfig::default();
        config.storage.base_dir = Some(PathBuf::from("/home/lvuser/joystickRecordings"));
        config.storage.sync_on_close = false;

        let toml_str = toml::to_string(&config).unwrap();
        let parsed: ReplayConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_save_and_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ReplayConfig::default();
        config.timing.tick_rate = 200;
        save_to(&config, &path).unwrap();

        assert_eq!(load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_from_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timing = 5").unwrap();
        assert!(matches!(load_from(&path), Err(ConfigError::Parse { .. })));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(load_from(&missing), Err(ConfigError::Io { .. })));
    }

    // =============================================================
    // Timing tests
    // =============================================================

    #[test]
    fn test_ticks_for_duration() {
        let timing = TimingConfig::default();
        assert_eq!(timing.ticks_for(Duration::from_secs(15)).unwrap(), 750);
        assert_eq!(timing.ticks_for(Duration::from_millis(100)).unwrap(), 5);
        // Rounded to the nearest tick
        assert_eq!(timing.ticks_for(Duration::from_millis(29)).unwrap(), 1);
        assert_eq!(timing.ticks_for(Duration::from_millis(30)).unwrap(), 2);
    }

    #[test]
    fn test_ticks_for_too_short() {
        let timing = TimingConfig::default();
        assert!(matches!(
            timing.ticks_for(Duration::from_millis(9)),
            Err(ChannelError::InvalidDuration { ticks: 0 })
        ));
        assert!(timing.ticks_for(Duration::ZERO).is_err());
    }

    // =============================================================
    // Validation tests
    // =============================================================

    #[test]
    fn test_validate_reports_problems() {
        let mut config = ReplayConfig::default();
        config.timing.tick_rate = 0;
        config.channels[1].name = "drive".to_string();
        config.channels[1].gamepad = Some(0);
        config.storage.extension = "a.b".to_string();

        let problems = config.validate();
        assert_eq!(problems.len(), 4);
        assert!(problems.iter().any(|p| p.contains("configured twice")));
        assert!(problems.iter().any(|p| p.contains("gamepad slot 0")));
    }

    #[test]
    fn test_validate_channel_names_and_shapes() {
        let mut config = ReplayConfig::default();
        config.channels[0].name = "a/b".to_string();
        config.channels[1].axes = 0;
        config.channels[1].buttons = 0;

        let problems = config.validate();
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("'a/b' cannot be used in a log name"));
        assert!(problems[1].contains("'util' has no axes and no buttons"));
    }
}
