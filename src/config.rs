use eyre::{Context, Result};
use fairdraw::domain::FilterSentinels;
use fairdraw::draw::{DisplayTemplate, RepeatMode};
use fairdraw::storage::{HistoryStore, RetryPolicy};
use fairdraw::weight::{SettingsBundle, WeightSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub storage: StorageConfig,
    /// Flat key/value bundle, see `WeightSettings::from_bundles`
    pub fair_draw_settings: SettingsBundle,
    pub advanced_settings: SettingsBundle,
    pub draw: DrawConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub dir: PathBuf,
    pub retry: RetryPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("fairdraw"),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawConfig {
    /// 0 repeats freely, 1 never repeats until reset, n allows n picks per cycle
    pub repeat_threshold: u32,
    /// Lottery display template index (0-6)
    pub display_template: i64,
    pub sentinels: FilterSentinels,
}

impl Default for DrawConfig {
    fn default() -> Self {
        Self {
            repeat_threshold: 1,
            display_template: 0,
            sentinels: FilterSentinels::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            storage: StorageConfig::default(),
            fair_draw_settings: SettingsBundle::new(),
            advanced_settings: SettingsBundle::new(),
            draw: DrawConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    pub fn weight_settings(&self) -> WeightSettings {
        WeightSettings::from_bundles(&self.fair_draw_settings, &self.advanced_settings)
    }

    pub fn repeat_mode(&self, threshold: Option<u32>) -> RepeatMode {
        RepeatMode::from_threshold(threshold.unwrap_or(self.draw.repeat_threshold))
    }

    pub fn display_template(&self) -> DisplayTemplate {
        DisplayTemplate::from_index(self.draw.display_template)
    }

    /// Open the configured history store.
    pub fn open_store(&self) -> Result<HistoryStore> {
        let store = match self.storage.backend {
            StorageBackend::Json => HistoryStore::open_json(&self.storage.dir)
                .context(format!("Failed to open history directory {}", self.storage.dir.display()))?,
            StorageBackend::Sqlite => {
                let path = self.storage.dir.join("fairdraw.db");
                HistoryStore::open_sqlite(&path).context(format!("Failed to open database {}", path.display()))?
            }
        };
        Ok(store
            .with_retry(self.storage.retry)
            .with_sentinels(self.draw.sentinels.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fairdraw::weight::FrequencyFunction;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.repeat_mode(None), RepeatMode::NoRepeatUntilExhausted);
        assert_eq!(config.repeat_mode(Some(0)), RepeatMode::Repeat);
        assert_eq!(config.weight_settings(), WeightSettings::default());
    }

    #[test]
    fn test_load_from_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fairdraw.yml");
        fs::write(
            &path,
            r#"
storage:
  backend: sqlite
  dir: /tmp/fairdraw-test
  retry:
    attempts: 5
fair_draw_settings:
  fair_draw: true
  frequency_function: 0
  base_weight: 2
advanced_settings:
  shield_enabled: true
  shield_time: 5
  shield_time_unit: 1
draw:
  repeat_threshold: 3
  display_template: 4
  sentinels:
    all_groups: Whole class
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.retry.attempts, 5);
        assert_eq!(config.repeat_mode(None), RepeatMode::HalfRepeat(3));
        assert_eq!(config.display_template(), DisplayTemplate::PrizeStudentDashed);
        assert_eq!(config.draw.sentinels.all_groups, "Whole class");
        assert_eq!(config.draw.sentinels.all_genders, "all");

        let settings = config.weight_settings();
        assert!(settings.fair_draw_enabled);
        assert!(settings.shield_enabled);
        assert_eq!(settings.frequency_function, FrequencyFunction::Linear);
        assert_eq!(settings.base_weight, 2.0);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = PathBuf::from("/definitely/not/here/fairdraw.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_open_store_for_each_backend() {
        let temp = TempDir::new().unwrap();
        for backend in [StorageBackend::Json, StorageBackend::Sqlite] {
            let mut config = Config::default();
            config.storage.backend = backend;
            config.storage.dir = temp.path().join(format!("{:?}", backend));
            assert!(config.open_store().is_ok());
        }
    }
}
