use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::Language;

/// Which operations the backend may perform in this environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    None,
    ReadOnly,
    WriteOnly,
    #[default]
    ReadWrite,
}

impl AccessLevel {
    pub fn can_read(self) -> bool {
        matches!(self, AccessLevel::ReadOnly | AccessLevel::ReadWrite)
    }

    pub fn can_write(self) -> bool {
        matches!(self, AccessLevel::WriteOnly | AccessLevel::ReadWrite)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Sqlite,
    Realtime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    pub url: String,
    pub auth_token: Option<String>,
    /// Generated and remembered in local storage when absent.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    #[serde(default = "default_storage_path")]
    pub storage_path: String,

    #[serde(default)]
    pub backend: BackendKind,

    pub realtime: Option<RealtimeConfig>,

    #[serde(default)]
    pub access_level: AccessLevel,

    #[serde(default)]
    pub default_language: Language,

    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: u64,

    #[serde(default = "default_banner_seconds")]
    pub banner_seconds: u64,

    #[serde(default = "default_like_cooldown_ms")]
    pub like_cooldown_ms: u64,

    #[serde(default = "default_sounds_dir")]
    pub sounds_dir: String,

    #[serde(default = "default_audio_player")]
    pub audio_player: Vec<String>,
}

fn data_dir() -> PathBuf {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tip-station");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir
}

fn default_db_path() -> String {
    data_dir().join("tips.db").to_string_lossy().to_string()
}

fn default_storage_path() -> String {
    data_dir()
        .join("local_storage.json")
        .to_string_lossy()
        .to_string()
}

fn default_sounds_dir() -> String {
    data_dir().join("sounds").to_string_lossy().to_string()
}

fn default_cache_ttl_hours() -> u64 {
    24
}

fn default_banner_seconds() -> u64 {
    5
}

fn default_like_cooldown_ms() -> u64 {
    2000
}

fn default_audio_player() -> Vec<String> {
    ["ffplay", "-nodisp", "-loglevel", "quiet", "-loop", "0"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            storage_path: default_storage_path(),
            backend: BackendKind::default(),
            realtime: None,
            access_level: AccessLevel::default(),
            default_language: Language::default(),
            cache_ttl_hours: default_cache_ttl_hours(),
            banner_seconds: default_banner_seconds(),
            like_cooldown_ms: default_like_cooldown_ms(),
            sounds_dir: default_sounds_dir(),
            audio_player: default_audio_player(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.backend == BackendKind::Realtime && self.realtime.is_none() {
            return Err(AppError::Config(
                "backend = \"realtime\" needs a [realtime] table with a url".into(),
            ));
        }
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tip-station")
            .join("config.toml")
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours.saturating_mul(60 * 60))
    }

    pub fn banner_duration(&self) -> Duration {
        Duration::from_secs(self.banner_seconds)
    }

    pub fn like_cooldown(&self) -> Duration {
        Duration::from_millis(self.like_cooldown_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_levels_gate_reads_and_writes() {
        assert!(AccessLevel::ReadWrite.can_read() && AccessLevel::ReadWrite.can_write());
        assert!(AccessLevel::ReadOnly.can_read() && !AccessLevel::ReadOnly.can_write());
        assert!(!AccessLevel::WriteOnly.can_read() && AccessLevel::WriteOnly.can_write());
        assert!(!AccessLevel::None.can_read() && !AccessLevel::None.can_write());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            db_path = "/tmp/tips.db"
            access_level = "read_only"
            default_language = "en"
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path, "/tmp/tips.db");
        assert_eq!(config.access_level, AccessLevel::ReadOnly);
        assert_eq!(config.default_language, Language::En);
        assert_eq!(config.backend, BackendKind::Sqlite);
        assert_eq!(config.cache_ttl(), Duration::from_secs(24 * 60 * 60));
        assert_eq!(config.like_cooldown(), Duration::from_secs(2));
        assert_eq!(config.banner_duration(), Duration::from_secs(5));
        assert_eq!(config.audio_player[0], "ffplay");
    }

    #[test]
    fn realtime_backend_requires_settings() {
        let config: Config = toml::from_str(r#"backend = "realtime""#).unwrap();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let config: Config = toml::from_str(
            r#"
            backend = "realtime"

            [realtime]
            url = "https://tips.example.com"
            "#,
        )
        .unwrap();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.db_path, config.db_path);
        assert_eq!(parsed.audio_player, config.audio_player);
    }

    #[test]
    fn huge_cache_ttl_saturates() {
        let config = Config {
            cache_ttl_hours: u64::MAX,
            ..Config::default()
        };
        assert_eq!(config.cache_ttl(), Duration::from_secs(u64::MAX));
    }
}
