use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Written to ~/.teammatch/teammatch.toml on first start
const DEFAULT_CONFIG: &str = r#"
[telegram]
bot_token = ""  # Set via TELEGRAM_BOT_TOKEN env var

[database]
backend = "sqlite"  # or "memory" (profiles are lost on restart)
path = "teammatch.db"  # Set via TEAMMATCH_DATABASE_PATH env var

[matching]
store_timeout_secs = 10
session_ttl_secs = 86400  # 0 keeps unfinished registrations forever
max_listed_candidates = 5

[logging]
level = "info"  # trace, debug, info, warn, error
format = "pretty"  # or "json"
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    pub path: String,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Sqlite
}

#[derive(Debug, Deserialize, Clone)]
pub struct MatchingConfig {
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
    #[serde(default = "default_max_listed")]
    pub max_listed_candidates: usize,
}

fn default_store_timeout() -> u64 {
    10
}

fn default_session_ttl() -> u64 {
    24 * 60 * 60
}

fn default_max_listed() -> usize {
    5
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            store_timeout_secs: default_store_timeout(),
            session_ttl_secs: default_session_ttl(),
            max_listed_candidates: default_max_listed(),
        }
    }
}

impl MatchingConfig {
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// `None` when sessions never expire
    pub fn session_ttl(&self) -> Option<Duration> {
        (self.session_ttl_secs > 0).then(|| Duration::from_secs(self.session_ttl_secs))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Get the global config path: ~/.teammatch/teammatch.toml
    fn global_config_path() -> anyhow::Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Could not find home directory"))?;
        Ok(home.join(".teammatch").join("teammatch.toml"))
    }

    /// Ensure global config directory and file exist, creating defaults if needed
    fn ensure_global_config() -> anyhow::Result<PathBuf> {
        let config_path = Self::global_config_path()?;
        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir).with_context(|| {
                    format!("Failed to create config directory {}", config_dir.display())
                })?;
                eprintln!("Created config directory: {}", config_dir.display());
            }
        }

        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG.trim())?;
            eprintln!("Created default config: {}", config_path.display());
            eprintln!("Please edit this file or set environment variables.");
        }

        Ok(config_path)
    }

    /// Load configuration with layered approach:
    /// 1. Global config: ~/.teammatch/teammatch.toml (auto-created if missing)
    /// 2. Local override: ./teammatch.toml (optional)
    /// 3. TEAMMATCH__SECTION__KEY environment variables
    /// 4. TELEGRAM_BOT_TOKEN and TEAMMATCH_DATABASE_PATH (highest priority)
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let global_config_path = Self::ensure_global_config()?;

        let mut config_builder = config::Config::builder()
            .add_source(config::File::from(global_config_path))
            .add_source(config::File::with_name("teammatch").required(false))
            .add_source(config::Environment::with_prefix("TEAMMATCH").separator("__"));

        if let Ok(token) = env::var("TELEGRAM_BOT_TOKEN") {
            config_builder = config_builder.set_override("telegram.bot_token", token)?;
        }

        if let Ok(path) = env::var("TEAMMATCH_DATABASE_PATH") {
            config_builder = config_builder.set_override("database.path", path)?;
        }

        let config: Self = config_builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(anyhow!(
                "No Telegram bot token configured. Set TELEGRAM_BOT_TOKEN or edit {}",
                Self::global_config_path()?.display()
            ));
        }
        if self.matching.store_timeout_secs == 0 {
            return Err(anyhow!(
                "matching.store_timeout_secs must be at least 1; every store call would time out"
            ));
        }
        if self.database.backend == StorageBackend::Sqlite && self.database.path.trim().is_empty() {
            return Err(anyhow!("database.path must be set for the sqlite backend"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    fn parse(toml: &str) -> Config {
        config::Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_default_template_parses() {
        let config = parse(DEFAULT_CONFIG);
        assert_eq!(config.database.backend, StorageBackend::Sqlite);
        assert_eq!(config.database.path, "teammatch.db");
        assert_eq!(config.matching.store_timeout(), Duration::from_secs(10));
        assert_eq!(
            config.matching.session_ttl(),
            Some(Duration::from_secs(86400))
        );
        assert_eq!(config.matching.max_listed_candidates, 5);
        assert_eq!(config.logging.format, "pretty");
        // An empty token is only rejected at load time
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_matching_section_is_optional() {
        let config = parse(
            r#"
            [telegram]
            bot_token = "123:abc"
            [database]
            backend = "memory"
            path = ""
            [logging]
            level = "debug"
            "#,
        );
        assert_eq!(config.database.backend, StorageBackend::Memory);
        assert_eq!(config.matching.max_listed_candidates, 5);
        assert_eq!(config.logging.format, "");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_store_timeout_is_rejected() {
        let config = parse(
            r#"
            [telegram]
            bot_token = "123:abc"
            [database]
            path = "teammatch.db"
            [matching]
            store_timeout_secs = 0
            [logging]
            level = "info"
            "#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("store_timeout_secs"));
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let matching = MatchingConfig {
            session_ttl_secs: 0,
            ..MatchingConfig::default()
        };
        assert_eq!(matching.session_ttl(), None);
    }
}
