use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::models::SourceConfig;
use crate::utils::delay::DelayRange;
use crate::utils::error::AppError;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/99.0.4844.51 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default = "SourceConfig::defaults")]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub user_agent: String,
    pub chrome_path: Option<String>,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub navigation_timeout_ms: u64,
    pub ready_timeout_ms: u64,
    pub consent_timeout_ms: u64,
    pub screenshot_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub api_base: String,
    pub timeout_secs: u64,
    pub delivery_delay: DelayRange,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub source_delay: DelayRange,
    pub watch_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: Option<PathBuf>,
}

/// Credential pair for the Telegram bot API, present only after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            chrome_path: None,
            viewport_width: 1280,
            viewport_height: 720,
            navigation_timeout_ms: 60_000,
            ready_timeout_ms: 30_000,
            consent_timeout_ms: 2_000,
            screenshot_dir: PathBuf::from("."),
        }
    }
}

impl ScraperConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }

    pub fn consent_timeout(&self) -> Duration {
        Duration::from_millis(self.consent_timeout_ms)
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            chat_id: None,
            api_base: "https://api.telegram.org".to_string(),
            timeout_secs: 10,
            delivery_delay: DelayRange::from_secs(1, 3),
        }
    }
}

impl TelegramConfig {
    /// Both halves of the credential pair, or a configuration error naming the
    /// missing ones.
    pub fn credentials(&self) -> Result<TelegramCredentials, AppError> {
        let token = self.bot_token.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let chat = self.chat_id.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (token, chat) {
            (Some(bot_token), Some(chat_id)) => Ok(TelegramCredentials {
                bot_token: bot_token.to_string(),
                chat_id: chat_id.to_string(),
            }),
            (token, chat) => {
                let mut missing = Vec::new();
                if token.is_none() {
                    missing.push("TELEGRAM_BOT_TOKEN");
                }
                if chat.is_none() {
                    missing.push("TELEGRAM_CHAT_ID");
                }
                Err(AppError::Configuration(format!(
                    "Missing {} environment variables",
                    missing.join(" or ")
                )))
            }
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("seen_ads.json"),
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            source_delay: DelayRange::from_secs(3, 7),
            watch_interval_secs: 15 * 60,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            scraper: ScraperConfig::default(),
            telegram: TelegramConfig::default(),
            state: StateConfig::default(),
            run: RunConfig::default(),
            logging: LoggingConfig::default(),
            sources: SourceConfig::defaults(),
        }
    }
}

impl AppConfig {
    /// Layered load: `{dir}/default`, `{dir}/{RUN_MODE}`, `{dir}/local`, then
    /// `LISTING_WATCHER__*` environment variables. Every file is optional.
    pub fn from_dir(dir: &str) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name(&format!("{}/default", dir)).required(false))
            .add_source(File::with_name(&format!("{}/{}", dir, run_mode)).required(false))
            // Add local config (ignored by git)
            .add_source(File::with_name(&format!("{}/local", dir)).required(false))
            .add_source(Environment::with_prefix("LISTING_WATCHER").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        // Credentials and Chrome path come from the plain variables the
        // deployment already exports
        if config.telegram.bot_token.is_none() {
            config.telegram.bot_token = env::var("TELEGRAM_BOT_TOKEN").ok();
        }
        if config.telegram.chat_id.is_none() {
            config.telegram.chat_id = env::var("TELEGRAM_CHAT_ID").ok();
        }
        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    /// Structural checks. Missing credentials are not an error here; they are
    /// checked at the start of each run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.is_empty() {
            return Err(ConfigError::Message("At least one source must be configured".into()));
        }

        let mut tags = HashSet::new();
        for source in &self.sources {
            source.validate().map_err(ConfigError::Message)?;
            if !tags.insert(source.tag.as_str()) {
                return Err(ConfigError::Message(format!("Duplicate source tag '{}'", source.tag)));
            }
        }

        // "site" + "a-1" and "site-a" + "1" would share the identity "site-a-1"
        for tag in &tags {
            if let Some(other) = tags.iter().find(|other| other.starts_with(&format!("{}-", tag))) {
                return Err(ConfigError::Message(format!(
                    "Source tags '{}' and '{}' can produce the same identity",
                    tag, other
                )));
            }
        }

        if self.scraper.navigation_timeout_ms == 0 || self.scraper.ready_timeout_ms == 0 {
            return Err(ConfigError::Message("Scraper timeouts must be greater than 0".into()));
        }

        if self.scraper.viewport_width == 0 || self.scraper.viewport_height == 0 {
            return Err(ConfigError::Message("Viewport dimensions must be greater than 0".into()));
        }

        if Url::parse(&self.telegram.api_base).is_err() {
            return Err(ConfigError::Message("Invalid Telegram API base URL".into()));
        }

        if self.telegram.timeout_secs == 0 {
            return Err(ConfigError::Message("Telegram timeout must be greater than 0".into()));
        }

        if !self.telegram.delivery_delay.is_valid() {
            return Err(ConfigError::Message("telegram.delivery_delay min_ms exceeds max_ms".into()));
        }

        if !self.run.source_delay.is_valid() {
            return Err(ConfigError::Message("run.source_delay min_ms exceeds max_ms".into()));
        }

        if self.run.watch_interval_secs == 0 {
            return Err(ConfigError::Message("Watch interval must be greater than 0".into()));
        }

        Ok(())
    }
}
