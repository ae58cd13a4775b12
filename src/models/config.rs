//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where offers are fetched from and how they are extracted
    #[serde(default)]
    pub source: SourceConfig,

    /// Notification channel settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Message templates
    #[serde(default)]
    pub messages: MessagesConfig,

    /// Poll cadence
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Retry and escalation policy
    #[serde(default)]
    pub supervisor: SupervisorConfig,

    /// History and diagnostics locations
    #[serde(default)]
    pub storage: StorageConfig,

    /// Optional spreadsheet ledger
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Optional heartbeat endpoint
    #[serde(default)]
    pub health: HealthConfig,

    /// Identity hashing
    #[serde(default)]
    pub fingerprint: FingerprintConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load the config file if it exists, then apply environment overrides.
    ///
    /// A missing file yields defaults. A file that exists but cannot be read
    /// or parsed is a configuration error.
    pub fn resolve(
        path: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::load(path)
                .map_err(|e| AppError::config(format!("{}: {}", path.display(), e)))?
        } else {
            Self::default()
        };
        config.apply_env(lookup);
        Ok(config)
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = get("TELEGRAM_BOT_TOKEN") {
            self.notify.bot_token = token;
        }
        if let Some(ids) = get("TELEGRAM_CHAT_IDS") {
            self.notify.targets = ids
                .split(',')
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty())
                .collect();
        }
        if let Some(file) = get("SUPERQUOTE_HISTORY_FILE") {
            self.storage.history_file = PathBuf::from(file);
        }
        if let Some(url) = get("HEALTHCHECK_URL") {
            self.health.url = Some(url);
        }
        if let Some(path) = get("GOOGLE_SHEETS_CREDENTIALS_FILE") {
            self.ledger.credentials_file = Some(PathBuf::from(path));
        }
        if let Some(id) = get("GOOGLE_SHEETS_SPREADSHEET_ID") {
            self.ledger.spreadsheet_id = Some(id);
        }
        if let Some(name) = get("GOOGLE_SHEETS_WORKSHEET_NAME") {
            self.ledger.worksheet = name;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.notify.targets.is_empty() {
            return Err(AppError::config("notify.targets must list at least one chat"));
        }
        if self.notify.targets.iter().any(|t| t.trim().is_empty()) {
            return Err(AppError::config("notify.targets contains a blank chat id"));
        }
        if self.notify.bot_token.trim().is_empty() {
            return Err(AppError::config("notify.bot_token is empty"));
        }
        if self.notify.timeout_secs == 0 {
            return Err(AppError::config("notify.timeout_secs must be > 0"));
        }
        if self.schedule.poll_min_secs == 0 {
            return Err(AppError::config("schedule.poll_min_secs must be > 0"));
        }
        if self.schedule.poll_min_secs > self.schedule.poll_max_secs {
            return Err(AppError::config(
                "schedule.poll_min_secs must not exceed schedule.poll_max_secs",
            ));
        }
        if self.supervisor.failure_threshold == 0 {
            return Err(AppError::config("supervisor.failure_threshold must be > 0"));
        }
        if self.source.container_selectors.is_empty() {
            return Err(AppError::config("source.container_selectors is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::config("source.timeout_secs must be > 0"));
        }

        Url::parse(&self.source.url)
            .map_err(|e| AppError::config(format!("source.url is invalid: {e}")))?;
        Url::parse(&self.notify.api_base)
            .map_err(|e| AppError::config(format!("notify.api_base is invalid: {e}")))?;
        if let Some(url) = &self.health.url {
            Url::parse(url).map_err(|e| AppError::config(format!("health.url is invalid: {e}")))?;
        }
        Ok(())
    }
}

/// Offer source and extraction selectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Page listing the offers
    #[serde(default = "defaults::source_url")]
    pub url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::source_timeout")]
    pub timeout_secs: u64,

    /// Container selectors, tried in order; the first that matches wins
    #[serde(default = "defaults::container_selectors")]
    pub container_selectors: Vec<String>,

    /// A container is only an offer if this selector matches inside it
    #[serde(default = "defaults::boost_marker_selector")]
    pub boost_marker_selector: String,

    /// Per-field selectors inside a container
    #[serde(default)]
    pub fields: FieldSelectors,

    /// Rewrite `1.80` as `1,80`
    #[serde(default = "defaults::decimal_comma")]
    pub decimal_comma: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: defaults::source_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::source_timeout(),
            container_selectors: defaults::container_selectors(),
            boost_marker_selector: defaults::boost_marker_selector(),
            fields: FieldSelectors::default(),
            decimal_comma: defaults::decimal_comma(),
        }
    }
}

/// CSS selectors for the fields of one offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSelectors {
    #[serde(default = "defaults::icon_selector")]
    pub icon: String,
    #[serde(default = "defaults::details_selector")]
    pub details: String,
    #[serde(default = "defaults::subject_selector")]
    pub subject: String,
    #[serde(default = "defaults::market_selector")]
    pub market: String,
    #[serde(default = "defaults::old_value_selector")]
    pub old_value: String,
    #[serde(default = "defaults::new_value_selector")]
    pub new_value: String,
}

impl Default for FieldSelectors {
    fn default() -> Self {
        Self {
            icon: defaults::icon_selector(),
            details: defaults::details_selector(),
            subject: defaults::subject_selector(),
            market: defaults::market_selector(),
            old_value: defaults::old_value_selector(),
            new_value: defaults::new_value_selector(),
        }
    }
}

/// Telegram-style notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default = "defaults::api_base")]
    pub api_base: String,

    #[serde(default)]
    pub bot_token: String,

    /// Chat ids receiving every event
    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(default = "defaults::parse_mode")]
    pub parse_mode: String,

    #[serde(default = "defaults::notify_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            api_base: defaults::api_base(),
            bot_token: String::new(),
            targets: Vec::new(),
            parse_mode: defaults::parse_mode(),
            timeout_secs: defaults::notify_timeout(),
        }
    }
}

/// Notification templates. See [`crate::models::Item::format`] for placeholders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagesConfig {
    #[serde(default = "defaults::added_message")]
    pub added: String,

    #[serde(default = "defaults::removed_message")]
    pub removed: String,
}

impl Default for MessagesConfig {
    fn default() -> Self {
        Self {
            added: defaults::added_message(),
            removed: defaults::removed_message(),
        }
    }
}

/// Randomised delay between successful cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "defaults::poll_min")]
    pub poll_min_secs: u64,

    #[serde(default = "defaults::poll_max")]
    pub poll_max_secs: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_min_secs: defaults::poll_min(),
            poll_max_secs: defaults::poll_max(),
        }
    }
}

/// Backoff and escalation for acquisition failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisorConfig {
    /// Linear backoff step: the n-th consecutive failure waits n times this
    #[serde(default = "defaults::backoff_base")]
    pub backoff_base_secs: u64,

    /// Consecutive failures before giving up
    #[serde(default = "defaults::failure_threshold")]
    pub failure_threshold: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            backoff_base_secs: defaults::backoff_base(),
            failure_threshold: defaults::failure_threshold(),
        }
    }
}

/// Persisted state locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "defaults::history_file")]
    pub history_file: PathBuf,

    #[serde(default = "defaults::diagnostics_dir")]
    pub diagnostics_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            history_file: defaults::history_file(),
            diagnostics_dir: defaults::diagnostics_dir(),
        }
    }
}

/// Spreadsheet ledger settings. All of credentials, spreadsheet id and an
/// existing credentials file are needed for the ledger to be used.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub credentials_file: Option<PathBuf>,

    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    #[serde(default = "defaults::worksheet")]
    pub worksheet: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            credentials_file: None,
            spreadsheet_id: None,
            worksheet: defaults::worksheet(),
        }
    }
}

/// Whether the ledger can be used for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerStatus {
    /// Nothing configured
    Disabled,
    /// Some settings present but not all; the missing piece is named
    Incomplete(&'static str),
    Enabled,
}

impl LedgerConfig {
    pub fn status(&self) -> LedgerStatus {
        let has_id = self
            .spreadsheet_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty());

        match (&self.credentials_file, has_id) {
            (None, false) => LedgerStatus::Disabled,
            (None, true) => LedgerStatus::Incomplete("credentials_file"),
            (Some(_), false) => LedgerStatus::Incomplete("spreadsheet_id"),
            (Some(path), true) if !path.exists() => {
                LedgerStatus::Incomplete("credentials_file (file not found)")
            }
            (Some(_), true) => LedgerStatus::Enabled,
        }
    }
}

/// Heartbeat pinged after every successful cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "defaults::health_timeout")]
    pub timeout_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: defaults::health_timeout(),
        }
    }
}

/// Hash used to derive offer identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FingerprintAlgorithm {
    /// MD5 over `subject|market|details`, readable by older history files
    #[default]
    LegacyMd5,
    /// SHA-256 over the fields joined by the unit separator
    Sha256,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FingerprintConfig {
    #[serde(default)]
    pub algorithm: FingerprintAlgorithm,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Source defaults
    pub fn source_url() -> String {
        "https://www.bet365.it/#/HO/".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/118.0.0.0 Safari/537.36".into()
    }
    pub fn source_timeout() -> u64 {
        60
    }
    pub fn container_selectors() -> Vec<String> {
        vec![
            ".pbb-PopularBetsList > div".into(),
            ".pbb-SuperBetBoost-parent".into(),
        ]
    }
    pub fn boost_marker_selector() -> String {
        ".pbb-SuperBetBoost, .pbb-SuperBoostChevron".into()
    }
    pub fn decimal_comma() -> bool {
        true
    }

    // Field selector defaults
    pub fn icon_selector() -> String {
        "img.pbb-PopularBet_Icon".into()
    }
    pub fn details_selector() -> String {
        ".pbb-PopularBet_Text".into()
    }
    pub fn subject_selector() -> String {
        ".pbb-PopularBet_BetLine".into()
    }
    pub fn market_selector() -> String {
        ".pbb-PopularBet_MarketName".into()
    }
    pub fn old_value_selector() -> String {
        ".pbb-PopularBet_PreviousOdds".into()
    }
    pub fn new_value_selector() -> String {
        ".pbb-PopularBet_BoostedOdds".into()
    }

    // Notification defaults
    pub fn api_base() -> String {
        "https://api.telegram.org".into()
    }
    pub fn parse_mode() -> String {
        "Markdown".into()
    }
    pub fn notify_timeout() -> u64 {
        10
    }
    pub fn added_message() -> String {
        "✨ *NEW SUPERQUOTE* ✨\n\n⚽ {category}\n🆚 {subject}\n📊 {market}\n📝 {details}\n📉 {old_value} ➡ 📈 *{new_value}*".into()
    }
    pub fn removed_message() -> String {
        "❌ *SUPERQUOTE ENDED*\n\n🆚 {subject}\n📉 {old_value} ➡ {new_value}".into()
    }

    // Schedule defaults
    pub fn poll_min() -> u64 {
        70
    }
    pub fn poll_max() -> u64 {
        110
    }

    // Supervisor defaults
    pub fn backoff_base() -> u64 {
        30
    }
    pub fn failure_threshold() -> u32 {
        5
    }

    // Storage defaults
    pub fn history_file() -> PathBuf {
        PathBuf::from("superquote_history.json")
    }
    pub fn diagnostics_dir() -> PathBuf {
        PathBuf::from("diagnostics")
    }

    pub fn worksheet() -> String {
        "Database".into()
    }
    pub fn health_timeout() -> u64 {
        10
    }
    pub fn log_level() -> String {
        "info".into()
    }
}
