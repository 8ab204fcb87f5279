//! SubClaw configuration system.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SubClawError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubClawConfig {
    /// Operator phone; commands are only accepted from this contact.
    #[serde(default = "default_operator_phone")]
    pub operator_phone: String,
    /// IANA timezone used for "today" and for the daily reminder time.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub messaging: MessagingConfig,
}

fn default_operator_phone() -> String { "18494736782".into() }
fn default_timezone() -> String { "America/Santo_Domingo".into() }

impl Default for SubClawConfig {
    fn default() -> Self {
        Self {
            operator_phone: default_operator_phone(),
            timezone: default_timezone(),
            store: StoreConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            gateway: GatewayConfig::default(),
            schedule: ScheduleConfig::default(),
            messaging: MessagingConfig::default(),
        }
    }
}

impl SubClawConfig {
    /// Load config from the default path (~/.subclaw/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default().with_env_overrides())
        }
    }

    /// Load config from a specific path. `~` is expanded.
    pub fn load_from(path: &Path) -> Result<Self> {
        let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).to_string());
        let content = std::fs::read_to_string(&expanded)
            .map_err(|e| SubClawError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse config text and apply env overrides.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| SubClawError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config.with_env_overrides())
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubClawError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the SubClaw home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".subclaw")
    }

    /// Secrets from the environment win over the file.
    fn with_env_overrides(mut self) -> Self {
        if let Ok(token) = std::env::var("SUBCLAW_SHEETS_TOKEN") {
            self.store.access_token = token;
        }
        if let Ok(secret) = std::env::var("SUBCLAW_SHEETS_CLIENT_SECRET") {
            self.store.client_secret = secret;
        }
        if let Ok(token) = std::env::var("SUBCLAW_SHEETS_REFRESH_TOKEN") {
            self.store.refresh_token = token;
        }
        if let Ok(token) = std::env::var("SUBCLAW_WHATSAPP_TOKEN") {
            self.whatsapp.access_token = token;
        }
        if let Ok(token) = std::env::var("SUBCLAW_WHATSAPP_VERIFY_TOKEN") {
            self.whatsapp.webhook_verify_token = token;
        }
        if let Ok(secret) = std::env::var("SUBCLAW_WHATSAPP_APP_SECRET") {
            self.whatsapp.app_secret = secret;
        }
        self
    }

    /// Parse the configured timezone.
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| SubClawError::Config(format!("Unknown timezone '{}': {e}", self.timezone)))
    }

    /// Checks that have to pass before the service starts.
    pub fn validate(&self) -> Result<()> {
        self.tz()?;
        if crate::phone::to_digits(&self.operator_phone).is_empty() {
            return Err(SubClawError::Config("operator_phone has no digits".into()));
        }
        if self.store.first_data_row == 0 {
            return Err(SubClawError::Config("store.first_data_row must be >= 1".into()));
        }
        match self.store.range_start_row() {
            None => {
                return Err(SubClawError::Config(format!(
                    "store.data_range '{}' is not an A1 range",
                    self.store.data_range
                )));
            }
            Some(row) if row != self.store.first_data_row => {
                return Err(SubClawError::Config(format!(
                    "store.data_range '{}' starts at row {row} but store.first_data_row is {}",
                    self.store.data_range, self.store.first_data_row
                )));
            }
            Some(_) => {}
        }
        if self.schedule.reminder_hour > 23 || self.schedule.reminder_minute > 59 {
            return Err(SubClawError::Config(format!(
                "Invalid reminder time {}:{}",
                self.schedule.reminder_hour, self.schedule.reminder_minute
            )));
        }
        Ok(())
    }
}

/// Backing spreadsheet configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub spreadsheet_id: String,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    /// Data range without the sheet prefix; starts right below the header.
    #[serde(default = "default_data_range")]
    pub data_range: String,
    /// Sheet row number of the first data row (1-based).
    #[serde(default = "default_first_data_row")]
    pub first_data_row: u32,
    /// Static OAuth bearer token. Only used when no refresh credentials
    /// are configured.
    #[serde(default)]
    pub access_token: String,
    /// OAuth client id; with `refresh_token` set, access tokens are
    /// refreshed automatically.
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default = "default_sheets_api_base")]
    pub api_base: String,
}

fn default_sheet_name() -> String { "Clientes".into() }
fn default_data_range() -> String { "A2:P".into() }
fn default_first_data_row() -> u32 { 2 }
fn default_sheets_api_base() -> String { "https://sheets.googleapis.com/v4".into() }
fn default_token_uri() -> String { "https://oauth2.googleapis.com/token".into() }

impl StoreConfig {
    /// Row number where `data_range` starts: `A2:P` gives 2, an open
    /// column range like `A:P` gives 1. `None` if the start is not a cell
    /// or column reference.
    pub fn range_start_row(&self) -> Option<u32> {
        let start = self.data_range.split(':').next()?.trim();
        let digits_at = start
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(start.len());
        let (column, row) = start.split_at(digits_at);
        if column.is_empty() {
            return None;
        }
        if row.is_empty() {
            return Some(1);
        }
        row.parse::<u32>().ok().filter(|r| *r > 0)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            sheet_name: default_sheet_name(),
            data_range: default_data_range(),
            first_data_row: default_first_data_row(),
            access_token: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            token_uri: default_token_uri(),
            api_base: default_sheets_api_base(),
        }
    }
}

/// WhatsApp Business Cloud API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Facebook Graph API access token
    #[serde(default)]
    pub access_token: String,
    /// WhatsApp Phone Number ID
    #[serde(default)]
    pub phone_number_id: String,
    /// Webhook verify token (for incoming messages)
    #[serde(default)]
    pub webhook_verify_token: String,
    /// Meta app secret; signs webhook deliveries (`X-Hub-Signature-256`).
    #[serde(default)]
    pub app_secret: String,
    #[serde(default = "default_graph_api_base")]
    pub api_base: String,
}

fn default_graph_api_base() -> String { "https://graph.facebook.com/v21.0".into() }

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            webhook_verify_token: String::new(),
            app_secret: String::new(),
            api_base: default_graph_api_base(),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 { 3000 }
fn default_host() -> String { "0.0.0.0".into() }

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

/// When the recurring jobs fire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_hourly")]
    pub refresh_cron: String,
    #[serde(default = "default_reminder_hour")]
    pub reminder_hour: u32,
    #[serde(default = "default_reminder_minute")]
    pub reminder_minute: u32,
    #[serde(default = "default_hourly")]
    pub heartbeat_cron: String,
    #[serde(default = "default_check_interval")]
    pub check_interval_secs: u64,
}

fn default_hourly() -> String { "0 * * * *".into() }
fn default_reminder_hour() -> u32 { 11 }
fn default_reminder_minute() -> u32 { 40 }
fn default_check_interval() -> u64 { 30 }

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            refresh_cron: default_hourly(),
            reminder_hour: default_reminder_hour(),
            reminder_minute: default_reminder_minute(),
            heartbeat_cron: default_hourly(),
            check_interval_secs: default_check_interval(),
        }
    }
}

/// Pacing and defaults for outbound messaging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    /// Pause between broadcast sends.
    #[serde(default = "default_broadcast_delay")]
    pub broadcast_delay_ms: u64,
    /// Pause between multiple account deliveries to the same user.
    #[serde(default = "default_delivery_delay")]
    pub delivery_delay_ms: u64,
    /// Minimum gap between automated replies to the same general user.
    #[serde(default = "default_reply_cooldown")]
    pub reply_cooldown_hours: i64,
    #[serde(default = "default_renewal_days")]
    pub default_renewal_days: u32,
}

fn default_broadcast_delay() -> u64 { 1500 }
fn default_delivery_delay() -> u64 { 500 }
fn default_reply_cooldown() -> i64 { 24 }
fn default_renewal_days() -> u32 { 30 }

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            broadcast_delay_ms: default_broadcast_delay(),
            delivery_delay_ms: default_delivery_delay(),
            reply_cooldown_hours: default_reply_cooldown(),
            default_renewal_days: default_renewal_days(),
        }
    }
}
