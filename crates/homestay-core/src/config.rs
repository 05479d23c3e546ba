//! Configuration resolution for Homestay.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/homestay/settings.json)
//! 3. Project config (.homestay/settings.json)
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete Homestay configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub reservations: ReservationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; `None` leaves the choice to the binary.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_connections: 5,
        }
    }
}

/// Which transport the notification dispatcher delivers through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Write each message to the log.
    #[default]
    Log,
    /// POST each message to `webhook_url`.
    Webhook,
    /// Send each message as mail through `smtp_host`.
    Smtp,
    /// Drop every message.
    Disabled,
}

impl std::str::FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "webhook" => Ok(Self::Webhook),
            "smtp" | "mail" => Ok(Self::Smtp),
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            _ => Err(Error::UnknownValue {
                kind: "notification transport",
                value: s.to_string(),
            }),
        }
    }
}

/// Notification dispatch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub transport: TransportKind,
    pub webhook_url: Option<String>,
    /// From-address stamped on outgoing messages.
    pub sender: String,
    pub smtp_host: Option<String>,
    /// 587 for STARTTLS, 465 for implicit TLS.
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            transport: TransportKind::Log,
            webhook_url: None,
            sender: "bookings@homestay.local".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
        }
    }
}

/// Reservation workflow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReservationConfig {
    /// Payment window granted on acceptance when the booking named none.
    pub payment_hold_secs: i64,
    /// Candidates considered when picking an alternative listing.
    pub suggestion_limit: u32,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            payment_hold_secs: 12 * 60 * 60, // 12 hours
            suggestion_limit: 20,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "homestay=info".to_string(),
            json: false,
        }
    }
}

/// Contents of one settings file. Every field is optional so a file only
/// overrides what it names.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub database: DatabaseFile,
    pub notifications: NotificationFile,
    pub reservations: ReservationFile,
    pub logging: LoggingFile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseFile {
    pub path: Option<PathBuf>,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationFile {
    pub transport: Option<TransportKind>,
    pub webhook_url: Option<String>,
    pub sender: Option<String>,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReservationFile {
    pub payment_hold_secs: Option<i64>,
    pub suggestion_limit: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingFile {
    pub level: Option<String>,
    pub json: Option<bool>,
}

/// Load configuration with hierarchical resolution.
pub fn load_config(project_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::default();

    if let Some(global_path) = global_config_path() {
        if global_path.exists() {
            let global = load_config_file(&global_path)?;
            merge_config(&mut config, global);
        }
    }

    if let Some(dir) = project_dir {
        let project_path = dir.join(".homestay").join("settings.json");
        if project_path.exists() {
            let project = load_config_file(&project_path)?;
            merge_config(&mut config, project);
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

    Ok(config)
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

fn config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .ok()
            .map(|h| PathBuf::from(h).join(".homestay"))
    }
    #[cfg(target_os = "macos")]
    {
        std::env::var("HOME")
            .ok()
            .map(|h| PathBuf::from(h).join("Library/Application Support/homestay"))
    }
    #[cfg(target_os = "linux")]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
            .map(|p| p.join("homestay"))
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        None
    }
}

pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

fn merge_config(base: &mut Config, overlay: ConfigFile) {
    let ConfigFile {
        database,
        notifications,
        reservations,
        logging,
    } = overlay;

    set(&mut base.database.path, database.path.map(Some));
    set(&mut base.database.max_connections, database.max_connections);

    let n = &mut base.notifications;
    set(&mut n.transport, notifications.transport);
    set(&mut n.webhook_url, notifications.webhook_url.map(Some));
    set(&mut n.sender, notifications.sender);
    set(&mut n.smtp_host, notifications.smtp_host.map(Some));
    set(&mut n.smtp_port, notifications.smtp_port);
    set(&mut n.smtp_username, notifications.smtp_username.map(Some));
    set(&mut n.smtp_password, notifications.smtp_password.map(Some));

    set(&mut base.reservations.payment_hold_secs, reservations.payment_hold_secs);
    set(&mut base.reservations.suggestion_limit, reservations.suggestion_limit);

    set(&mut base.logging.level, logging.level);
    set(&mut base.logging.json, logging.json);
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

/// Apply `HOMESTAY_*` overrides read through `lookup`.
///
/// Malformed numeric or enum values are configuration errors, not silently
/// ignored.
pub fn apply_env_overrides(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(val) = lookup("HOMESTAY_DB_PATH") {
        config.database.path = Some(PathBuf::from(val));
    }
    if let Some(val) = lookup("HOMESTAY_LOG_LEVEL") {
        config.logging.level = val;
    }
    if let Some(val) = lookup("HOMESTAY_PAYMENT_HOLD_SECS") {
        config.reservations.payment_hold_secs = val.parse().map_err(|_| {
            Error::Config(format!("HOMESTAY_PAYMENT_HOLD_SECS is not a number: {val}"))
        })?;
    }
    if let Some(val) = lookup("HOMESTAY_NOTIFY_TRANSPORT") {
        config.notifications.transport = val.parse()?;
    }
    if let Some(val) = lookup("HOMESTAY_WEBHOOK_URL") {
        config.notifications.webhook_url = Some(val);
    }
    if let Some(val) = lookup("HOMESTAY_SENDER") {
        config.notifications.sender = val;
    }
    if let Some(val) = lookup("HOMESTAY_SMTP_HOST") {
        config.notifications.smtp_host = Some(val);
    }
    if let Some(val) = lookup("HOMESTAY_SMTP_PORT") {
        config.notifications.smtp_port = val
            .parse()
            .map_err(|_| Error::Config(format!("HOMESTAY_SMTP_PORT is not a port: {val}")))?;
    }
    if let Some(val) = lookup("HOMESTAY_SMTP_USERNAME") {
        config.notifications.smtp_username = Some(val);
    }
    if let Some(val) = lookup("HOMESTAY_SMTP_PASSWORD") {
        config.notifications.smtp_password = Some(val);
    }
    Ok(())
}
