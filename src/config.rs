//! Runtime configuration
//!
//! Loaded from a TOML file, every section has defaults. Secrets and the location can be
//! overridden from the environment with the variable names the deployment already uses.

use std::fs;
use std::path::{Path, PathBuf};

use chrono_tz::Tz;
use log::info;
use serde::{Deserialize, Serialize};

use crate::draw::locale::Locale;
use crate::error::{Error, Result};
use crate::time::{parse_tz, DEFAULT_TZ};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub weather: WeatherSettings,
    pub calendar: CalendarSettings,
    pub device: DeviceSettings,
    pub fonts: FontSettings,
    pub cache: CacheSettings,
    pub locale: Locale,
    pub timezone: Option<String>,
    pub http_timeout_secs: Option<u64>,
    /// Shared secret callers of the render entrypoint must present
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherSettings {
    pub host: String,
    pub key: String,
    pub location: String,
    /// Forecast length requested for the calendar view
    pub calendar_days: u8,
    /// Forecast cache lifetime for the calendar view, seconds
    pub calendar_cache_ttl: u64,
    /// Forecast cache lifetime for the trend chart, seconds
    pub chart_cache_ttl: u64,
    pub historical_cache_ttl: u64,
    pub observation_cache_ttl: u64,
}

impl Default for WeatherSettings {
    fn default() -> Self {
        Self {
            host: "devapi.qweather.com".to_string(),
            key: String::new(),
            location: String::new(),
            calendar_days: 30,
            calendar_cache_ttl: 5 * 60,
            chart_cache_ttl: 30 * 60,
            historical_cache_ttl: 6 * 60 * 60,
            observation_cache_ttl: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    /// Registry key of the event source, `none` disables calendar fetching
    pub source: String,
    pub username: String,
    pub password: String,
    /// Base URL, only needed by sources without a fixed endpoint
    pub url: String,
    pub lookahead_days: u32,
}

impl Default for CalendarSettings {
    fn default() -> Self {
        Self {
            source: "none".to_string(),
            username: String::new(),
            password: String::new(),
            url: String::new(),
            lookahead_days: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub app_key: String,
    /// Comma separated device ids
    pub device_ids: String,
    /// Index into `device_ids`, negative pushes to every device
    pub device_idx: i32,
    pub endpoint: String,
    pub link: String,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            app_key: String::new(),
            device_ids: String::new(),
            device_idx: -1,
            endpoint: "https://dot.mindreset.tech/api/open/image".to_string(),
            link: "https://dot.mindreset.tech".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSettings {
    pub text: Option<PathBuf>,
    pub icons: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub dir: PathBuf,
    pub enabled: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
            enabled: true,
        }
    }
}

impl Config {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("invalid config: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&raw)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("DOT_CALENDAR_TOKEN") {
            self.token = Some(v);
        }
        if let Some(v) = get("QWEATHER_KEY") {
            self.weather.key = v;
        }
        if let Some(v) = get("QWEATHER_HOST") {
            self.weather.host = v;
        }
        if let Some(v) = get("CONFIG_USER_LOCATION") {
            self.weather.location = v;
        }
        if let Some(v) = get("DOT_DEVICE_ID") {
            self.device.device_ids = v;
        }
        if let Some(v) = get("DOT_APP_KEY") {
            self.device.app_key = v;
        }
        if let Some(v) = get("DINGTALK_CALDAV_USER") {
            self.calendar.username = v;
            if self.calendar.source == "none" {
                self.calendar.source = "dingtalk".to_string();
            }
        }
        if let Some(v) = get("DINGTALK_CALDAV_PASS") {
            self.calendar.password = v;
        }
        self
    }

    pub fn tz(&self) -> Tz {
        self.timezone
            .as_deref()
            .map(|name| parse_tz(name, DEFAULT_TZ))
            .unwrap_or(DEFAULT_TZ)
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs.unwrap_or(30))
    }

    pub fn require_weather(&self) -> Result<&WeatherSettings> {
        if self.weather.location.trim().is_empty() {
            return Err(Error::Config("weather location is not set".to_string()));
        }
        if self.weather.key.trim().is_empty() {
            return Err(Error::Config("weather API key is not set".to_string()));
        }
        Ok(&self.weather)
    }

    /// `None` when no calendar source is configured at all
    pub fn require_calendar(&self) -> Result<Option<&CalendarSettings>> {
        let calendar = &self.calendar;
        if calendar.source.is_empty() || calendar.source == "none" {
            return Ok(None);
        }
        if calendar.username.is_empty() || calendar.password.is_empty() {
            return Err(Error::Config(format!(
                "calendar source {:?} needs a username and password",
                calendar.source
            )));
        }
        Ok(Some(calendar))
    }

    pub fn require_device(&self) -> Result<&DeviceSettings> {
        if self.device.app_key.is_empty() || self.device.device_ids.trim().is_empty() {
            return Err(Error::Config(
                "device push needs an app key and at least one device id".to_string(),
            ));
        }
        Ok(&self.device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.weather.host, "devapi.qweather.com");
        assert_eq!(config.calendar.source, "none");
        assert_eq!(config.tz(), DEFAULT_TZ);
        assert_eq!(config.locale.precipitation_keywords.len(), 4);
    }

    #[test]
    fn reads_sections() {
        let config = Config::from_toml_str(
            r#"
            timezone = "Europe/Moscow"

            [weather]
            key = "k"
            location = "101010100"

            [calendar]
            source = "caldav"
            url = "https://example.org/dav"
            "#,
        )
        .unwrap();
        assert_eq!(config.weather.location, "101010100");
        assert_eq!(config.weather.calendar_days, 30);
        assert_eq!(config.calendar.source, "caldav");
        assert_eq!(config.tz(), chrono_tz::Europe::Moscow);
        assert!(config.require_weather().is_ok());
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("QWEATHER_KEY", "secret"),
            ("CONFIG_USER_LOCATION", "here"),
            ("DINGTALK_CALDAV_USER", "bob"),
            ("DINGTALK_CALDAV_PASS", "pw"),
            ("DOT_APP_KEY", ""),
        ]
        .into_iter()
        .collect();
        let config = Config::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.weather.key, "secret");
        assert_eq!(config.calendar.source, "dingtalk");
        assert!(config.device.app_key.is_empty());
        assert!(config.require_calendar().unwrap().is_some());
    }

    #[test]
    fn missing_location_is_config_error() {
        let config = Config::default();
        assert!(matches!(config.require_weather(), Err(Error::Config(_))));
        assert!(matches!(config.require_device(), Err(Error::Config(_))));
        assert!(config.require_calendar().unwrap().is_none());
    }

    #[test]
    fn calendar_without_credentials_is_config_error() {
        let mut config = Config::default();
        config.calendar.source = "dingtalk".to_string();
        assert!(matches!(config.require_calendar(), Err(Error::Config(_))));
    }
}
