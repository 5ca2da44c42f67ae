use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_FILE: &str = ".ptouch_env";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterConfig {
    /// Sleep before each status read; the printer answers asynchronously.
    pub status_poll_interval: Duration,
    pub status_max_attempts: u32,
    /// Extra reads used to flush a stale frame after a bad header.
    pub status_drain_attempts: u32,
    pub usb_timeout: Duration,
    pub cutmark_spacing: u32,
    /// Print with the device's max width when the tape width is unknown.
    pub allow_unknown_tape: bool,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            status_poll_interval: Duration::from_millis(100),
            status_max_attempts: 10,
            status_drain_attempts: 1,
            usb_timeout: Duration::from_secs(5),
            cutmark_spacing: 5,
            allow_unknown_tape: false,
        }
    }
}

impl PrinterConfig {
    /// Build a config from key/value pairs, falling back to defaults for
    /// anything missing.
    pub fn from_entries<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let status_poll_interval = match get("PTOUCH_STATUS_POLL_MS") {
            Some(v) => Duration::from_millis(parse_number("PTOUCH_STATUS_POLL_MS", &v)?),
            None => defaults.status_poll_interval,
        };
        let status_max_attempts = match get("PTOUCH_STATUS_MAX_ATTEMPTS") {
            Some(v) => parse_positive("PTOUCH_STATUS_MAX_ATTEMPTS", &v)?,
            None => defaults.status_max_attempts,
        };
        let status_drain_attempts = match get("PTOUCH_STATUS_DRAIN_ATTEMPTS") {
            Some(v) => parse_number("PTOUCH_STATUS_DRAIN_ATTEMPTS", &v)?,
            None => defaults.status_drain_attempts,
        };
        let usb_timeout = match get("PTOUCH_USB_TIMEOUT_MS") {
            Some(v) => Duration::from_millis(parse_positive("PTOUCH_USB_TIMEOUT_MS", &v)?),
            None => defaults.usb_timeout,
        };
        let cutmark_spacing = match get("PTOUCH_CUTMARK_SPACING") {
            Some(v) => parse_number("PTOUCH_CUTMARK_SPACING", &v)?,
            None => defaults.cutmark_spacing,
        };
        let allow_unknown_tape = match get("PTOUCH_ALLOW_UNKNOWN_TAPE") {
            Some(v) => parse_bool("PTOUCH_ALLOW_UNKNOWN_TAPE", &v)?,
            None => defaults.allow_unknown_tape,
        };

        Ok(Self {
            status_poll_interval,
            status_max_attempts,
            status_drain_attempts,
            usb_timeout,
            cutmark_spacing,
            allow_unknown_tape,
        })
    }
}

/// Load `.ptouch_env` from the working directory if present. Process
/// environment variables override values from the file.
pub fn load_config() -> Result<PrinterConfig, ConfigError> {
    load_config_from(Path::new(ENV_FILE))
}

pub fn load_config_from(env_path: &Path) -> Result<PrinterConfig, ConfigError> {
    let entries: Vec<(String, String)> = if env_path.exists() {
        dotenvy::from_filename_iter(env_path)
            .map_err(|e| ConfigError::Read {
                path: env_path.display().to_string(),
                reason: e.to_string(),
            })?
            .filter_map(|item| item.ok())
            .collect()
    } else {
        tracing::debug!("{} not found, using defaults", env_path.display());
        Vec::new()
    };

    PrinterConfig::from_entries(|key| {
        std::env::var(key).ok().or_else(|| {
            entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        })
    })
}

fn parse_number<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

fn parse_positive<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    let n: T = parse_number(key, value)?;
    if n == T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        });
    }
    Ok(n)
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}
