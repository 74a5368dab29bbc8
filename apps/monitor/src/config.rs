use std::{fmt, fs, path::Path, time::Duration};

use anyhow::{bail, Context};
use monitor_core::{
    job_log::DEFAULT_LOG_BUS_CAPACITY, job_result::DEFAULT_RESULT_BUS_CAPACITY,
    job_status::DEFAULT_STATUS_BUS_CAPACITY, BlocSettings, MonitorSettings,
};
use serde::Deserialize;
use storage::StorageOptions;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(rename = "pgURL")]
    pub pg_url: String,
    #[serde(rename = "pgUsername")]
    pub pg_username: String,
    #[serde(rename = "pgPassword")]
    pub pg_password: String,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default, rename = "showSQL")]
    pub show_sql: bool,
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,
    #[serde(default = "default_cycle_timeout_seconds")]
    pub cycle_timeout_seconds: u64,
    #[serde(default = "default_failure_cooldown_seconds")]
    pub failure_cooldown_seconds: u64,
    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: u32,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Overrides every bus capacity when present.
    #[serde(default)]
    pub bus_capacity: Option<usize>,
}

fn default_schema() -> String {
    "ketl".into()
}

fn default_refresh_seconds() -> u64 {
    60
}

fn default_cycle_timeout_seconds() -> u64 {
    60
}

fn default_failure_cooldown_seconds() -> u64 {
    10
}

fn default_max_log_entries() -> u32 {
    1000
}

fn default_max_connections() -> u32 {
    5
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("pg_url", &redact_url(&self.pg_url))
            .field("pg_username", &self.pg_username)
            .field("pg_password", &"<redacted>")
            .field("schema", &self.schema)
            .field("show_sql", &self.show_sql)
            .field("refresh_seconds", &self.refresh_seconds)
            .field("cycle_timeout_seconds", &self.cycle_timeout_seconds)
            .field("failure_cooldown_seconds", &self.failure_cooldown_seconds)
            .field("max_log_entries", &self.max_log_entries)
            .field("max_connections", &self.max_connections)
            .field("bus_capacity", &self.bus_capacity)
            .finish()
    }
}

/// Hides any `user:password@` part of a connection url.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let authority_end = rest.find(|c: char| c == '/' || c == '?').unwrap_or(rest.len());
    match rest[..authority_end].rfind('@') {
        Some(at) => format!("{scheme}://<redacted>@{}", &rest[at + 1..]),
        None => url.to_string(),
    }
}

impl Settings {
    pub fn to_storage_options(&self) -> StorageOptions {
        StorageOptions {
            database_url: self.pg_url.clone(),
            username: self.pg_username.clone(),
            password: self.pg_password.clone(),
            schema: self.schema.clone(),
            max_connections: self.max_connections,
            show_sql: self.show_sql,
        }
    }

    pub fn to_monitor_settings(&self) -> MonitorSettings {
        MonitorSettings {
            refresh_period: Duration::from_secs(self.refresh_seconds),
            bloc: BlocSettings {
                cycle_timeout: Duration::from_secs(self.cycle_timeout_seconds),
                failure_cooldown: Duration::from_secs(self.failure_cooldown_seconds),
            },
            max_log_entries: self.max_log_entries,
            result_bus_capacity: self.bus_capacity.unwrap_or(DEFAULT_RESULT_BUS_CAPACITY),
            status_bus_capacity: self.bus_capacity.unwrap_or(DEFAULT_STATUS_BUS_CAPACITY),
            log_bus_capacity: self.bus_capacity.unwrap_or(DEFAULT_LOG_BUS_CAPACITY),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.pg_url.trim().is_empty() {
            bail!("pgURL must not be empty");
        }
        if self.refresh_seconds == 0 {
            bail!("refreshSeconds must be at least 1");
        }
        if self.cycle_timeout_seconds == 0 {
            bail!("cycleTimeoutSeconds must be at least 1");
        }
        if self.max_log_entries == 0 {
            bail!("maxLogEntries must be at least 1");
        }
        Ok(())
    }
}

/// Reads `path`, applies `APP__*` environment overrides and validates.
pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file '{}'", path.display()))?;
    let mut settings = parse_settings(&raw)
        .with_context(|| format!("invalid config file '{}'", path.display()))?;
    apply_env_overrides(&mut settings, |key| std::env::var(key).ok());
    settings.validate()?;
    Ok(settings)
}

fn parse_settings(raw: &str) -> anyhow::Result<Settings> {
    Ok(serde_json::from_str(raw)?)
}

fn apply_env_overrides(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("APP__PG_URL") {
        settings.pg_url = v;
    }
    if let Some(v) = var("APP__PG_USERNAME") {
        settings.pg_username = v;
    }
    if let Some(v) = var("APP__PG_PASSWORD") {
        settings.pg_password = v;
    }
    if let Some(v) = var("APP__SCHEMA") {
        settings.schema = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
