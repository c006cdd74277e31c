use std::{collections::HashMap, fs, time::Duration};

use client_core::{ProgressRamp, DEFAULT_PREDICT_URL};

pub const SETTINGS_FILE: &str = "diagnosis.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub predict_url: String,
    pub database_url: String,
    pub upload_tick_ms: u64,
    pub running_tick_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            predict_url: DEFAULT_PREDICT_URL.into(),
            database_url: "sqlite://./data/scans.db".into(),
            upload_tick_ms: 260,
            running_tick_ms: 280,
        }
    }
}

impl Settings {
    pub fn progress_ramp(&self) -> ProgressRamp {
        ProgressRamp {
            uploading_tick: Duration::from_millis(self.upload_tick_ms),
            running_tick: Duration::from_millis(self.running_tick_ms),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());

    settings.database_url = normalize_database_url(&settings.database_url);
    settings
}

fn apply_file(settings: &mut Settings, raw: &str) {
    let Ok(file_cfg) = toml::from_str::<HashMap<String, toml::Value>>(raw) else {
        tracing::warn!("ignoring unreadable {SETTINGS_FILE}");
        return;
    };

    if let Some(v) = file_cfg.get("predict_url").and_then(toml::Value::as_str) {
        settings.predict_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("database_url").and_then(toml::Value::as_str) {
        settings.database_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("upload_tick_ms").and_then(millis_value) {
        settings.upload_tick_ms = v;
    }
    if let Some(v) = file_cfg.get("running_tick_ms").and_then(millis_value) {
        settings.running_tick_ms = v;
    }
}

fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    if let Some(v) = var("PREDICT_URL") {
        settings.predict_url = v;
    }
    if let Some(v) = var("APP__PREDICT_URL") {
        settings.predict_url = v;
    }

    if let Some(v) = var("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = var("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = var("APP__UPLOAD_TICK_MS").as_deref().and_then(parse_millis) {
        settings.upload_tick_ms = v;
    }
    if let Some(v) = var("APP__RUNNING_TICK_MS").as_deref().and_then(parse_millis) {
        settings.running_tick_ms = v;
    }
}

fn parse_millis(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|v| *v > 0)
}

fn millis_value(value: &toml::Value) -> Option<u64> {
    match value {
        toml::Value::Integer(v) if *v > 0 => u64::try_from(*v).ok(),
        toml::Value::String(v) => parse_millis(v),
        _ => None,
    }
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite::memory:")
        || raw_database_url.starts_with("sqlite://")
        || raw_database_url.contains("://")
    {
        return raw_database_url.to_string();
    }

    if let Some(path) = raw_database_url.strip_prefix("sqlite:") {
        let path = path.replace('\\', "/");
        return format!("sqlite://{path}");
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
