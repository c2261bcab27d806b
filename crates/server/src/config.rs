use std::{fmt, fs, io, path::Path, time::Duration};

use anyhow::Context;
use chrono::FixedOffset;
use relay::{notification::NotificationSettings, telegram};
use serde::Deserialize;
use tracing::warn;

const DEFAULT_CONFIG_FILE: &str = "relay.toml";
const RESERVED_PATHS: &[&str] = &["/healthz"];

pub struct Settings {
    pub server_bind: String,
    pub relay_path: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_base: String,
    pub telegram_timeout_ms: u64,
    pub utc_offset_minutes: i32,
    pub source_label: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            relay_path: "/api/telegram".into(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            telegram_api_base: telegram::DEFAULT_API_BASE.into(),
            telegram_timeout_ms: telegram::DEFAULT_TIMEOUT.as_millis() as u64,
            utc_offset_minutes: 180,
            source_label: "Основной сайт".into(),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("server_bind", &self.server_bind)
            .field("relay_path", &self.relay_path)
            .field(
                "telegram_bot_token",
                &self.telegram_bot_token.as_ref().map(|_| "<redacted>"),
            )
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("telegram_api_base", &self.telegram_api_base)
            .field("telegram_timeout_ms", &self.telegram_timeout_ms)
            .field("utc_offset_minutes", &self.utc_offset_minutes)
            .field("source_label", &self.source_label)
            .finish()
    }
}

impl Settings {
    pub fn telegram_timeout(&self) -> Duration {
        Duration::from_millis(self.telegram_timeout_ms)
    }

    pub fn notification_settings(&self) -> anyhow::Result<NotificationSettings> {
        let utc_offset = FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .with_context(|| {
                format!("utc offset of {} minutes is out of range", self.utc_offset_minutes)
            })?;
        Ok(NotificationSettings {
            utc_offset,
            source_label: self.source_label.clone(),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    bind_addr: Option<String>,
    relay_path: Option<String>,
    telegram_bot_token: Option<String>,
    telegram_chat_id: Option<String>,
    telegram_api_base: Option<String>,
    telegram_timeout_ms: Option<u64>,
    utc_offset_minutes: Option<i32>,
    source_label: Option<String>,
}

/// Defaults, then `relay.toml` (or the explicit `config_path`), then the environment.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    let path = config_path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
    match fs::read_to_string(path) {
        Ok(raw) => apply_file(&mut settings, &raw)
            .with_context(|| format!("invalid config file '{}'", path.display()))?,
        Err(e) if e.kind() == io::ErrorKind::NotFound && config_path.is_none() => {}
        Err(e) => {
            return Err(e)
                .with_context(|| format!("failed to read config file '{}'", path.display()))
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    check_settings(&mut settings)?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileSettings = toml::from_str(raw)?;

    if let Some(v) = file_cfg.bind_addr {
        settings.server_bind = v;
    }
    if let Some(v) = file_cfg.relay_path {
        settings.relay_path = v;
    }
    if let Some(v) = file_cfg.telegram_bot_token {
        settings.telegram_bot_token = Some(v);
    }
    if let Some(v) = file_cfg.telegram_chat_id {
        settings.telegram_chat_id = Some(v);
    }
    if let Some(v) = file_cfg.telegram_api_base {
        settings.telegram_api_base = v;
    }
    if let Some(v) = file_cfg.telegram_timeout_ms {
        settings.telegram_timeout_ms = v;
    }
    if let Some(v) = file_cfg.utc_offset_minutes {
        settings.utc_offset_minutes = v;
    }
    if let Some(v) = file_cfg.source_label {
        settings.source_label = v;
    }
    Ok(())
}

// `APP__*` keys are read last so they win over the bare names.
fn apply_env(settings: &mut Settings, var: impl Fn(&str) -> Option<String>) {
    for key in ["SERVER_BIND", "APP__BIND_ADDR"] {
        if let Some(v) = var(key) {
            settings.server_bind = v;
        }
    }
    if let Some(v) = var("APP__RELAY_PATH") {
        settings.relay_path = v;
    }
    for key in ["TELEGRAM_BOT_TOKEN", "APP__TELEGRAM_BOT_TOKEN"] {
        if let Some(v) = var(key) {
            settings.telegram_bot_token = Some(v);
        }
    }
    for key in ["TELEGRAM_CHAT_ID", "APP__TELEGRAM_CHAT_ID"] {
        if let Some(v) = var(key) {
            settings.telegram_chat_id = Some(v);
        }
    }
    if let Some(v) = var("APP__TELEGRAM_API_BASE") {
        settings.telegram_api_base = v;
    }
    if let Some(v) = var("APP__TELEGRAM_TIMEOUT_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.telegram_timeout_ms = parsed,
            Err(error) => warn!(value = %v, %error, "ignoring unparsable APP__TELEGRAM_TIMEOUT_MS"),
        }
    }
    if let Some(v) = var("APP__UTC_OFFSET_MINUTES") {
        match v.parse::<i32>() {
            Ok(parsed) => settings.utc_offset_minutes = parsed,
            Err(error) => warn!(value = %v, %error, "ignoring unparsable APP__UTC_OFFSET_MINUTES"),
        }
    }
    if let Some(v) = var("APP__SOURCE_LABEL") {
        settings.source_label = v;
    }
}

fn check_settings(settings: &mut Settings) -> anyhow::Result<()> {
    if settings.telegram_timeout_ms == 0 {
        anyhow::bail!("telegram_timeout_ms must be greater than zero");
    }
    settings.relay_path = normalize_relay_path(&settings.relay_path)?;
    Ok(())
}

/// The relay path is mounted as a literal route, so it may not shadow another
/// route or contain router parameter syntax.
fn normalize_relay_path(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(Settings::default().relay_path);
    }
    let path = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };

    if let Some(bad) = path
        .chars()
        .find(|c| matches!(c, ':' | '*' | '{' | '}' | '?' | '#') || c.is_whitespace())
    {
        anyhow::bail!("relay path '{path}' must not contain '{bad}'");
    }
    if path.contains("//") {
        anyhow::bail!("relay path '{path}' contains an empty segment");
    }
    if RESERVED_PATHS.contains(&path.as_str()) {
        anyhow::bail!("relay path '{path}' is reserved");
    }
    Ok(path)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
