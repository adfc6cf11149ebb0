use std::{fs, path::Path};

use serde::Deserialize;
use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "mock_server.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_bind: String,
    /// `None` serves the built-in demo data.
    pub fixtures_path: Option<String>,
    pub response_delay_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8081".into(),
            fixtures_path: None,
            response_delay_ms: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    bind_addr: Option<String>,
    fixtures_path: Option<String>,
    response_delay_ms: Option<u64>,
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |name| {
        std::env::var(name).ok()
    })
}

pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.bind_addr {
                    settings.server_bind = v;
                }
                if let Some(v) = file_cfg.fixtures_path {
                    settings.fixtures_path = Some(v);
                }
                if let Some(v) = file_cfg.response_delay_ms {
                    settings.response_delay_ms = v;
                }
            }
            Err(error) => warn!(path = %path.display(), %error, "ignoring unreadable settings file"),
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.server_bind = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.server_bind = v;
    }

    if let Some(v) = env("APP__FIXTURES_PATH") {
        settings.fixtures_path = Some(v).filter(|path| !path.trim().is_empty());
    }

    if let Some(v) = env("APP__RESPONSE_DELAY_MS") {
        match v.parse::<u64>() {
            Ok(parsed) => settings.response_delay_ms = parsed,
            Err(_) => warn!(value = %v, "APP__RESPONSE_DELAY_MS is not a number"),
        }
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
