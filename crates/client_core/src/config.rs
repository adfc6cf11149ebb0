use std::{fs, path::Path};

use serde::Deserialize;
use tracing::warn;
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "eholdings.toml";
pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base_url: String,
    pub okapi_tenant: Option<String>,
    pub okapi_token: Option<String>,
    pub page_size: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8081".into(),
            okapi_tenant: None,
            okapi_token: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ClientSettings {
    pub fn for_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    base_url: Option<String>,
    okapi_tenant: Option<String>,
    okapi_token: Option<String>,
    page_size: Option<u32>,
}

pub fn load_settings() -> ClientSettings {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE), |name| {
        std::env::var(name).ok()
    })
}

/// Defaults, then the TOML file at `path` if present, then environment overrides.
pub fn load_settings_from(
    path: &Path,
    env: impl Fn(&str) -> Option<String>,
) -> ClientSettings {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.base_url {
                    settings.base_url = v;
                }
                if file_cfg.okapi_tenant.is_some() {
                    settings.okapi_tenant = file_cfg.okapi_tenant;
                }
                if file_cfg.okapi_token.is_some() {
                    settings.okapi_token = file_cfg.okapi_token;
                }
                if let Some(v) = file_cfg.page_size {
                    settings.page_size = v;
                }
            }
            Err(error) => {
                warn!(path = %path.display(), %error, "ignoring unreadable settings file");
            }
        }
    }

    if let Some(v) = env("EHOLDINGS_URL") {
        settings.base_url = v;
    }
    if let Some(v) = env("APP__BASE_URL") {
        settings.base_url = v;
    }

    if let Some(v) = env("OKAPI_TENANT") {
        settings.okapi_tenant = Some(v);
    }
    if let Some(v) = env("APP__OKAPI_TENANT") {
        settings.okapi_tenant = Some(v);
    }

    if let Some(v) = env("APP__OKAPI_TOKEN") {
        settings.okapi_token = Some(v);
    }

    if let Some(v) = env("APP__PAGE_SIZE") {
        match v.parse::<u32>() {
            Ok(parsed) if parsed > 0 => settings.page_size = parsed,
            _ => warn!(value = %v, "ignoring invalid APP__PAGE_SIZE"),
        }
    }

    settings
}

/// Parses the base url, forcing a trailing slash so relative joins keep any path prefix.
pub fn normalize_base_url(raw: &str) -> Result<Url, url::ParseError> {
    let trimmed = raw.trim();
    if trimmed.ends_with('/') {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("{trimmed}/"))
    }
}
