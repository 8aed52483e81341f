// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const APP_NAME: &str = "rollcall";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_PAGE_SIZE: i64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub export: Export,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
            logging: Logging::default(),
            export: Export::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub token: Option<String>,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_TIMEOUT.to_owned()),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub user_type: Option<String>,
    pub page_size: Option<i64>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            user_type: None,
            page_size: Some(DEFAULT_PAGE_SIZE),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Logging {
    pub level: Option<String>,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Export {
    pub directory: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("ROLLCALL_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set ROLLCALL_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and move values under [api], [ui], [logging], and [export]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Regenerate a template with `rollcall --print-example-config`",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let base_url = self.base_url();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!(
                "api.base_url in {} must start with http:// or https://, got {:?}",
                path.display(),
                base_url
            );
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)
                .with_context(|| format!("api.timeout in {}", path.display()))?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(page_size) = self.ui.page_size
            && page_size <= 0
        {
            bail!(
                "ui.page_size in {} must be positive, got {}",
                path.display(),
                page_size
            );
        }

        if let Some(level) = &self.logging.level
            && let Err(error) = EnvFilter::try_new(level)
        {
            bail!(
                "logging.level in {} is not a valid filter ({error}); use a level such as \"info\" or \"rollcall_api=debug\"",
                path.display()
            );
        }

        if let Some(file) = &self.logging.file
            && file.trim().is_empty()
        {
            bail!(
                "logging.file in {} must not be blank; remove the key to use the default",
                path.display()
            );
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .map(str::trim)
            .unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    /// Blank tokens count as unset.
    pub fn token(&self) -> Option<String> {
        self.api
            .token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
    }

    pub fn user_type(&self) -> Option<&str> {
        self.ui.user_type.as_deref()
    }

    pub fn page_size(&self) -> usize {
        self.ui
            .page_size
            .and_then(|size| usize::try_from(size).ok())
            .unwrap_or(DEFAULT_PAGE_SIZE as usize)
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.logging.file {
            return Ok(PathBuf::from(file));
        }
        let root = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| {
                anyhow!("cannot resolve a log directory; set [logging].file to a writable path")
            })?;
        Ok(root.join(APP_NAME).join(format!("{APP_NAME}.log")))
    }

    pub fn export_directory(&self) -> PathBuf {
        self.export
            .directory
            .as_deref()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# rollcall config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\ntimeout = \"{}\"\n# Sent as `Authorization: Bearer <token>`.\n# token = \"\"\n\n[ui]\n# Role id of the signed-in user; 3 and 4 may delete registrations.\n# user_type = \"1\"\npage_size = {}\n\n[logging]\nlevel = \"{}\"\n# Optional. Default is the platform state dir (for example ~/.local/state/rollcall/rollcall.log)\n# file = \"/absolute/path/to/rollcall.log\"\n\n[export]\n# directory = \"/absolute/path/to/exports\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_TIMEOUT,
            DEFAULT_PAGE_SIZE,
            DEFAULT_LOG_LEVEL,
        )
    }
}

const DURATION_FORMS: &str = "use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)";

fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let amount = |value: &str| -> Result<u64> {
        value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}; {DURATION_FORMS}"))
    };
    if let Some(value) = raw.strip_suffix("ms") {
        return Ok(Duration::from_millis(amount(value)?));
    }
    if let Some(value) = raw.strip_suffix('s') {
        return Ok(Duration::from_secs(amount(value)?));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let secs = amount(value)?
            .checked_mul(60)
            .ok_or_else(|| anyhow!("duration {raw:?} is too large; {DURATION_FORMS}"))?;
        return Ok(Duration::from_secs(secs));
    }

    bail!("invalid duration {raw:?}; {DURATION_FORMS}")
}
