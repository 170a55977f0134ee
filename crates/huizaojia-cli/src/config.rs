// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use huizaojia_app::find_menu;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;

pub const APP_NAME: &str = "huizaojia";
const CONFIG_VERSION: i64 = 1;
const CONFIG_PATH_ENV: &str = "HUIZAOJIA_CONFIG_PATH";
const DEFAULT_LLM_BASE_URL: &str = "http://localhost:11434/v1";
const DEFAULT_LLM_MODEL: &str = "qwen3";
const DEFAULT_API_KEY_ENV: &str = "HUIZAOJIA_API_KEY";
const DEFAULT_ANALYSIS_DELAY: &str = "2s";
const DEFAULT_LLM_TIMEOUT: &str = "30s";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub llm: Llm,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            ui: Ui::default(),
            llm: Llm::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub default_view: Option<String>,
    pub analysis_delay: Option<String>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            default_view: Some("home".to_owned()),
            analysis_delay: Some(DEFAULT_ANALYSIS_DELAY.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Llm {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<String>,
    pub temperature: Option<f32>,
    pub api_key_env: Option<String>,
}

impl Default for Llm {
    fn default() -> Self {
        Self {
            enabled: Some(true),
            base_url: Some(DEFAULT_LLM_BASE_URL.to_owned()),
            model: Some(DEFAULT_LLM_MODEL.to_owned()),
            timeout: Some(DEFAULT_LLM_TIMEOUT.to_owned()),
            temperature: Some(huizaojia_llm::DEFAULT_TEMPERATURE),
            api_key_env: Some(DEFAULT_API_KEY_ENV.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub enabled: Option<bool>,
    pub level: Option<String>,
    pub path: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            enabled: Some(true),
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            path: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
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
                    "config file {} has no version. Add `version = 1` at the top and keep settings under [ui], [llm], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Regenerate a template with --print-example-config",
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
        if let Some(view) = &self.ui.default_view {
            parse_view(view)
                .with_context(|| format!("ui.default_view in {}", path.display()))?;
        }

        if let Some(delay) = &self.ui.analysis_delay {
            parse_duration(delay)
                .with_context(|| format!("ui.analysis_delay in {}", path.display()))?;
        }

        if let Some(timeout) = &self.llm.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "llm.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(temperature) = self.llm.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            bail!(
                "llm.temperature in {} must be between 0 and 2, got {}",
                path.display(),
                temperature
            );
        }

        if let Some(name) = &self.llm.api_key_env
            && name.trim().is_empty()
        {
            bail!(
                "llm.api_key_env in {} must name an environment variable",
                path.display()
            );
        }

        if let Some(level) = &self.log.level {
            parse_log_level(level)
                .with_context(|| format!("log.level in {}", path.display()))?;
        }

        Ok(())
    }

    /// The `(active_id, active_sub_id)` pair the TUI opens on.
    pub fn default_view(&self) -> Result<(String, String)> {
        parse_view(self.ui.default_view.as_deref().unwrap_or("home"))
    }

    pub fn analysis_delay(&self) -> Result<Duration> {
        parse_duration(
            self.ui
                .analysis_delay
                .as_deref()
                .unwrap_or(DEFAULT_ANALYSIS_DELAY),
        )
    }

    pub fn llm_enabled(&self) -> bool {
        self.llm.enabled.unwrap_or(true)
    }

    pub fn llm_base_url(&self) -> &str {
        self.llm
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_LLM_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn llm_model(&self) -> &str {
        self.llm.model.as_deref().unwrap_or(DEFAULT_LLM_MODEL)
    }

    pub fn llm_timeout(&self) -> Result<Duration> {
        parse_duration(self.llm.timeout.as_deref().unwrap_or(DEFAULT_LLM_TIMEOUT))
    }

    pub fn llm_temperature(&self) -> f32 {
        self.llm
            .temperature
            .unwrap_or(huizaojia_llm::DEFAULT_TEMPERATURE)
    }

    pub fn llm_api_key_env(&self) -> &str {
        self.llm
            .api_key_env
            .as_deref()
            .unwrap_or(DEFAULT_API_KEY_ENV)
    }

    /// Reads the bearer token from the configured variable. Unset or empty
    /// means no token.
    pub fn llm_api_key(&self) -> Option<String> {
        env::var(self.llm_api_key_env())
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn log_enabled(&self) -> bool {
        self.log.enabled.unwrap_or(true)
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        parse_log_level(self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL))
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_local_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].path to a log file")
        })?;
        Ok(data_root.join(APP_NAME).join(format!("{APP_NAME}.log")))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# huizaojia config\n# Place this file at: {}\n\nversion = 1\n\n[ui]\n# Start view as <menu id> or <menu id>/<sub id>, for example general/ok-tax-calc\ndefault_view = \"home\"\n# Simulated duration of list identification\nanalysis_delay = \"{}\"\n\n[llm]\nenabled = true\nbase_url = \"{}\"\nmodel = \"{}\"\ntimeout = \"{}\"\ntemperature = {}\n# Environment variable holding the bearer token, if the endpoint needs one\napi_key_env = \"{}\"\n\n[log]\nenabled = true\nlevel = \"{}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/huizaojia/huizaojia.log)\n# path = \"/absolute/path/to/huizaojia.log\"\n",
            path.display(),
            DEFAULT_ANALYSIS_DELAY,
            DEFAULT_LLM_BASE_URL,
            DEFAULT_LLM_MODEL,
            DEFAULT_LLM_TIMEOUT,
            huizaojia_llm::DEFAULT_TEMPERATURE,
            DEFAULT_API_KEY_ENV,
            DEFAULT_LOG_LEVEL,
        )
    }
}

/// Splits `<id>` or `<id>/<sub id>` and checks both against the navigation
/// menu.
pub fn parse_view(raw: &str) -> Result<(String, String)> {
    let raw = raw.trim();
    let (id, sub_id) = raw.split_once('/').unwrap_or((raw, ""));
    let Some(menu) = find_menu(id) else {
        let known: Vec<_> = huizaojia_app::NAVIGATION_MENU
            .iter()
            .map(|menu| menu.id)
            .collect();
        bail!(
            "unknown view {id:?}; use one of: {}",
            known.join(", ")
        );
    };
    if sub_id.is_empty() {
        return Ok((id.to_owned(), String::new()));
    }
    if !menu.children.iter().any(|sub| sub.id == sub_id) {
        let known: Vec<_> = menu.children.iter().map(|sub| sub.id).collect();
        if known.is_empty() {
            bail!("view {id:?} has no sub views, got {sub_id:?}");
        }
        bail!(
            "unknown sub view {sub_id:?} under {id:?}; use one of: {}",
            known.join(", ")
        );
    }
    Ok((id.to_owned(), sub_id.to_owned()))
}

fn parse_log_level(raw: &str) -> Result<LevelFilter> {
    raw.trim().parse::<LevelFilter>().map_err(|_| {
        anyhow!("invalid log level {raw:?}; use one of: off, error, warn, info, debug, trace")
    })
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 2s)")
}
