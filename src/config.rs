use anyhow::{bail, Context};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,
    /// 0 disables the timeout.
    pub request_timeout_secs: u64,
    pub default_rows_per_page: usize,
    pub rows_per_page_options: Vec<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:3000/api".to_string(),
            api_token: None,
            request_timeout_secs: 30,
            default_rows_per_page: 10,
            rows_per_page_options: vec![5, 10, 25],
        }
    }
}

impl Config {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }

    pub fn rows_per_page(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.default_rows_per_page).unwrap_or(NonZeroUsize::MIN)
    }

    fn validate(&self) -> anyhow::Result<()> {
        url::Url::parse(&self.api_base_url)
            .with_context(|| format!("apiBaseUrl is not a URL: {}", self.api_base_url))?;
        if self.default_rows_per_page == 0 {
            bail!("defaultRowsPerPage must be positive");
        }
        if self.rows_per_page_options.contains(&0) {
            bail!("rowsPerPageOptions must all be positive");
        }
        Ok(())
    }
}

pub fn load() -> anyhow::Result<Config> {
    load_from(|key| std::env::var(key).ok())
}

/// `AGENCYD_CONFIG` (JSON file) first, then the individual env overrides.
pub fn load_from(env: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
    let mut cfg = match env("AGENCYD_CONFIG") {
        Some(path) if !path.trim().is_empty() => read_file(Path::new(path.trim()))?,
        _ => Config::default(),
    };

    if let Some(v) = env("AGENCYD_API_URL") {
        cfg.api_base_url = v.trim().to_string();
    }
    if let Some(v) = env("AGENCYD_API_TOKEN") {
        let v = v.trim().to_string();
        cfg.api_token = if v.is_empty() { None } else { Some(v) };
    }
    if let Some(v) = env("AGENCYD_TIMEOUT_SECS") {
        cfg.request_timeout_secs = v
            .trim()
            .parse()
            .with_context(|| format!("AGENCYD_TIMEOUT_SECS is not a number: {v}"))?;
    }
    if let Some(v) = env("AGENCYD_ROWS_PER_PAGE") {
        cfg.default_rows_per_page = v
            .trim()
            .parse()
            .with_context(|| format!("AGENCYD_ROWS_PER_PAGE is not a number: {v}"))?;
    }

    cfg.validate()?;
    Ok(cfg)
}

fn read_file(path: &Path) -> anyhow::Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}
