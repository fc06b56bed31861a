use anyhow::{Context, Result, anyhow};
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::provider::{DEFAULT_API_BASE_URL, MAX_PAGE_SIZE, clamp_page_size};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/tubemeta-env";
pub const DEFAULT_CACHE_DIR: &str = ".tubemeta-cache";
pub const API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub api_key: Option<String>,
    pub api_base_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub cache_dir: PathBuf,
    pub page_size: u32,
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "API_KEY" => cfg.api_key = Some(value.to_string()),
                "API_BASE_URL" => cfg.api_base_url = Some(value.to_string()),
                "CACHE_DIR" => cfg.cache_dir = Some(PathBuf::from(value)),
                "PAGE_SIZE" => {
                    let size: u32 = value
                        .parse()
                        .with_context(|| format!("Parsing PAGE_SIZE from {}", path.display()))?;
                    cfg.page_size = Some(size);
                }
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}

pub fn load_runtime_config() -> Result<RuntimeConfig> {
    load_runtime_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

pub fn load_runtime_config_from(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    resolve(path.as_ref(), env::var(API_KEY_ENV).ok())
}

impl RuntimeConfig {
    /// The API key, which only live lookups need.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            anyhow!("API_KEY not set in the config file or the {API_KEY_ENV} environment variable")
        })
    }
}

/// Merges the file (if any) with the key taken from the environment. The
/// file wins when both define a key.
fn resolve(path: &Path, env_api_key: Option<String>) -> Result<RuntimeConfig> {
    let cfg = read_env_config(path)?.unwrap_or_default();
    let api_key = cfg.api_key.or(env_api_key.filter(|key| !key.is_empty()));
    let api_base_url = cfg
        .api_base_url
        .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
    let cache_dir = cfg
        .cache_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
    let page_size = clamp_page_size(cfg.page_size.unwrap_or(MAX_PAGE_SIZE));
    Ok(RuntimeConfig {
        api_key,
        api_base_url,
        cache_dir,
        page_size,
    })
}
