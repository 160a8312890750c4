use crate::error::{HubmetaError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub hub: HubConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_error_log")]
    pub error_log: PathBuf,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct HubConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_tasks")]
    pub tasks: Vec<String>,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FetchConfig {
    #[serde(default = "default_git")]
    pub git: String,
    pub work_dir: Option<PathBuf>,
}

// Default value functions
fn default_cache_dir() -> PathBuf {
    PathBuf::from("model_info")
}
fn default_error_log() -> PathBuf {
    PathBuf::from("error.txt")
}
fn default_endpoint() -> String {
    "https://huggingface.co".to_string()
}
fn default_tasks() -> Vec<String> {
    vec![
        "text-generation".to_string(),
        "text2text-generation".to_string(),
    ]
}
fn default_page_size() -> u32 {
    1000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_token_env() -> String {
    "HF_TOKEN".to_string()
}
fn default_git() -> String {
    "git".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: default_cache_dir(),
            error_log: default_error_log(),
        }
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            tasks: default_tasks(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
            token_env: default_token_env(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            work_dir: None,
        }
    }
}

impl Config {
    /// Load config from the default location, or defaults if no file exists
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load config from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HubmetaError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| {
            HubmetaError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;

        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.hub.endpoint.trim().is_empty() {
            return Err(HubmetaError::Config("hub.endpoint must not be empty".to_string()));
        }
        if self.hub.tasks.is_empty() {
            return Err(HubmetaError::Config(
                "hub.tasks must list at least one task".to_string(),
            ));
        }
        if self.hub.page_size == 0 {
            return Err(HubmetaError::Config(
                "hub.page_size must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory the per-model working clones are created in
    #[must_use]
    pub fn work_root(&self) -> PathBuf {
        self.fetch.work_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Default config file location
///
/// `$XDG_CONFIG_HOME/hubmeta/config.toml`, falling back to the platform config dir.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(base.join("hubmeta").join("config.toml"))
}
