use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MigrateError, Result};

pub const DEFAULT_LOCAL_ENDPOINT: &str = "http://localhost:9200";
pub const PROJECT_CONFIG_FILE: &str = "esmig.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,
}

impl Config {
    /// Load configuration layered as: defaults, global file, project file
    /// (or a single explicit file), then `ESMIG_*` environment overrides.
    pub fn load(explicit_path: Option<&Path>, project_dir: &Path) -> Result<Self> {
        let mut config = Self::default();

        let explicit = explicit_path
            .map(PathBuf::from)
            .or_else(|| std::env::var("ESMIG_CONFIG").ok().map(PathBuf::from));

        if let Some(path) = explicit {
            let patch = Self::load_patch(&path)?.ok_or_else(|| {
                MigrateError::MissingConfig(format!("config file {} not found", path.display()))
            })?;
            config.merge_patch(patch);
        } else {
            if let Some(global) = Self::load_global()? {
                config.merge_patch(global);
            }
            if let Some(project) = Self::load_patch(&project_dir.join(PROJECT_CONFIG_FILE))? {
                config.merge_patch(project);
            }
        }

        config.apply_env_overrides()?;

        Ok(config)
    }

    fn load_global() -> Result<Option<ConfigPatch>> {
        let Some(dir) = dirs::config_dir() else {
            return Ok(None);
        };
        Self::load_patch(&dir.join("esmig/config.toml"))
    }

    fn load_patch(path: &Path) -> Result<Option<ConfigPatch>> {
        if !path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(path)
            .map_err(|err| MigrateError::Config(format!("read config {}: {err}", path.display())))?;
        let patch = toml::from_str(&raw)
            .map_err(|err| MigrateError::Config(format!("parse config {}: {err}", path.display())))?;
        Ok(Some(patch))
    }

    fn merge_patch(&mut self, patch: ConfigPatch) {
        if let Some(patch) = patch.elasticsearch {
            self.elasticsearch.merge(patch);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        let es = &mut self.elasticsearch;

        if let Some(value) = env_string("ESMIG_CLOUD_ID") {
            es.cloud_id = Some(value);
        }
        if let Some(values) = env_list("ESMIG_HOSTS") {
            es.hosts = values;
        }
        if let Some(value) = env_string("ESMIG_USERNAME") {
            es.username = Some(value);
        }
        if let Some(value) = env_string("ESMIG_PASSWORD") {
            es.password = Some(value);
        }
        if let Some(value) = env_string("ESMIG_LOCAL_ENDPOINT") {
            es.local_endpoint = value;
        }
        if let Some(value) = env_u64("ESMIG_REQUEST_TIMEOUT_SECS")? {
            es.request_timeout_secs = value;
        }
        if let Some(value) = env_u64("ESMIG_REINDEX_TIMEOUT_SECS")? {
            es.reindex_timeout_secs = value;
        }
        if let Some(value) = env_bool("ESMIG_PROMPT") {
            es.prompt_for_credentials = value;
        }

        Ok(())
    }
}

/// Connection parameters for the search engine.
#[derive(Clone, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
    /// Elastic Cloud id; takes precedence over `hosts`.
    #[serde(default)]
    pub cloud_id: Option<String>,
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default = "default_local_endpoint")]
    pub local_endpoint: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// 0 waits for the reindex call indefinitely.
    #[serde(default)]
    pub reindex_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub prompt_for_credentials: bool,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            cloud_id: None,
            hosts: Vec::new(),
            username: None,
            password: None,
            local_endpoint: default_local_endpoint(),
            request_timeout_secs: default_request_timeout(),
            reindex_timeout_secs: 0,
            prompt_for_credentials: true,
        }
    }
}

impl fmt::Debug for ElasticsearchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElasticsearchConfig")
            .field("cloud_id", &self.cloud_id)
            .field("hosts", &self.hosts)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("local_endpoint", &self.local_endpoint)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("reindex_timeout_secs", &self.reindex_timeout_secs)
            .field("prompt_for_credentials", &self.prompt_for_credentials)
            .finish()
    }
}

impl ElasticsearchConfig {
    fn merge(&mut self, patch: ElasticsearchPatch) {
        if let Some(value) = patch.cloud_id {
            self.cloud_id = Some(value);
        }
        if let Some(values) = patch.hosts {
            self.hosts = values;
        }
        if let Some(value) = patch.username {
            self.username = Some(value);
        }
        if let Some(value) = patch.password {
            self.password = Some(value);
        }
        if let Some(value) = patch.local_endpoint {
            self.local_endpoint = value;
        }
        if let Some(value) = patch.request_timeout_secs {
            self.request_timeout_secs = value;
        }
        if let Some(value) = patch.reindex_timeout_secs {
            self.reindex_timeout_secs = value;
        }
        if let Some(value) = patch.prompt_for_credentials {
            self.prompt_for_credentials = value;
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigPatch {
    pub elasticsearch: Option<ElasticsearchPatch>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ElasticsearchPatch {
    pub cloud_id: Option<String>,
    pub hosts: Option<Vec<String>>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub local_endpoint: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub reindex_timeout_secs: Option<u64>,
    pub prompt_for_credentials: Option<bool>,
}

fn default_local_endpoint() -> String {
    DEFAULT_LOCAL_ENDPOINT.to_string()
}

const fn default_request_timeout() -> u64 {
    30
}

const fn default_true() -> bool {
    true
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|value| matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn env_u64(key: &str) -> Result<Option<u64>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| MigrateError::Config(format!("invalid {key} value {value}: {err}"))),
        Err(_) => Ok(None),
    }
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(ToString::to_string)
            .collect()
    })
}
