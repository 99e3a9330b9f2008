//! Server configuration, loadable from TOML with environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, bail};
use nq_snmp::{ClientConfig, SnmpVersion};
use serde::Deserialize;

use crate::cache::CacheConfig;
use crate::inference::LlmConfig;

/// Used when neither a CLI argument nor `NQ_CONFIG` names a file.
pub const DEFAULT_CONFIG_PATH: &str = "./configs/config.toml";

/// Top-level server configuration. Every table and field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub snmp: SnmpConfig,
    #[serde(default)]
    pub mib: MibConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Listen address (e.g., "0.0.0.0").
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_api_port(),
        }
    }
}

/// Device client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SnmpConfig {
    /// "1" or "2c".
    #[serde(default)]
    pub version: SnmpVersion,
    #[serde(default = "default_community")]
    pub community: String,
    /// Agent port when the target carries none.
    #[serde(default = "default_snmp_port")]
    pub port: u16,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_max_repetitions")]
    pub max_repetitions: u32,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
}

fn default_community() -> String {
    "public".into()
}
fn default_snmp_port() -> u16 {
    nq_snmp::types::DEFAULT_PORT
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_retries() -> u32 {
    3
}
fn default_max_repetitions() -> u32 {
    10
}
fn default_pool_size() -> usize {
    16
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            version: SnmpVersion::default(),
            community: default_community(),
            port: default_snmp_port(),
            timeout_secs: default_timeout_secs(),
            retries: default_retries(),
            max_repetitions: default_max_repetitions(),
            pool_size: default_pool_size(),
        }
    }
}

impl SnmpConfig {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            version: self.version,
            community: self.community.clone(),
            port: self.port,
            timeout: Duration::from_secs(self.timeout_secs),
            retries: self.retries,
            max_repetitions: self.max_repetitions,
            pool_size: self.pool_size,
        }
    }
}

/// Schema repository settings.
#[derive(Debug, Clone, Deserialize)]
pub struct MibConfig {
    /// Directory holding `<MODULE>.mib` / `<MODULE>.txt` files.
    #[serde(default = "default_repository_path")]
    pub repository_path: PathBuf,
    /// Modules loaded at startup. `["*"]` loads every available module.
    #[serde(default)]
    pub preload: Vec<String>,
}

fn default_repository_path() -> PathBuf {
    PathBuf::from("./configs/mibs")
}

impl Default for MibConfig {
    fn default() -> Self {
        Self {
            repository_path: default_repository_path(),
            preload: Vec::new(),
        }
    }
}

impl MibConfig {
    pub fn preload_all(&self) -> bool {
        self.preload.iter().any(|name| name == "*")
    }
}

impl ServerConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Like `from_file`, but a missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(path)
    }

    /// Resolve the config file, load it, then apply environment overrides.
    pub fn from_env() -> anyhow::Result<Self> {
        let path = config_path(std::env::args().nth(1), std::env::var("NQ_CONFIG").ok());
        let mut config = Self::load(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `LLM_API_KEY`, `MIB_REPOSITORY_PATH`, `SNMP_COMMUNITY` and
    /// `NQ_PORT` from `lookup`. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(key) = get("LLM_API_KEY") {
            self.llm.api_key = key;
        }
        if let Some(path) = get("MIB_REPOSITORY_PATH") {
            self.mib.repository_path = PathBuf::from(path);
        }
        if let Some(community) = get("SNMP_COMMUNITY") {
            self.snmp.community = community;
        }
        if let Some(port) = get("NQ_PORT") {
            self.api.port = port
                .parse()
                .with_context(|| format!("NQ_PORT '{port}' is not a valid port"))?;
        }
        Ok(())
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.snmp.max_repetitions == 0 {
            bail!("snmp.max_repetitions must be at least 1");
        }
        if self.snmp.timeout_secs == 0 {
            bail!("snmp.timeout_secs must be at least 1");
        }
        Ok(())
    }
}

/// First CLI argument, else `NQ_CONFIG`, else [`DEFAULT_CONFIG_PATH`].
pub fn config_path(arg: Option<String>, env: Option<String>) -> PathBuf {
    arg.or(env)
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
