use anyhow::anyhow;
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "DETA_";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppMeta,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppMeta {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_root_path")]
    pub root_path: String,
    #[serde(default = "default_true")]
    pub debug_mode: bool,
    #[serde(default)]
    pub log_format: LogFormat,
}

impl Default for AppMeta {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: default_description(),
            version: default_version(),
            root_path: default_root_path(),
            debug_mode: true,
            log_format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub worker_threads: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 8080, worker_threads: Some(4) }
    }
}

/// Which document store implementation backs the repositories.
#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Deta,
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Base (namespace) name used for features.
    #[serde(default = "default_db_name")]
    pub db_name: String,
    /// Upper bound on the page size of a single fetch request.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: usize,
    #[serde(default)]
    pub project_key: Option<String>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_data_path")]
    pub data_path: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            db_name: default_db_name(),
            fetch_limit: default_fetch_limit(),
            project_key: None,
            endpoint: default_endpoint(),
            data_path: default_data_path(),
            request_timeout_secs: None,
        }
    }
}

/// Operating environment, derived from the runtime rather than configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpEnviron {
    Dev,
    Staging,
    Production,
}

impl OpEnviron {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpEnviron::Dev => "dev",
            OpEnviron::Staging => "staging",
            OpEnviron::Production => "production",
        }
    }
}

fn default_title() -> String { "Carto".into() }
fn default_description() -> String { "Save your favorite places".into() }
fn default_version() -> String { "0.0.1".into() }
fn default_root_path() -> String { "/api/v1".into() }
fn default_true() -> bool { true }
fn default_db_name() -> String { "features".into() }
fn default_fetch_limit() -> usize { 25 }
fn default_endpoint() -> String { "https://database.deta.sh/v1".into() }
fn default_data_path() -> String { "data/features.json".into() }

/// Load the TOML file named by `CONFIG_PATH` (default `config.toml`).
/// A missing file yields the built-in defaults.
pub fn load_default() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
    load_optional(&path)
}

fn load_optional(path: &str) -> Result<AppConfig> {
    if Path::new(path).exists() {
        load_from_file(path)
    } else {
        Ok(AppConfig::default())
    }
}

pub fn load_from_file(path: &str) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    parse(&content)
}

pub fn parse(content: &str) -> Result<AppConfig> {
    let cfg: AppConfig = toml::from_str(content)?;
    Ok(cfg)
}

impl AppConfig {
    /// Load `.env`, the TOML file (optional), apply `DETA_*` overrides and
    /// validate. The result is meant to be built once and passed around.
    pub fn load_and_validate() -> Result<Self> {
        dotenvy::dotenv().ok();
        let mut cfg = load_default()?;
        cfg.apply_env(|name| std::env::var(name).ok())?;
        cfg.normalize_and_validate()?;
        Ok(cfg)
    }

    /// Apply environment overrides through `lookup` so callers (and tests)
    /// decide where variables come from.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{ENV_PREFIX}{suffix}"));

        if let Some(key) = var("PROJECT_KEY") {
            self.store.project_key = Some(key);
        }
        if let Some(name) = var("DB_NAME") {
            self.store.db_name = name;
        }
        if let Some(limit) = var("FETCH_LIMIT") {
            self.store.fetch_limit = limit
                .trim()
                .parse()
                .map_err(|_| anyhow!("{ENV_PREFIX}FETCH_LIMIT must be a positive integer"))?;
        }
        if let Some(debug) = var("DEBUG_MODE") {
            self.app.debug_mode = parse_bool(&debug)
                .ok_or_else(|| anyhow!("{ENV_PREFIX}DEBUG_MODE must be true or false"))?;
        }
        if let Some(host) = lookup("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.server.port = port.trim().parse().map_err(|_| anyhow!("SERVER_PORT must be a port number"))?;
        }
        Ok(())
    }

    pub fn normalize_and_validate(&mut self) -> Result<()> {
        self.app.normalize()?;
        self.server.normalize()?;
        self.store.validate()?;
        Ok(())
    }

    /// `staging` when running inside the hosted runtime, `dev` otherwise.
    /// Production is not reachable yet.
    pub fn operating_env(&self) -> OpEnviron {
        operating_env_from(std::env::var(format!("{ENV_PREFIX}RUNTIME")).ok())
    }
}

fn operating_env_from(runtime: Option<String>) -> OpEnviron {
    match runtime {
        Some(_) => OpEnviron::Staging,
        None => OpEnviron::Dev,
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl AppMeta {
    fn normalize(&mut self) -> Result<()> {
        let trimmed = self.root_path.trim().trim_end_matches('/');
        if !trimmed.is_empty() && !trimmed.starts_with('/') {
            return Err(anyhow!("app.root_path must start with '/'"));
        }
        self.root_path = trimmed.to_string();
        Ok(())
    }
}

impl ServerConfig {
    fn normalize(&mut self) -> Result<()> {
        if self.host.trim().is_empty() {
            self.host = "127.0.0.1".to_string();
        }
        if self.port == 0 {
            return Err(anyhow!("server.port must be in 1..=65535"));
        }
        match self.worker_threads {
            Some(0) | None => self.worker_threads = Some(4),
            Some(_) => {}
        }
        Ok(())
    }
}

impl StoreConfig {
    pub fn validate(&self) -> Result<()> {
        if self.db_name.trim().is_empty() {
            return Err(anyhow!("store.db_name is empty; set it in config.toml or {ENV_PREFIX}DB_NAME"));
        }
        if self.fetch_limit == 0 || self.fetch_limit > 1000 {
            return Err(anyhow!("store.fetch_limit must be in 1..=1000"));
        }
        match self.backend {
            StoreBackend::Deta => {
                let key = self.project_key.as_deref().unwrap_or("").trim();
                if key.is_empty() {
                    return Err(anyhow!("deta backend needs a project key ({ENV_PREFIX}PROJECT_KEY)"));
                }
                if !key.contains('_') {
                    return Err(anyhow!("project key must look like <project_id>_<secret>"));
                }
                let lower = self.endpoint.to_lowercase();
                if !(lower.starts_with("http://") || lower.starts_with("https://")) {
                    return Err(anyhow!("store.endpoint must start with http:// or https://"));
                }
            }
            StoreBackend::File => {
                if self.data_path.trim().is_empty() {
                    return Err(anyhow!("file backend needs store.data_path"));
                }
            }
            StoreBackend::Memory => {}
        }
        if self.request_timeout_secs == Some(0) {
            return Err(anyhow!("store.request_timeout_secs must be positive"));
        }
        Ok(())
    }
}
