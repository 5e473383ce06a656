use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::artifacts::{default_cache_dir, ArtifactSource};
use crate::errors::{HepatitisError, HepatitisResult};
use crate::features::FeatureDefaults;
use crate::heuristic::HeuristicWeights;

pub const DEFAULT_CONFIG_FILE: &str = "hepatitis.toml";
pub const ENV_PREFIX: &str = "HEPATITIS_";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub artifacts: ArtifactsConfig,
    #[serde(default)]
    pub defaults: FeatureDefaults,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_permissive: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: default_host(),
            port: default_port(),
            cors_permissive: false,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictorMode {
    #[default]
    Heuristic,
    Model,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PredictorConfig {
    #[serde(default)]
    pub mode: PredictorMode,
    #[serde(default)]
    pub heuristic: HeuristicWeights,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArtifactsConfig {
    #[serde(default)]
    pub model: Option<ArtifactSource>,
    #[serde(default)]
    pub scaler: Option<ArtifactSource>,
    #[serde(default)]
    pub model_sha256: Option<String>,
    #[serde(default)]
    pub scaler_sha256: Option<String>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_fetch_timeout() -> u64 {
    30
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        ArtifactsConfig {
            model: None,
            scaler: None,
            model_sha256: None,
            scaler_sha256: None,
            cache_dir: None,
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

impl ArtifactsConfig {
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> HepatitisResult<()> {
        if self.predictor.mode == PredictorMode::Model && self.artifacts.model.is_none() {
            return Err(HepatitisError::config(
                "predictor.mode = \"model\" requires artifacts.model (path or url)",
            ));
        }
        if self.artifacts.fetch_timeout_secs == 0 {
            return Err(HepatitisError::config("artifacts.fetch_timeout_secs must be positive"));
        }
        if self.server.host.trim().is_empty() {
            return Err(HepatitisError::config("server.host cannot be empty"));
        }
        self.predictor.heuristic.validate()?;
        self.defaults.validate()
    }
}

/// Layered configuration: built-in defaults, then the TOML file, then
/// `HEPATITIS_*` variables (`__` separates sections), then a bare `PORT`.
pub fn figment(path: Option<&Path>) -> Figment {
    let file = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    Figment::from(Serialized::defaults(ServiceConfig::default()))
        .merge(Toml::file(file))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .merge(Env::raw().only(&["PORT"]).map(|_| "server.port".into()))
}

pub fn load_config(path: Option<&Path>) -> HepatitisResult<ServiceConfig> {
    let config: ServiceConfig = figment(path).extract()?;
    config.validate()?;
    Ok(config)
}
