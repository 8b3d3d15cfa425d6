use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
};

use serde::{Deserialize, Serialize};

use crate::error::{FeedbackError, FeedbackResult};

/// Variable consulted for the listening port, kept separate from the
/// `FEEDBACK__` namespace so existing deployments keep working.
pub const PORT_ENV: &str = "PORT";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Settings {
    pub fn load(path: Option<PathBuf>) -> FeedbackResult<Self> {
        Self::load_with_port(path, std::env::var(PORT_ENV).ok())
    }

    pub fn load_with_port(path: Option<PathBuf>, port: Option<String>) -> FeedbackResult<Self> {
        let mut settings = config::Config::builder();
        if let Some(path) = path {
            settings = settings.add_source(config::File::from(path));
        } else {
            settings = settings.add_source(config::File::with_name("feedback").required(false));
        }
        settings = settings
            .add_source(
                config::Environment::with_prefix("FEEDBACK")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.port", port)
            .map_err(|err| FeedbackError::Configuration(err.to_string()))?;
        let cfg = settings
            .build()
            .map_err(|err| FeedbackError::Configuration(err.to_string()))?;
        let settings: Settings = cfg
            .try_deserialize()
            .map_err(|err| FeedbackError::Configuration(err.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> FeedbackResult<()> {
        if self.store.path.as_os_str().is_empty() {
            return Err(FeedbackError::Configuration(
                "store.path must not be empty".to_string(),
            ));
        }
        if self.store.path.is_dir() {
            return Err(FeedbackError::Configuration(format!(
                "store.path {} is a directory",
                self.store.path.display()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_host")]
    pub host: IpAddr,
    #[serde(default = "ServerConfig::default_port")]
    pub port: u16,
    #[serde(default = "ServerConfig::default_static_dir")]
    pub static_dir: PathBuf,
}

impl ServerConfig {
    fn default_host() -> IpAddr {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    }

    fn default_port() -> u16 {
        3000
    }

    fn default_static_dir() -> PathBuf {
        PathBuf::from("./public")
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            static_dir: Self::default_static_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "StoreConfig::default_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub write_mode: WriteMode,
}

impl StoreConfig {
    fn default_path() -> PathBuf {
        PathBuf::from("./data.json")
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: Self::default_path(),
            write_mode: WriteMode::default(),
        }
    }
}

/// How concurrent load-modify-save cycles within one process interact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Cycles run one at a time behind a process-wide lock.
    #[default]
    Serialized,
    /// Cycles may overlap; the last save wins and earlier updates can be lost.
    Unsynchronized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "TelemetryConfig::default_metrics_enabled")]
    pub metrics_enabled: bool,
}

impl TelemetryConfig {
    fn default_metrics_enabled() -> bool {
        true
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: Self::default_metrics_enabled(),
        }
    }
}
