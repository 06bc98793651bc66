use crate::error::AppError;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub request_timeout_secs: u64,
}

impl Config {
    /// Defaults, then `phishguard.toml` if present, then `PHISHGUARD_*` variables.
    pub fn load() -> Result<Self, AppError> {
        let builder = config::Config::builder()
            .add_source(File::with_name("phishguard").required(false))
            .add_source(Environment::with_prefix("PHISHGUARD").try_parsing(true));
        Self::from_builder(builder)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, AppError> {
        let settings = Self::defaults(builder)?.build()?;
        Ok(settings.try_deserialize()?)
    }

    fn defaults(
        builder: ConfigBuilder<DefaultState>,
    ) -> Result<ConfigBuilder<DefaultState>, AppError> {
        Ok(builder
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8000_i64)?
            .set_default("model_path", "models/phishing_rf.json")?
            .set_default("request_timeout_secs", 10_i64)?)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::InvalidAddress(format!("{}:{} ({})", self.host, self.port, e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
