use crate::error::{Result, WorkerError};
use layout_engine::EngineConfig;
use log::info;
use std::{env, path::PathBuf};

const ENV_KEY_CONFIG: &str = "LAYOUT_WORKER_CONFIG";

#[derive(Debug, Clone, Default)]
pub struct WorkerConfig {
    pub engine_config_path: Option<PathBuf>,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_value(env::var(ENV_KEY_CONFIG).ok())
    }

    fn from_value(value: Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = value.filter(|value| !value.trim().is_empty()) {
            let path = PathBuf::from(path);

            if path.exists() && !path.is_file() {
                return Err(WorkerError::InvalidConfiguration(format!(
                    "Engine config is not a file: {}",
                    path.display()
                )));
            }

            config.engine_config_path = Some(path);
        }
        Ok(config)
    }

    /// Engine settings from the configured file, defaults when there is none.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        match &self.engine_config_path {
            Some(path) if path.exists() => {
                info!("Loading engine config from {}", path.display());
                Ok(EngineConfig::load_from_file(path)?)
            }
            Some(path) => Err(WorkerError::InvalidConfiguration(format!(
                "Engine config not found: {}",
                path.display()
            ))),
            None => Ok(EngineConfig::default()),
        }
    }
}
