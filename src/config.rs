use crate::errors::{EngineError, EngineResult};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on `num_paths * (num_steps + 1)` accepted per request.
pub const DEFAULT_MAX_ENSEMBLE_VALUES: usize = 50_000_000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server_port: u16,
    pub max_ensemble_values: usize,
    pub simulation_timeout: Duration,
    pub simulation_seed: Option<u64>,
    pub frontend_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: 3001,
            max_ensemble_values: DEFAULT_MAX_ENSEMBLE_VALUES,
            simulation_timeout: Duration::from_secs(30),
            simulation_seed: None,
            frontend_dir: PathBuf::from("public"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> EngineResult<Self> {
        dotenvy::dotenv().ok();

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| EngineError::Config(format!("SERVER_PORT: {e}")))?;

        let max_ensemble_values = env_var_or("MAX_ENSEMBLE_VALUES", "50000000")
            .parse::<usize>()
            .map_err(|e| EngineError::Config(format!("MAX_ENSEMBLE_VALUES: {e}")))?;

        let simulation_timeout_secs = env_var_or("SIMULATION_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| EngineError::Config(format!("SIMULATION_TIMEOUT_SECS: {e}")))?;

        let simulation_seed = match std::env::var("SIMULATION_SEED") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| EngineError::Config(format!("SIMULATION_SEED: {e}")))?,
            ),
            _ => None,
        };

        if max_ensemble_values == 0 {
            return Err(EngineError::Config("MAX_ENSEMBLE_VALUES must be > 0".into()));
        }
        if simulation_timeout_secs == 0 {
            return Err(EngineError::Config("SIMULATION_TIMEOUT_SECS must be > 0".into()));
        }

        Ok(Self {
            server_port,
            max_ensemble_values,
            simulation_timeout: Duration::from_secs(simulation_timeout_secs),
            simulation_seed,
            frontend_dir: PathBuf::from(env_var_or("FRONTEND_DIR", "public")),
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
