//! TOML run configuration.
//!
//! Every section and field is optional; missing values fall back to the
//! defaults of the corresponding core type:
//!
//! ```toml
//! [strategy]
//! atr_multiple = 3.0
//!
//! [indicators]
//! macd_fast = 12
//! macd_slow = 26
//! macd_signal = 9
//! atr_period = 14
//!
//! [engine]
//! initial_cash = 1.0
//! commission_rate = 0.0
//!
//! [evaluation]
//! periods_per_year = 252.0
//!
//! [sweep]
//! atr_multiple = [2.0, 2.5, 3.0]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use goldx_core::engine::{EngineConfig, EvaluationConfig};
use goldx_core::fingerprint::Fingerprint;
use goldx_core::indicators::IndicatorParams;
use goldx_core::signals::StrategyParams;
use goldx_core::InputError;

use crate::sweep::ParamGrid;

/// Content-addressable identifier of a run (BLAKE3 hex).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(#[from] InputError),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Complete, serializable configuration of one backtest (and optionally a sweep).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldxConfig {
    pub strategy: StrategyParams,
    pub indicators: IndicatorParams,
    pub engine: EngineConfig,
    pub evaluation: EvaluationConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep: Option<ParamGrid>,
}

impl GoldxConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.strategy.validate()?;
        self.indicators.validate()?;
        self.engine.validate()?;
        self.evaluation.validate()?;
        Ok(())
    }

    /// Hash of everything that influences a single run's output.
    ///
    /// The sweep grid is excluded: it selects runs, it does not shape them.
    pub fn fingerprint(&self) -> Result<Fingerprint, ConfigError> {
        let run_part = Self {
            sweep: None,
            ..self.clone()
        };
        Ok(Fingerprint::of_json(&run_part)?)
    }

    /// Run id: config fingerprint bound to the dataset it ran on.
    pub fn run_id(&self, dataset_hash: &Fingerprint) -> Result<RunId, ConfigError> {
        let config_hash = self.fingerprint()?;
        let mut hasher = blake3::Hasher::new();
        hasher.update(config_hash.0.as_bytes());
        hasher.update(dataset_hash.0.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }
}
