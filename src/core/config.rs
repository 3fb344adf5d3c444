use crate::core::error::{ensure_confidence, ensure_positive, EngineError, EngineResult};
use crate::optimization::frontier::FrontierConfig;
use crate::simulation::gbm::SimulationConfig;
use serde::{Deserialize, Serialize};

/// Engine-wide defaults. Every field may be omitted from a JSON document and
/// takes its documented default.
///
/// # Examples
///
/// ```
/// use quant_engine::core::config::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{"confidence": 0.99, "frontier": {"n_draws": 1000}}"#).unwrap();
/// assert_eq!(config.confidence, 0.99);
/// assert_eq!(config.frontier.n_draws, 1000);
/// assert_eq!(config.frontier.seed, 42);
/// assert_eq!(config.rolling_window, 30);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub simulation: SimulationConfig,
    pub frontier: FrontierConfig,
    /// Confidence level for VaR and CVaR.
    pub confidence: f64,
    /// Window, in periods, of the rolling volatility series.
    pub rolling_window: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            frontier: FrontierConfig::default(),
            confidence: 0.95,
            rolling_window: 30,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            serde_json::from_str(json).map_err(|e| EngineError::invalid("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        ensure_positive("simulation.step_size", self.simulation.step_size)?;
        if self.frontier.n_draws == 0 {
            return Err(EngineError::invalid("frontier.n_draws", "must be at least 1"));
        }
        ensure_confidence(self.confidence)?;
        if self.rolling_window < 2 {
            return Err(EngineError::invalid("rolling_window", "must be at least 2"));
        }
        Ok(())
    }
}
