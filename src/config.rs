//! Engine configuration: numerical tolerances and simulation settings.

use serde::{Deserialize, Serialize};

use crate::error::{ControlError, ControlResult};
use crate::simulation::SimulationConfig;
use crate::subspace::Tolerance;

/// Runtime configuration shared by every request an engine serves.
///
/// Missing fields take their default values, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rank decisions and the conditioning limit for feedback synthesis.
    pub tolerance: Tolerance,

    /// Time grid and integration scheme for simulation requests.
    pub simulation: SimulationConfig,

    /// Sample points tried by the symbolic zero test.
    /// Default: 8.
    pub zero_test_samples: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::default(),
            simulation: SimulationConfig::default(),
            zero_test_samples: 8,
        }
    }
}

impl EngineConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> ControlResult<()> {
        let rel = self.tolerance.rel;
        if !(rel.is_finite() && rel > 0.0 && rel < 1.0) {
            return Err(ControlError::Config(format!(
                "tolerance.rel must be in (0, 1), got {rel}"
            )));
        }
        if !(self.tolerance.max_condition > 1.0) {
            return Err(ControlError::Config(format!(
                "tolerance.max_condition must be > 1, got {}",
                self.tolerance.max_condition
            )));
        }
        if self.zero_test_samples == 0 {
            return Err(ControlError::Config(
                "zero_test_samples must be >= 1".to_string(),
            ));
        }
        self.simulation.validate()
    }

    /// Load from a JSON string and validate.
    pub fn from_json(json: &str) -> ControlResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| ControlError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> ControlResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ControlError::Config(format!("JSON encode error: {e}")))
    }
}
