//! JSON mix plans: a session config plus one entry per input file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use rawmix_lib::config::MixerConfig;

use crate::error::CliError;

/// One input file and its placement in the mix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanInput {
    /// Path to a headerless PCM file in the plan's sample format.
    pub path: String,
    /// Milliseconds of silence before this input starts.
    #[serde(default, alias = "offset")]
    pub offset_ms: i64,
}

/// A mixing session described as data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixPlan {
    #[serde(flatten)]
    pub config: MixerConfig,
    pub inputs: Vec<PlanInput>,
}

impl MixPlan {
    /// Default payload for `create plan`.
    pub fn template() -> Self {
        Self {
            config: MixerConfig::default(),
            inputs: vec![
                PlanInput {
                    path: "first.raw".to_string(),
                    offset_ms: 0,
                },
                PlanInput {
                    path: "second.raw".to_string(),
                    offset_ms: 500,
                },
            ],
        }
    }
}

/// Read and validate a plan file.
pub fn load_plan(path: &Path) -> Result<MixPlan, CliError> {
    let text = fs::read_to_string(path)?;
    let plan: MixPlan = serde_json::from_str(&text)?;
    if plan.inputs.is_empty() {
        return Err(CliError::Plan("plan names no inputs".to_string()));
    }
    Ok(plan)
}
