//! Machine configuration, loadable from TOML.
//!
//! ```toml
//! unknown_opcode = "error"
//! max_steps = 10000
//! preflight = false
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the fetch loop does with an instruction no module handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownOpcodePolicy {
    /// Log a warning and advance past it.
    #[default]
    Skip,
    /// Stop with [`crate::RuntimeError::UnknownOpcode`].
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MachineConfig {
    pub unknown_opcode: UnknownOpcodePolicy,
    /// Abort after this many steps. `None` runs until the program stops.
    pub max_steps: Option<u64>,
    /// Validate the whole program before the first instruction runs.
    pub preflight: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            unknown_opcode: UnknownOpcodePolicy::Skip,
            max_steps: None,
            preflight: true,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid machine configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl MachineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }
}
