use std::path::Path;

use prl_gate::LifecyclePolicy;
use serde::{Deserialize, Serialize};

use crate::error::{PoolError, PoolResult};

/// Pool configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Seed claim count; must be positive.
    pub initial_max_tickets: u64,
    /// Which phase deposits and withdrawals belong to.
    pub lifecycle: LifecyclePolicy,
    /// Whether an authorized caller may sweep floor-division dust.
    pub allow_dust_sweep: bool,
    /// Whether zero-amount deposits are rejected.
    pub reject_zero_deposits: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_max_tickets: 100,
            lifecycle: LifecyclePolicy::Sequential,
            allow_dust_sweep: false,
            reject_zero_deposits: true,
        }
    }
}

impl PoolConfig {
    pub fn with_max_tickets(initial_max_tickets: u64) -> Self {
        Self {
            initial_max_tickets,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> PoolResult<()> {
        if self.initial_max_tickets == 0 {
            return Err(PoolError::Config(
                "initial_max_tickets must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> PoolResult<Self> {
        let config: PoolConfig = toml::from_str(content)
            .map_err(|e| PoolError::Config(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> PoolResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> PoolResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PoolError::Config(format!("failed to render config: {e}")))
    }
}
