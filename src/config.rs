//! Session configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cosmos::{calculate_fee, Fee, GasPrice};
use crate::errors::{GrantError, Result};

pub const DEFAULT_GAS_LIMIT: u64 = 200_000;

fn default_gas_limit() -> u64 {
    DEFAULT_GAS_LIMIT
}

/// Where and how to sign: chain, node and fee parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub chain_id: String,
    pub rpc_endpoint: String,
    /// Gas price such as `0.025uatom`.
    pub gas_price: String,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
    #[serde(default)]
    pub memo: String,
}

impl SessionConfig {
    pub fn new(
        chain_id: impl Into<String>,
        rpc_endpoint: impl Into<String>,
        gas_price: impl Into<String>,
    ) -> Self {
        Self {
            chain_id: chain_id.into(),
            rpc_endpoint: rpc_endpoint.into(),
            gas_price: gas_price.into(),
            gas_limit: DEFAULT_GAS_LIMIT,
            memo: String::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| GrantError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        log::info!("Loaded session config from {:?}", path);
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chain_id.trim().is_empty() {
            return Err(GrantError::Config("chain_id is empty".to_string()));
        }
        if self.rpc_endpoint.trim().is_empty() {
            return Err(GrantError::Config("rpc_endpoint is empty".to_string()));
        }
        if self.gas_limit == 0 {
            return Err(GrantError::Config("gas_limit must be positive".to_string()));
        }
        self.gas_price.parse::<GasPrice>()?;
        Ok(())
    }

    /// Fee for the configured gas limit at the configured gas price.
    pub fn default_fee(&self) -> Result<Fee> {
        calculate_fee(self.gas_limit, &self.gas_price.parse()?)
    }
}
