//! Reward dispatcher configuration.
//!
//! Defaults target Polygon Amoy. Secrets (contract address, private key)
//! come from a JSON file kept out of version control, same arrangement as
//! the game client's `Secrets.example` template.

use serde::Deserialize;

use autest_types::{Result, RewardError};

/// Sentinel value shipped in the secrets template; treated as "no key".
pub const PLACEHOLDER_KEY: &str = "PASTE_YOUR_PRIVATE_KEY";

/// Gas limit selection: estimate per transaction, or pin a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum GasLimit {
    Auto,
    Fixed(u64),
}

/// Static fee policy. Amoy's fee estimation is unreliable, so the gas
/// price is pinned instead of bidding the fee market; only the gas
/// limit may be estimated.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GasPolicy {
    pub gas_limit: GasLimit,
    pub gas_price_wei: u128,
}

impl Default for GasPolicy {
    fn default() -> Self {
        Self {
            gas_limit: GasLimit::Auto,
            gas_price_wei: 30_000_000_000, // 30 gwei, above Amoy's minimum
        }
    }
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    /// AC token contract address.
    pub contract_address: String,
    /// Hex-encoded 32-byte signing key; placeholder means unset.
    pub private_key: String,
    /// Fallback recipient when the game supplies none.
    pub default_recipient: String,
    pub gas: GasPolicy,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://rpc-amoy.polygon.technology".to_string(),
            chain_id: 80_002,
            contract_address: "0xbe00447a89f5bb9e09fd49acf3cfb4dc3f076a26".to_string(),
            private_key: PLACEHOLDER_KEY.to_string(),
            default_recipient: String::new(),
            gas: GasPolicy::default(),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl RewardConfig {
    /// Load configuration from a JSON secrets file.
    pub fn from_json_file(path: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RewardError::Config(format!("cannot read {}: {}", path, e)))?;
        serde_json::from_str(&text)
            .map_err(|e| RewardError::Config(format!("cannot parse {}: {}", path, e)))
    }

    /// True when a real signing key is configured.
    pub fn has_signing_key(&self) -> bool {
        !self.private_key.is_empty() && !self.private_key.contains("PASTE_YOUR")
    }
}
