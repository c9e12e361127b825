//! Shared types for the AutestCoin reward workspace.
//!
//! - `Address`: 20-byte EVM account address
//! - `RewardError`: error taxonomy for the reward pipeline
//! - hex and JSON-RPC quantity codecs

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 0x-prefixed hex string (e.g. "0x1234...").
pub type Hex = String;

/// Base units per whole AC token (18 decimals).
pub const WEI_PER_TOKEN: u128 = 1_000_000_000_000_000_000;

/// Reward pipeline error types.
#[derive(Debug, Error)]
pub enum RewardError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid recipient address: {0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("insufficient funds for gas: {0}")]
    InsufficientFunds(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RewardError>;

/// A 20-byte EVM account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    /// Strict parse: requires "0x" + exactly 40 hex chars.
    pub fn from_hex(s: &str) -> Result<Self> {
        let body = s
            .strip_prefix("0x")
            .ok_or_else(|| RewardError::InvalidHex(format!("missing 0x prefix: {}", s)))?;
        if body.len() != 40 {
            return Err(RewardError::InvalidHex(format!(
                "expected 40 hex chars, got {}",
                body.len()
            )));
        }
        let bytes = hex::decode(body).map_err(|e| RewardError::InvalidHex(e.to_string()))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> Hex {
        format!("0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl TryFrom<String> for Address {
    type Error = RewardError;
    fn try_from(s: String) -> Result<Self> {
        Address::from_hex(&s)
    }
}

impl From<Address> for String {
    fn from(a: Address) -> String {
        a.to_hex()
    }
}

/// Format-only recipient check: "0x" prefix and 42 characters total.
///
/// Matches the game client's behavior; hex-digit content is verified
/// later when the address is parsed into calldata bytes.
pub fn validate_address(s: &str) -> bool {
    s.starts_with("0x") && s.len() == 42
}

/// Parse a hex string to a big-endian byte array.
pub fn hex_to_bytes(hex_str: &str) -> Result<Vec<u8>> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    hex::decode(hex_str).map_err(|e| RewardError::InvalidHex(e.to_string()))
}

/// Convert bytes to a 0x-prefixed hex string.
pub fn bytes_to_hex(bytes: &[u8]) -> Hex {
    format!("0x{}", hex::encode(bytes))
}

/// Encode a u128 as a JSON-RPC quantity ("0x0", no leading zeros).
pub fn quantity_to_hex(value: u128) -> Hex {
    format!("0x{:x}", value)
}

/// Parse a JSON-RPC quantity into a u128.
///
/// Balances above u128::MAX are clamped; at 18 decimals that bound is
/// ~3.4e20 whole tokens, far beyond any testnet balance.
pub fn hex_to_quantity(hex_str: &str) -> Result<u128> {
    let body = hex_str
        .strip_prefix("0x")
        .ok_or_else(|| RewardError::InvalidHex(format!("missing 0x prefix: {}", hex_str)))?;
    if body.is_empty() {
        return Err(RewardError::InvalidHex("empty quantity".into()));
    }
    if body.len() > 32 {
        let (overflow, tail) = body.split_at(body.len() - 32);
        if overflow.chars().any(|c| c != '0') {
            return Ok(u128::MAX);
        }
        return u128::from_str_radix(tail, 16)
            .map_err(|e| RewardError::InvalidHex(e.to_string()));
    }
    u128::from_str_radix(body, 16).map_err(|e| RewardError::InvalidHex(e.to_string()))
}
