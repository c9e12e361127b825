//! Ethereum JSON-RPC client for the reward pipeline.
//!
//! Methods used:
//! - `eth_chainId`, `eth_getBalance`, `eth_call`
//! - `eth_getTransactionCount`, `eth_estimateGas`, `eth_sendRawTransaction`

use serde_json::{json, Value};
use std::sync::Arc;

use autest_types::{bytes_to_hex, hex_to_quantity, Address, Hex, Result, RewardError};

pub mod transport;

pub use transport::{HttpTransport, MockTransport, RpcFailure, RpcTransport};

/// JSON-RPC error code for "execution reverted" on nodes that send it
/// structurally (EIP-1474 / geth revert reporting).
const CODE_EXECUTION_REVERTED: i64 = 3;

/// Map a transport-level failure onto the reward error taxonomy.
///
/// The structured code is preferred; the substring checks are a
/// last-resort fallback because Amoy nodes fold both revert and balance
/// failures into the -32000 catch-all code.
impl From<RpcFailure> for RewardError {
    fn from(failure: RpcFailure) -> Self {
        match failure {
            RpcFailure::Transport(msg) => RewardError::Network(msg),
            RpcFailure::Rpc { code, message } => {
                if code == CODE_EXECUTION_REVERTED {
                    return RewardError::Reverted(message);
                }
                let lower = message.to_lowercase();
                if lower.contains("insufficient funds") {
                    RewardError::InsufficientFunds(message)
                } else if lower.contains("revert") {
                    RewardError::Reverted(message)
                } else {
                    RewardError::Network(format!("rpc error {}: {}", code, message))
                }
            }
        }
    }
}

/// Thin client over a transport, bound to one chain.
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
    chain_id: u64,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>, chain_id: u64) -> Self {
        Self { transport, chain_id }
    }

    /// The chain id this client was configured for.
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// `eth_chainId` as reported by the node.
    pub async fn node_chain_id(&self) -> Result<u64> {
        let result = self.transport.request("eth_chainId", json!([])).await?;
        let quantity = hex_to_quantity(result_str(&result)?)?;
        Ok(quantity as u64)
    }

    /// Native balance in wei for `address`.
    pub async fn get_balance(&self, address: &Address) -> Result<u128> {
        let result = self
            .transport
            .request("eth_getBalance", json!([address.to_hex(), "latest"]))
            .await?;
        hex_to_quantity(result_str(&result)?)
    }

    /// Read-only contract call; returns the raw return data.
    pub async fn call(&self, to: &Address, data: &[u8]) -> Result<Hex> {
        let result = self
            .transport
            .request(
                "eth_call",
                json!([{ "to": to.to_hex(), "data": bytes_to_hex(data) }, "latest"]),
            )
            .await?;
        Ok(result_str(&result)?.to_string())
    }

    /// Pending nonce for `address`.
    pub async fn get_transaction_count(&self, address: &Address) -> Result<u64> {
        let result = self
            .transport
            .request(
                "eth_getTransactionCount",
                json!([address.to_hex(), "pending"]),
            )
            .await?;
        Ok(hex_to_quantity(result_str(&result)?)? as u64)
    }

    /// Gas estimate for a contract call from `from`.
    pub async fn estimate_gas(&self, from: &Address, to: &Address, data: &[u8]) -> Result<u64> {
        let result = self
            .transport
            .request(
                "eth_estimateGas",
                json!([{
                    "from": from.to_hex(),
                    "to": to.to_hex(),
                    "data": bytes_to_hex(data),
                }]),
            )
            .await?;
        Ok(hex_to_quantity(result_str(&result)?)? as u64)
    }

    /// Broadcast a signed transaction; returns the transaction hash.
    pub async fn send_raw_transaction(&self, raw: &[u8]) -> Result<Hex> {
        let result = self
            .transport
            .request("eth_sendRawTransaction", json!([bytes_to_hex(raw)]))
            .await?;
        Ok(result_str(&result)?.to_string())
    }
}

fn result_str(value: &Value) -> Result<&str> {
    value
        .as_str()
        .ok_or_else(|| RewardError::Network(format!("unexpected rpc result: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_client(transport: MockTransport) -> (Arc<MockTransport>, RpcClient) {
        let transport = Arc::new(transport);
        let client = RpcClient::new(transport.clone(), 80_002);
        (transport, client)
    }

    #[tokio::test]
    async fn test_get_balance_parses_quantity() {
        let (transport, client) = mock_client(MockTransport::new(|method, _| {
            assert_eq!(method, "eth_getBalance");
            Ok(json!("0xde0b6b3a7640000"))
        }));
        let addr = Address::from_hex("0xbe00447a89f5bb9e09fd49acf3cfb4dc3f076a26").unwrap();
        let balance = client.get_balance(&addr).await.unwrap();
        assert_eq!(balance, 1_000_000_000_000_000_000);
        assert_eq!(transport.calls(), vec!["eth_getBalance"]);
    }

    #[tokio::test]
    async fn test_nonce_uses_pending_tag() {
        let (_, client) = mock_client(MockTransport::new(|_, params| {
            assert_eq!(params[1], json!("pending"));
            Ok(json!("0x2a"))
        }));
        let addr = Address::from_hex("0xbe00447a89f5bb9e09fd49acf3cfb4dc3f076a26").unwrap();
        assert_eq!(client.get_transaction_count(&addr).await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_non_string_result_is_network_error() {
        let (_, client) = mock_client(MockTransport::new(|_, _| Ok(json!({"odd": true}))));
        let addr = Address::from_hex("0xbe00447a89f5bb9e09fd49acf3cfb4dc3f076a26").unwrap();
        let err = client.get_balance(&addr).await.unwrap_err();
        assert!(matches!(err, RewardError::Network(_)));
    }

    #[test]
    fn test_failure_classification() {
        let insufficient = RpcFailure::Rpc {
            code: -32000,
            message: "insufficient funds for gas * price + value".into(),
        };
        assert!(matches!(
            RewardError::from(insufficient),
            RewardError::InsufficientFunds(_)
        ));

        let reverted_code = RpcFailure::Rpc {
            code: 3,
            message: "execution reverted: ERC20: transfer amount exceeds balance".into(),
        };
        assert!(matches!(
            RewardError::from(reverted_code),
            RewardError::Reverted(_)
        ));

        let reverted_text = RpcFailure::Rpc {
            code: -32000,
            message: "execution reverted".into(),
        };
        assert!(matches!(
            RewardError::from(reverted_text),
            RewardError::Reverted(_)
        ));

        let unknown = RpcFailure::Rpc {
            code: -32601,
            message: "method not found".into(),
        };
        assert!(matches!(RewardError::from(unknown), RewardError::Network(_)));

        let transport = RpcFailure::Transport("connection refused".into());
        assert!(matches!(
            RewardError::from(transport),
            RewardError::Network(_)
        ));
    }
}
