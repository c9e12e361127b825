//! Transport seam for the JSON-RPC client.
//!
//! `HttpTransport` talks to a real node; `MockTransport` lets tests
//! script responses without any network.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// A failure below the method layer: either the HTTP hop broke, or the
/// node answered with a JSON-RPC error object.
#[derive(Debug, Clone)]
pub enum RpcFailure {
    Transport(String),
    Rpc { code: i64, message: String },
}

impl std::fmt::Display for RpcFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcFailure::Transport(msg) => write!(f, "{}", msg),
            RpcFailure::Rpc { code, message } => write!(f, "rpc error {}: {}", code, message),
        }
    }
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Sends a single JSON-RPC request and returns the raw `result` value.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcFailure>;
}

/// HTTP transport over reqwest.
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: &str, timeout_ms: Option<u64>) -> Self {
        let timeout_ms = timeout_ms.unwrap_or(30_000);
        Self {
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(timeout_ms))
                .build()
                .unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
            next_id: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcFailure> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        tracing::debug!(method, id, "sending rpc request");

        let resp = self
            .client
            .post(&self.url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| RpcFailure::Transport(format!("rpc request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RpcFailure::Transport(format!(
                "node returned status {}: {}",
                status, body
            )));
        }

        let envelope: RpcResponse = resp
            .json()
            .await
            .map_err(|e| RpcFailure::Transport(format!("failed to parse rpc response: {}", e)))?;

        if let Some(err) = envelope.error {
            tracing::warn!(method, code = err.code, "rpc error: {}", err.message);
            return Err(RpcFailure::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| RpcFailure::Transport("rpc response missing result".into()))
    }
}

type MockHandler =
    Box<dyn Fn(&str, &Value) -> Result<Value, RpcFailure> + Send + Sync>;

/// Scripted transport for tests; records every method called.
pub struct MockTransport {
    handler: MockHandler,
    calls: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &Value) -> Result<Value, RpcFailure> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Methods requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn request(&self, method: &str, params: Value) -> Result<Value, RpcFailure> {
        self.calls.lock().unwrap().push(method.to_string());
        (self.handler)(method, &params)
    }
}
