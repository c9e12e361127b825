//! AutestCoin reward dispatcher.
//!
//! Turns a validated `(amount, recipient)` pair into a confirmed or failed
//! ERC-20 `transfer` on the configured chain. One state machine per call:
//!
//! `Idle -> Validating -> Connecting -> Building -> Signing ->
//!  Broadcasting -> {Succeeded | Failed}`
//!
//! No internal retries; a failed dispatch is terminal and the caller
//! decides whether to try again.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use autest_abi as abi;
use autest_rpc::{HttpTransport, RpcClient, RpcTransport};
use autest_signer::{TxRequest, Wallet};
use autest_types::{validate_address, Address, Hex, Result, RewardError, WEI_PER_TOKEN};

pub mod config;

pub use config::{GasLimit, GasPolicy, RewardConfig, PLACEHOLDER_KEY};

/// Phases of a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Idle,
    Validating,
    Connecting,
    Building,
    Signing,
    Broadcasting,
    Succeeded,
    Failed,
}

impl DispatchPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchPhase::Idle => "idle",
            DispatchPhase::Validating => "validating",
            DispatchPhase::Connecting => "connecting",
            DispatchPhase::Building => "building",
            DispatchPhase::Signing => "signing",
            DispatchPhase::Broadcasting => "broadcasting",
            DispatchPhase::Succeeded => "succeeded",
            DispatchPhase::Failed => "failed",
        }
    }
}

/// Progress event for subscribers (the game UI layer).
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    Phase { phase: DispatchPhase },
    Log { line: String },
    Done { tx_hash: Hex },
    Error { message: String },
}

/// Callback type for dispatch events.
pub type DispatchEventHandler = Box<dyn Fn(DispatchEvent) + Send + Sync>;

/// Outcome of a successful dispatch.
#[derive(Debug, Clone)]
pub struct DispatchReceipt {
    pub tx_hash: Hex,
    pub amount: u64,
    pub recipient: Address,
}

/// Connection diagnostics returned by `connect`.
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub chain_id: u64,
    pub sender: Address,
    pub gas_balance_wei: u128,
    pub token_balance: u128,
}

/// Consistent snapshot of the observable dispatcher state.
#[derive(Debug, Clone)]
pub struct StatusSnapshot {
    pub status_message: String,
    pub is_loading: bool,
    pub is_connected: bool,
    pub debug_log: String,
    pub phase: DispatchPhase,
}

struct DispatcherState {
    status_message: String,
    is_loading: bool,
    is_connected: bool,
    debug_log: String,
    phase: DispatchPhase,
}

/// The reward dispatcher service.
///
/// Construct one at startup and inject it where needed; there is no
/// global instance. All observable state lives behind a mutex and is
/// read via [`RewardDispatcher::status`]. Dispatches are serialized by
/// an in-flight guard, so concurrent reward events queue instead of
/// racing the same nonce.
pub struct RewardDispatcher {
    config: RewardConfig,
    transport: Arc<dyn RpcTransport>,
    state: Mutex<DispatcherState>,
    in_flight: tokio::sync::Mutex<()>,
    on_event: Option<DispatchEventHandler>,
}

impl RewardDispatcher {
    /// Dispatcher over HTTP against the configured RPC endpoint.
    pub fn new(config: RewardConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(
            &config.rpc_url,
            Some(config.request_timeout_ms),
        ));
        Self::with_transport(config, transport)
    }

    /// Dispatcher over an injected transport (tests use a mock here).
    pub fn with_transport(config: RewardConfig, transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            config,
            transport,
            state: Mutex::new(DispatcherState {
                status_message: "Ready to connect".to_string(),
                is_loading: false,
                is_connected: false,
                debug_log: String::new(),
                phase: DispatchPhase::Idle,
            }),
            in_flight: tokio::sync::Mutex::new(()),
            on_event: None,
        }
    }

    /// Attach a subscriber for phase/log/terminal events.
    pub fn with_event_handler(mut self, handler: DispatchEventHandler) -> Self {
        self.on_event = Some(handler);
        self
    }

    /// Snapshot of status message, loading flag, and debug log.
    pub fn status(&self) -> StatusSnapshot {
        let state = self.state.lock().unwrap();
        StatusSnapshot {
            status_message: state.status_message.clone(),
            is_loading: state.is_loading,
            is_connected: state.is_connected,
            debug_log: state.debug_log.clone(),
            phase: state.phase,
        }
    }

    /// Establish the RPC client, derive the sender address, and query
    /// balances for diagnostics. Bounded by the configured connect
    /// timeout; on expiry the in-flight call is dropped and a `Timeout`
    /// failure is reported instead of hanging.
    pub async fn connect(&self) -> Result<ConnectionInfo> {
        self.set_status("Testing connection...", true);

        if !self.config.has_signing_key() {
            let err = RewardError::Config("no private key configured".into());
            self.finish_with_error("Connection failed", &err);
            return Err(err);
        }

        let timeout = Duration::from_millis(self.config.connect_timeout_ms);
        let result = match tokio::time::timeout(timeout, self.connect_inner()).await {
            Ok(result) => result,
            Err(_) => Err(RewardError::Timeout(self.config.connect_timeout_ms)),
        };

        match &result {
            Ok(info) => {
                let mut state = self.state.lock().unwrap();
                state.is_connected = true;
                state.is_loading = false;
                state.status_message = format!("✅ Connected to chain {}", info.chain_id);
            }
            Err(err) => self.finish_with_error("Connection failed", err),
        }
        result
    }

    async fn connect_inner(&self) -> Result<ConnectionInfo> {
        let wallet = self.wallet()?;
        let sender = wallet.address();
        let client = self.client();
        let contract = self.contract_address()?;

        let node_chain_id = client.node_chain_id().await?;
        if node_chain_id != self.config.chain_id {
            return Err(RewardError::Config(format!(
                "node reports chain {}, expected {}",
                node_chain_id, self.config.chain_id
            )));
        }

        self.log(format!("sender address: {}", sender));

        let gas_balance_wei = client.get_balance(&sender).await?;
        self.log(format!("gas balance: {} wei", gas_balance_wei));
        if gas_balance_wei == 0 {
            self.log("warning: gas balance is zero, transactions will fail".to_string());
            tracing::warn!(%sender, "gas balance is zero");
        }

        let return_data = client.call(&contract, &abi::encode_balance_of(&sender)).await?;
        let token_balance = abi::decode_uint256(&return_data)?;
        self.log(format!("token balance: {} base units", token_balance));
        if token_balance == 0 {
            self.log("warning: token balance is zero, rewards cannot be paid".to_string());
            tracing::warn!(%sender, "token balance is zero");
        }

        Ok(ConnectionInfo {
            chain_id: self.config.chain_id,
            sender,
            gas_balance_wei,
            token_balance,
        })
    }

    /// Send `amount` whole AC tokens to `recipient`.
    ///
    /// Validation happens before any network I/O; an invalid recipient
    /// or missing key fails synchronously. Calls are serialized: a
    /// second dispatch waits for the first to finish.
    pub async fn dispatch_reward(&self, amount: u64, recipient: &str) -> Result<DispatchReceipt> {
        let _guard = self.in_flight.lock().await;

        self.set_status(&format!("Sending {} AC...", amount), true);
        self.set_phase(DispatchPhase::Validating);

        let result = self.dispatch_inner(amount, recipient).await;

        match &result {
            Ok(receipt) => {
                self.set_phase(DispatchPhase::Succeeded);
                let short = receipt.tx_hash.chars().take(10).collect::<String>();
                self.set_status(
                    &format!("✅ {} AC sent! Hash: {}...", amount, short),
                    false,
                );
                self.log(format!("transaction hash: {}", receipt.tx_hash));
                self.emit(DispatchEvent::Done {
                    tx_hash: receipt.tx_hash.clone(),
                });
            }
            Err(err) => {
                self.set_phase(DispatchPhase::Failed);
                self.finish_with_error("Transaction failed", err);
                tracing::warn!(amount, recipient, "dispatch failed: {}", err);
            }
        }
        result
    }

    async fn dispatch_inner(&self, amount: u64, recipient: &str) -> Result<DispatchReceipt> {
        if !validate_address(recipient) {
            return Err(RewardError::Validation(format!(
                "recipient must be 0x-prefixed and 42 characters, got {:?}",
                recipient
            )));
        }
        let wallet = self.wallet()?;
        let recipient_addr =
            Address::from_hex(recipient).map_err(|e| RewardError::Validation(e.to_string()))?;
        let value = (amount as u128)
            .checked_mul(WEI_PER_TOKEN)
            .ok_or_else(|| RewardError::Validation(format!("amount {} overflows", amount)))?;
        let contract = self.contract_address()?;
        let sender = wallet.address();

        self.log(format!(
            "transfer {} AC ({} base units) from {} to {}",
            amount, value, sender, recipient_addr
        ));

        self.set_phase(DispatchPhase::Connecting);
        let client = self.client();
        let nonce = client.get_transaction_count(&sender).await?;
        self.log(format!("nonce: {}", nonce));

        self.set_phase(DispatchPhase::Building);
        let data = abi::encode_transfer(&recipient_addr, value);
        let gas_limit = match self.config.gas.gas_limit {
            GasLimit::Auto => client.estimate_gas(&sender, &contract, &data).await?,
            GasLimit::Fixed(limit) => limit,
        };
        self.log(format!(
            "gas limit: {}, gas price: {} wei",
            gas_limit, self.config.gas.gas_price_wei
        ));

        self.set_phase(DispatchPhase::Signing);
        let tx = TxRequest {
            nonce,
            gas_price: self.config.gas.gas_price_wei,
            gas_limit,
            to: contract,
            value: 0,
            data,
            chain_id: self.config.chain_id,
        };
        let signed = wallet.sign_transaction(&tx)?;

        self.set_phase(DispatchPhase::Broadcasting);
        let tx_hash = client.send_raw_transaction(&signed.raw).await?;

        Ok(DispatchReceipt {
            tx_hash,
            amount,
            recipient: recipient_addr,
        })
    }

    fn client(&self) -> RpcClient {
        RpcClient::new(self.transport.clone(), self.config.chain_id)
    }

    fn wallet(&self) -> Result<Wallet> {
        if !self.config.has_signing_key() {
            return Err(RewardError::Config("no private key configured".into()));
        }
        Wallet::from_hex_key(&self.config.private_key)
            .map_err(|e| RewardError::Config(e.to_string()))
    }

    fn contract_address(&self) -> Result<Address> {
        Address::from_hex(&self.config.contract_address)
            .map_err(|e| RewardError::Config(format!("bad contract address: {}", e)))
    }

    fn set_status(&self, message: &str, loading: bool) {
        let mut state = self.state.lock().unwrap();
        state.status_message = message.to_string();
        state.is_loading = loading;
    }

    fn set_phase(&self, phase: DispatchPhase) {
        {
            let mut state = self.state.lock().unwrap();
            state.phase = phase;
        }
        tracing::debug!(phase = phase.as_str(), "dispatch phase");
        self.emit(DispatchEvent::Phase { phase });
    }

    fn finish_with_error(&self, context: &str, err: &RewardError) {
        {
            let mut state = self.state.lock().unwrap();
            state.status_message = format!("❌ {}: {}", context, err);
            state.is_loading = false;
        }
        self.log(format!("error: {}", err));
        self.emit(DispatchEvent::Error {
            message: err.to_string(),
        });
    }

    fn log(&self, line: String) {
        tracing::debug!("{}", line);
        {
            let mut state = self.state.lock().unwrap();
            state.debug_log.push_str(&line);
            state.debug_log.push('\n');
        }
        self.emit(DispatchEvent::Log { line });
    }

    fn emit(&self, event: DispatchEvent) {
        if let Some(handler) = &self.on_event {
            handler(event);
        }
    }
}
