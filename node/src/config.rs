//! Node configuration with TOML file support.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use chainvote_contract::{ReceiptPolling, DEFAULT_LOG_WINDOW};
use chainvote_types::{ChainId, VoterAddress};
use chainvote_verification::FingerprintMode;
use serde::{Deserialize, Serialize};

use crate::{LogFormat, NodeError};

/// Configuration for a chainvote node.
///
/// Can be loaded from a TOML file via [`NodeConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file is valid apart from `contract_address`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Data directory for the LMDB environment.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum LMDB map size in bytes.
    #[serde(default = "default_lmdb_map_size")]
    pub lmdb_map_size: usize,

    /// Interface the HTTP and WebSocket servers bind to.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    #[serde(default)]
    pub enable_websocket: bool,

    #[serde(default = "default_ws_port")]
    pub websocket_port: u16,

    /// JSON-RPC endpoint of the Ethereum node.
    #[serde(default = "default_eth_rpc_url")]
    pub eth_rpc_url: String,

    /// Per-request timeout for JSON-RPC calls.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Address of the deployed voting contract.
    #[serde(default)]
    pub contract_address: String,

    /// Chain the contract is deployed on; sessions on other chains are
    /// flagged as the wrong network.
    #[serde(default = "default_expected_chain_id")]
    pub expected_chain_id: u64,

    #[serde(default = "default_event_poll_interval_secs")]
    pub event_poll_interval_secs: u64,

    /// First block to scan for contract events on a fresh database.
    #[serde(default)]
    pub event_start_block: u64,

    /// Largest block range requested per `eth_getLogs` call. The poller
    /// catches up one window per tick.
    #[serde(default = "default_event_block_window")]
    pub event_block_window: u64,

    #[serde(default = "default_receipt_poll_attempts")]
    pub receipt_poll_attempts: u32,

    #[serde(default = "default_receipt_poll_interval_ms")]
    pub receipt_poll_interval_ms: u64,

    #[serde(default = "default_otp_ttl_secs")]
    pub otp_ttl_secs: u64,

    /// Return issued codes in API responses. There is no SMS gateway.
    #[serde(default = "default_true")]
    pub otp_demo_mode: bool,

    #[serde(default)]
    pub require_otp_for_vote: bool,

    /// Answer face captures with a fixed digest instead of hashing frames.
    #[serde(default = "default_true")]
    pub face_demo_mode: bool,

    #[serde(default)]
    pub fingerprint_mode: FingerprintMode,

    /// Probability that a simulated biometric check fails.
    #[serde(default = "default_biometric_failure_rate")]
    pub biometric_failure_rate: f64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter, e.g. "info" or "debug,chainvote_rpc=trace".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./chainvote_data")
}

fn default_lmdb_map_size() -> usize {
    1 << 30
}

fn default_bind_address() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

fn default_http_port() -> u16 {
    8080
}

fn default_ws_port() -> u16 {
    8081
}

fn default_eth_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_rpc_timeout_secs() -> u64 {
    30
}

fn default_expected_chain_id() -> u64 {
    ChainId::SEPOLIA.value()
}

fn default_event_poll_interval_secs() -> u64 {
    5
}

fn default_event_block_window() -> u64 {
    DEFAULT_LOG_WINDOW
}

fn default_receipt_poll_attempts() -> u32 {
    60
}

fn default_receipt_poll_interval_ms() -> u64 {
    2_000
}

fn default_otp_ttl_secs() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

fn default_biometric_failure_rate() -> f64 {
    0.2
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, NodeError> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), NodeError> {
        self.contract_address()?;
        self.log_format()?;
        if !(0.0..=1.0).contains(&self.biometric_failure_rate) {
            return Err(NodeError::Config(format!(
                "biometric_failure_rate must be between 0 and 1, got {}",
                self.biometric_failure_rate
            )));
        }
        if self.receipt_poll_attempts == 0 {
            return Err(NodeError::Config("receipt_poll_attempts must be at least 1".into()));
        }
        if self.event_poll_interval_secs == 0 {
            return Err(NodeError::Config("event_poll_interval_secs must be at least 1".into()));
        }
        if self.event_block_window == 0 {
            return Err(NodeError::Config("event_block_window must be at least 1".into()));
        }
        if self.enable_websocket && self.websocket_port == self.http_port {
            return Err(NodeError::Config(
                "websocket_port must differ from http_port".into(),
            ));
        }
        Ok(())
    }

    pub fn contract_address(&self) -> Result<VoterAddress, NodeError> {
        if self.contract_address.trim().is_empty() {
            return Err(NodeError::Config("contract_address is not set".into()));
        }
        VoterAddress::parse(&self.contract_address)
            .map_err(|e| NodeError::Config(format!("contract_address: {e}")))
    }

    pub fn log_format(&self) -> Result<LogFormat, NodeError> {
        self.log_format.parse()
    }

    pub fn expected_chain(&self) -> ChainId {
        ChainId::new(self.expected_chain_id)
    }

    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.http_port)
    }

    pub fn websocket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.websocket_port)
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn event_poll_interval(&self) -> Duration {
        Duration::from_secs(self.event_poll_interval_secs)
    }

    pub fn receipt_polling(&self) -> ReceiptPolling {
        ReceiptPolling {
            attempts: self.receipt_poll_attempts,
            interval: Duration::from_millis(self.receipt_poll_interval_ms),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            lmdb_map_size: default_lmdb_map_size(),
            bind_address: default_bind_address(),
            http_port: default_http_port(),
            enable_websocket: false,
            websocket_port: default_ws_port(),
            eth_rpc_url: default_eth_rpc_url(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            contract_address: String::new(),
            expected_chain_id: default_expected_chain_id(),
            event_poll_interval_secs: default_event_poll_interval_secs(),
            event_start_block: 0,
            event_block_window: default_event_block_window(),
            receipt_poll_attempts: default_receipt_poll_attempts(),
            receipt_poll_interval_ms: default_receipt_poll_interval_ms(),
            otp_ttl_secs: default_otp_ttl_secs(),
            otp_demo_mode: true,
            require_otp_for_vote: false,
            face_demo_mode: true,
            fingerprint_mode: FingerprintMode::Pattern,
            biometric_failure_rate: default_biometric_failure_rate(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}
