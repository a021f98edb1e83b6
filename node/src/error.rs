use chainvote_contract::ContractError;
use chainvote_rpc::RpcError;
use chainvote_store::StoreError;
use chainvote_store_lmdb::LmdbError;
use chainvote_websocket::WsError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] LmdbError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("contract error: {0}")]
    Contract(#[from] ContractError),

    #[error("HTTP server error: {0}")]
    Rpc(#[from] RpcError),

    #[error("WebSocket server error: {0}")]
    WebSocket(#[from] WsError),

    #[error("metrics error: {0}")]
    Metrics(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("shutdown timeout")]
    ShutdownTimeout,
}
