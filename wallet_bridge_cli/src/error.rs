use thiserror::Error;
use wallet_bridge_core::BridgeError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("Invalid keypair: {0}")]
    InvalidKeypair(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
