use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider code for "user rejected the request" (EIP-1193 4001, also used by
/// the Solana wallet adapters).
pub const USER_REJECTED_CODE: i64 = 4001;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Wallet provider unavailable")]
    ProviderUnavailable,

    #[error("User rejected the request: {0}")]
    UserRejected(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Deserialize error: {0}")]
    DeserializeError(String),

    #[error("Owner address unparsable: {0}")]
    OwnerUnparsable(String),

    #[error("Token identifier unparsable: {0}")]
    TokenUnparsable(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Unknown error: {0}")]
    Unknown(String),

    #[cfg(feature = "native")]
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialization(String),
}

pub type BridgeResult<T> = Result<T, BridgeError>;

/// Fieldless view of [`BridgeError`] for matching and for the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    ProviderUnavailable,
    UserRejected,
    NetworkError,
    DeserializeError,
    OwnerUnparsable,
    TokenUnparsable,
    InvalidState,
    Cancelled,
    Unknown,
    Config,
}

impl BridgeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::ProviderUnavailable => ErrorKind::ProviderUnavailable,
            BridgeError::UserRejected(_) => ErrorKind::UserRejected,
            BridgeError::NetworkError(_) => ErrorKind::NetworkError,
            BridgeError::DeserializeError(_) => ErrorKind::DeserializeError,
            BridgeError::OwnerUnparsable(_) => ErrorKind::OwnerUnparsable,
            BridgeError::TokenUnparsable(_) => ErrorKind::TokenUnparsable,
            BridgeError::InvalidState(_) => ErrorKind::InvalidState,
            BridgeError::Cancelled(_) => ErrorKind::Cancelled,
            BridgeError::Unknown(_) => ErrorKind::Unknown,
            #[cfg(feature = "native")]
            BridgeError::Config(_) => ErrorKind::Config,
            BridgeError::Validation(_)
            | BridgeError::Io(_)
            | BridgeError::Json(_)
            | BridgeError::TomlSerialization(_) => ErrorKind::Config,
        }
    }

    /// Infrastructure failures may be retried; a user's "no" must not be.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::NetworkError(_) | BridgeError::Cancelled(_))
    }

    /// Short status string safe to show to end users.
    pub fn status_message(&self) -> &'static str {
        match self.kind() {
            ErrorKind::ProviderUnavailable => "wallet unavailable",
            ErrorKind::UserRejected => "request rejected",
            ErrorKind::NetworkError => "network error",
            ErrorKind::DeserializeError => "invalid transaction",
            ErrorKind::OwnerUnparsable => "invalid wallet address",
            ErrorKind::TokenUnparsable => "invalid token address",
            ErrorKind::InvalidState => "wallet not ready",
            ErrorKind::Cancelled => "request timed out",
            ErrorKind::Unknown => "wallet error",
            ErrorKind::Config => "configuration error",
        }
    }
}

/// Raw error shape reported by a wallet provider before normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    pub code: Option<i64>,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: Option<i64>, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(Some(USER_REJECTED_CODE), message)
    }

    pub fn is_user_rejection(&self) -> bool {
        self.code == Some(USER_REJECTED_CODE)
    }

    pub fn normalize(self) -> BridgeError {
        if self.is_user_rejection() {
            BridgeError::UserRejected(self.message)
        } else {
            BridgeError::Unknown(self.message)
        }
    }
}

impl From<ProviderError> for BridgeError {
    fn from(err: ProviderError) -> Self {
        err.normalize()
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io(err.to_string())
    }
}

#[cfg(feature = "native")]
impl From<config::ConfigError> for BridgeError {
    fn from(err: config::ConfigError) -> Self {
        BridgeError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for BridgeError {
    fn from(err: toml::ser::Error) -> Self {
        BridgeError::TomlSerialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejection_code_normalizes_to_user_rejected() {
        let err = ProviderError::new(Some(4001), "User denied account access").normalize();
        assert_eq!(err.kind(), ErrorKind::UserRejected);
        assert!(!err.is_retryable());
        assert_eq!(err.status_message(), "request rejected");
    }

    #[test]
    fn other_codes_keep_their_message() {
        let err = ProviderError::new(Some(-32603), "Internal JSON-RPC error").normalize();
        match err {
            BridgeError::Unknown(msg) => assert_eq!(msg, "Internal JSON-RPC error"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn only_infrastructure_failures_are_retryable() {
        assert!(BridgeError::NetworkError("timeout".into()).is_retryable());
        assert!(BridgeError::Cancelled("rpc".into()).is_retryable());
        assert!(!BridgeError::ProviderUnavailable.is_retryable());
        assert!(!BridgeError::DeserializeError("bad".into()).is_retryable());
    }
}
