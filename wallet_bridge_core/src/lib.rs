// Wallet Bridge Core Library
// Platform-agnostic wallet connection, balance reads and transaction signing

pub mod amount;
pub mod error;
pub mod models;
pub mod transaction;
pub mod provider;
pub mod timeout;
pub mod bridge;
pub mod rpc_client;
pub mod balance;
pub mod chains;
pub mod signer;
pub mod purchase;
pub mod settings;

#[cfg(feature = "native")]
pub mod native;

#[cfg(all(feature = "wasm", target_arch = "wasm32"))]
pub mod wasm;

// Re-exports
pub use amount::{format_units, parse_units};
pub use balance::{get_balance, BalanceReader, BalanceSource, TokenHolding};
pub use bridge::{BridgeState, WalletBridge};
pub use chains::{ChainBalances, EvmRpc, SolanaRpc};
pub use error::{BridgeError, BridgeResult, ErrorKind, ProviderError};
pub use models::*;
pub use provider::{ProviderResult, WalletProvider};
pub use purchase::{plan_purchases, should_notify, LowBalance, NotificationPrefs, PurchasePlan};
pub use rpc_client::{JsonRpcTransport, RpcRequest, RpcResponse, RpcResult};
pub use settings::Settings;
pub use signer::TransactionSigner;
pub use transaction::{ChainTransaction, EvmTransaction, EvmTxType};
