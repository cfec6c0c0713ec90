// Chain views backing BalanceReader.
// Each one speaks a chain's JSON-RPC dialect over any JsonRpcTransport.

pub mod evm;
pub mod solana;

pub use evm::EvmRpc;
pub use solana::SolanaRpc;

use crate::balance::{BalanceSource, TokenHolding};
use crate::error::BridgeResult;
use crate::models::{Ecosystem, WalletAddress};
use crate::rpc_client::JsonRpcTransport;
use alloy_primitives::U256;
use async_trait::async_trait;

/// One balance source per ecosystem, chosen at runtime.
pub enum ChainBalances<T> {
    Solana(SolanaRpc<T>),
    Evm(EvmRpc<T>),
}

impl<T: JsonRpcTransport> ChainBalances<T> {
    pub fn for_ecosystem(ecosystem: Ecosystem, transport: T) -> Self {
        match ecosystem {
            Ecosystem::Solana => ChainBalances::Solana(SolanaRpc::new(transport)),
            Ecosystem::Evm => ChainBalances::Evm(EvmRpc::new(transport)),
        }
    }

    pub fn transport(&self) -> &T {
        match self {
            ChainBalances::Solana(s) => s.transport(),
            ChainBalances::Evm(e) => e.transport(),
        }
    }
}

#[async_trait(?Send)]
impl<T: JsonRpcTransport> BalanceSource for ChainBalances<T> {
    fn ecosystem(&self) -> Ecosystem {
        match self {
            ChainBalances::Solana(_) => Ecosystem::Solana,
            ChainBalances::Evm(_) => Ecosystem::Evm,
        }
    }

    async fn native_balance(&self, owner: &WalletAddress) -> BridgeResult<U256> {
        match self {
            ChainBalances::Solana(s) => s.native_balance(owner).await,
            ChainBalances::Evm(e) => e.native_balance(owner).await,
        }
    }

    async fn token_holding(&self, owner: &WalletAddress, token: &WalletAddress) -> BridgeResult<Option<TokenHolding>> {
        match self {
            ChainBalances::Solana(s) => s.token_holding(owner, token).await,
            ChainBalances::Evm(e) => e.token_holding(owner, token).await,
        }
    }

    async fn token_decimals(&self, token: &WalletAddress) -> BridgeResult<u8> {
        match self {
            ChainBalances::Solana(s) => s.token_decimals(token).await,
            ChainBalances::Evm(e) => e.token_decimals(token).await,
        }
    }
}
