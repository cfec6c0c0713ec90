// BalanceReader - native and token balances through an RPC connection,
// returned as exact decimals.

use crate::error::{BridgeError, BridgeResult};
use crate::models::{BalanceOrigin, BalanceQuery, BalanceResult, Ecosystem, WalletAddress};
use crate::timeout::with_timeout;
use alloy_primitives::U256;
use async_trait::async_trait;
use log::{debug, warn};
use lru::LruCache;
use std::cell::RefCell;
use std::num::NonZeroUsize;
use std::time::Duration;

/// A token balance as found on chain, before formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHolding {
    pub raw_amount: U256,
    /// Decimals when the lookup already carried them
    pub decimals: Option<u8>,
    pub origin: BalanceOrigin,
}

/// Chain-specific balance queries
#[async_trait(?Send)]
pub trait BalanceSource {
    fn ecosystem(&self) -> Ecosystem;

    /// Native balance in the chain's smallest unit
    async fn native_balance(&self, owner: &WalletAddress) -> BridgeResult<U256>;

    /// Token balance held by `owner`. `None` means the owner has no
    /// sub-account for the token, which is a confirmed zero.
    async fn token_holding(&self, owner: &WalletAddress, token: &WalletAddress) -> BridgeResult<Option<TokenHolding>>;

    async fn token_decimals(&self, token: &WalletAddress) -> BridgeResult<u8>;
}

pub struct BalanceReader<S> {
    source: S,
    decimals_cache: RefCell<LruCache<String, u8>>,
    rpc_timeout: Option<Duration>,
}

impl<S: BalanceSource> BalanceReader<S> {
    pub fn new(source: S, cache_capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            source,
            decimals_cache: RefCell::new(LruCache::new(capacity)),
            rpc_timeout: None,
        }
    }

    pub fn with_rpc_timeout(mut self, limit: Option<Duration>) -> Self {
        self.rpc_timeout = limit;
        self
    }

    pub fn ecosystem(&self) -> Ecosystem {
        self.source.ecosystem()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Look up a balance. Failures are returned as errors, never as a zero.
    pub async fn get_balance(&self, query: &BalanceQuery) -> BridgeResult<BalanceResult> {
        let ecosystem = self.source.ecosystem();
        let owner = WalletAddress::parse(ecosystem, &query.owner_address)?;

        let result = match &query.token_identifier {
            None => {
                let raw = with_timeout(self.source.native_balance(&owner), self.rpc_timeout, "native balance").await?;
                BalanceResult::new(raw, ecosystem.native_decimals(), BalanceOrigin::Native)
            }
            Some(token) => {
                let token = WalletAddress::parse_token(ecosystem, token)?;
                self.token_balance(&owner, &token).await?
            }
        };

        debug!(
            "Balance for {} ({}): {}",
            owner,
            query.token_identifier.as_deref().unwrap_or(ecosystem.native_symbol()),
            result.formatted
        );
        Ok(result)
    }

    async fn token_balance(&self, owner: &WalletAddress, token: &WalletAddress) -> BridgeResult<BalanceResult> {
        let holding = with_timeout(
            self.source.token_holding(owner, token),
            self.rpc_timeout,
            "token balance",
        )
        .await?;

        match holding {
            Some(h) => {
                let decimals = match h.decimals {
                    Some(d) => {
                        self.decimals_cache.borrow_mut().put(token.to_string(), d);
                        d
                    }
                    None => self.decimals_for(token).await?,
                };
                Ok(BalanceResult::new(h.raw_amount, decimals, h.origin))
            }
            None => {
                warn!("No token account found for mint {} owned by {}", token, owner);
                let decimals = self.decimals_for(token).await?;
                Ok(BalanceResult::new(U256::ZERO, decimals, BalanceOrigin::NoTokenAccount))
            }
        }
    }

    async fn decimals_for(&self, token: &WalletAddress) -> BridgeResult<u8> {
        let key = token.to_string();
        if let Some(d) = self.decimals_cache.borrow_mut().get(&key) {
            return Ok(*d);
        }
        let d = with_timeout(self.source.token_decimals(token), self.rpc_timeout, "token decimals").await?;
        self.decimals_cache.borrow_mut().put(key, d);
        Ok(d)
    }

    pub fn cached_decimals(&self, token: &str) -> Option<u8> {
        self.decimals_cache.borrow().peek(token).copied()
    }
}

/// Convenience for callers holding strings
pub async fn get_balance<S: BalanceSource>(
    reader: &BalanceReader<S>,
    owner: &str,
    token: Option<&str>,
) -> BridgeResult<BalanceResult> {
    let query = BalanceQuery {
        owner_address: owner.to_string(),
        token_identifier: token.map(str::to_string),
    };
    reader.get_balance(&query).await
}

pub(crate) fn ensure_solana(addr: &WalletAddress) -> BridgeResult<&solana_program::pubkey::Pubkey> {
    addr.as_solana()
        .ok_or_else(|| BridgeError::OwnerUnparsable(format!("{} is not a Solana address", addr)))
}

pub(crate) fn ensure_evm(addr: &WalletAddress) -> BridgeResult<&alloy_primitives::Address> {
    addr.as_evm()
        .ok_or_else(|| BridgeError::OwnerUnparsable(format!("{} is not an EVM address", addr)))
}
