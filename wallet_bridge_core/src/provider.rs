// Wallet provider capability - the injected dependency the bridge talks to.
// Implementations exist for:
// - WASM: a wallet object handed in by the page (Solflare, MetaMask shims)
// - Native: a local Solana keypair standing in for a wallet (CLI use)

use crate::error::ProviderError;
use crate::models::Ecosystem;
use crate::transaction::ChainTransaction;
use async_trait::async_trait;

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A wallet that holds key material and signs on request.
///
/// The bridge never sees keys; every method here may prompt the user.
#[async_trait(?Send)]
pub trait WalletProvider {
    /// Ecosystem this provider signs for
    fn ecosystem(&self) -> Ecosystem;

    /// Request account access. Accounts are returned in provider order; the
    /// first one is the canonical account.
    async fn request_accounts(&self) -> ProviderResult<Vec<String>>;

    /// Current provider-side connection flag. Must not prompt.
    fn is_connected(&self) -> bool;

    /// Sign `tx` and return the signed structure.
    async fn sign_transaction(&self, tx: &ChainTransaction) -> ProviderResult<ChainTransaction>;

    async fn disconnect(&self) -> ProviderResult<()> {
        Ok(())
    }
}
