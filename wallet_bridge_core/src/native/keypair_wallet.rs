// Native wallet provider backed by a local Solana keypair.
// Stands in for a browser wallet when signing from the CLI.

use crate::error::{BridgeError, BridgeResult, ProviderError};
use crate::models::Ecosystem;
use crate::provider::{ProviderResult, WalletProvider};
use crate::transaction::{signer_slot, ChainTransaction};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as Base64Engine;
use base64::Engine;
use log::debug;
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::cell::Cell;
use std::path::Path;

pub struct KeypairWallet {
    keypair: Keypair,
    connected: Cell<bool>,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self {
            keypair,
            connected: Cell::new(false),
        }
    }

    /// Load a keypair file: a JSON byte array (solana-keygen format), a
    /// base58 secret key, or comma-separated bytes.
    pub fn from_file(path: impl AsRef<Path>) -> BridgeResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_secret(&text)
    }

    /// Read a base64-encoded secret key from an environment variable.
    pub fn from_env_var(var: &str) -> BridgeResult<Option<Self>> {
        let Ok(encoded) = std::env::var(var) else {
            return Ok(None);
        };
        let bytes = Base64Engine
            .decode(encoded.trim())
            .map_err(|e| BridgeError::Validation(format!("{} is not base64: {}", var, e)))?;
        Self::from_bytes(&bytes).map(Some)
    }

    pub fn from_secret(secret: &str) -> BridgeResult<Self> {
        let bytes = parse_private_key_string(secret).map_err(BridgeError::Validation)?;
        Self::from_bytes(&bytes)
    }

    fn from_bytes(bytes: &[u8]) -> BridgeResult<Self> {
        Keypair::try_from(bytes)
            .map(Self::new)
            .map_err(|e| BridgeError::Validation(format!("Invalid keypair: {}", e)))
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

/// Parse a private key string in various formats:
/// - Base58 (standard Solana format, 88 chars)
/// - JSON array string like "[1,2,3,...]"
/// - Comma-separated bytes like "1,2,3,..."
pub fn parse_private_key_string(s: &str) -> Result<Vec<u8>, String> {
    let trimmed = s.trim();

    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<u8>>(trimmed).map_err(|e| format!("JSON parse failed: {}", e));
    }

    if trimmed.contains(',') {
        return trimmed
            .split(',')
            .map(|s| s.trim().parse::<u8>())
            .collect::<Result<Vec<u8>, _>>()
            .map_err(|e| format!("CSV parse failed: {}", e));
    }

    if trimmed.len() >= 80 {
        return bs58::decode(trimmed)
            .into_vec()
            .map_err(|e| format!("Base58 decode failed: {}", e));
    }

    Err("Unrecognized private key format. Expected: base58, JSON array, or comma-separated bytes".to_string())
}

#[async_trait(?Send)]
impl WalletProvider for KeypairWallet {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Solana
    }

    async fn request_accounts(&self) -> ProviderResult<Vec<String>> {
        self.connected.set(true);
        Ok(vec![self.keypair.pubkey().to_string()])
    }

    fn is_connected(&self) -> bool {
        self.connected.get()
    }

    async fn sign_transaction(&self, tx: &ChainTransaction) -> ProviderResult<ChainTransaction> {
        let ChainTransaction::Solana(unsigned) = tx else {
            return Err(ProviderError::new(None, "keypair wallet only signs Solana transactions"));
        };

        let pubkey = self.keypair.pubkey();
        let slot = signer_slot(unsigned, &pubkey)
            .ok_or_else(|| ProviderError::new(None, format!("{} is not a required signer", pubkey)))?;

        // Partial sign: only our slot changes, other signers keep theirs.
        let mut signed = unsigned.clone();
        let signature = self.keypair.sign_message(&signed.message.serialize());
        *signed
            .signatures
            .get_mut(slot)
            .ok_or_else(|| ProviderError::new(None, format!("transaction has no signature slot {}", slot)))? = signature;
        debug!("Signed slot {} of {} as {}", slot, signed.signatures.len(), pubkey);
        Ok(ChainTransaction::Solana(signed))
    }

    async fn disconnect(&self) -> ProviderResult<()> {
        self.connected.set(false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{fixtures::unsigned_transfer, has_signature_from};
    use std::io::Write;

    #[test]
    fn loads_json_keypair_file() {
        let keypair = Keypair::new();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", serde_json::to_string(&keypair.to_bytes().to_vec()).unwrap()).unwrap();

        let wallet = KeypairWallet::from_file(file.path()).unwrap();
        assert_eq!(wallet.pubkey(), keypair.pubkey());
    }

    #[test]
    fn parses_base58_and_csv_secrets() {
        let keypair = Keypair::new();
        let b58 = keypair.to_base58_string();
        assert_eq!(KeypairWallet::from_secret(&b58).unwrap().pubkey(), keypair.pubkey());

        let csv = keypair.to_bytes().iter().map(|b| b.to_string()).collect::<Vec<_>>().join(",");
        assert_eq!(KeypairWallet::from_secret(&csv).unwrap().pubkey(), keypair.pubkey());

        assert!(KeypairWallet::from_secret("short").is_err());
    }

    #[tokio::test]
    async fn signs_only_its_own_slot() {
        let wallet = KeypairWallet::new(Keypair::new());
        let tx = ChainTransaction::Solana(unsigned_transfer(&wallet.pubkey()));

        let ChainTransaction::Solana(signed) = wallet.sign_transaction(&tx).await.unwrap() else {
            panic!("expected a Solana transaction");
        };
        assert!(has_signature_from(&signed, &wallet.pubkey()));

        let stranger = KeypairWallet::new(Keypair::new());
        let err = stranger.sign_transaction(&tx).await.unwrap_err();
        assert!(!err.is_user_rejection());
    }

    #[tokio::test]
    async fn missing_signature_slot_is_an_error() {
        let wallet = KeypairWallet::new(Keypair::new());
        let mut unsigned = unsigned_transfer(&wallet.pubkey());
        unsigned.signatures.clear();

        let err = wallet.sign_transaction(&ChainTransaction::Solana(unsigned)).await.unwrap_err();
        assert!(!err.is_user_rejection());
    }
}
