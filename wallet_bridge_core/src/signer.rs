// TransactionSigner - decode an unsigned payload, have the connected wallet
// sign it, re-encode the result for the relay.

use crate::bridge::WalletBridge;
use crate::error::{BridgeError, BridgeResult};
use crate::models::{SignedEnvelope, TransactionEnvelope, TransportEncoding};
use crate::provider::WalletProvider;
use crate::timeout::with_timeout;
use crate::transaction::{
    decode_transport, encode_transport, has_signature_from, signature_verifies, ChainTransaction,
};
use log::{debug, info, warn};

/// Unsigned payloads always arrive as base64.
pub const INBOUND_ENCODING: TransportEncoding = TransportEncoding::Base64;

pub struct TransactionSigner<'a, P> {
    bridge: &'a WalletBridge<P>,
    relay_encoding: TransportEncoding,
}

impl<'a, P: WalletProvider> TransactionSigner<'a, P> {
    pub fn new(bridge: &'a WalletBridge<P>) -> Self {
        Self {
            bridge,
            relay_encoding: TransportEncoding::default(),
        }
    }

    /// Encoding used for the signed payload; fixed for the signer's lifetime.
    pub fn with_relay_encoding(bridge: &'a WalletBridge<P>, relay_encoding: TransportEncoding) -> Self {
        Self { bridge, relay_encoding }
    }

    pub fn relay_encoding(&self) -> TransportEncoding {
        self.relay_encoding
    }

    pub async fn sign(&self, encoded_unsigned: &str) -> BridgeResult<SignedEnvelope> {
        let provider = self.bridge.provider()?;
        let ecosystem = provider.ecosystem();

        // Anything malformed stops here, before the wallet is involved.
        let bytes = decode_transport(encoded_unsigned, INBOUND_ENCODING)?;
        let unsigned = ChainTransaction::decode(ecosystem, &bytes)?;
        debug!(
            "Decoded {} {} transaction ({} bytes)",
            ecosystem,
            unsigned.version(),
            bytes.len()
        );

        let guard = self.bridge.begin_signing()?;
        let owner = guard.connection().address;

        let signed = with_timeout(
            async { provider.sign_transaction(&unsigned).await.map_err(BridgeError::from) },
            self.bridge.prompt_timeout(),
            "signature request",
        )
        .await
        .map_err(|e| {
            warn!("Signing failed: {}", e.status_message());
            debug!("Signing error detail: {}", e);
            e
        })?;

        if signed.ecosystem() != ecosystem {
            return Err(BridgeError::Unknown(format!(
                "wallet returned a {} transaction for a {} request",
                signed.ecosystem(),
                ecosystem
            )));
        }
        if let (ChainTransaction::Solana(tx), Some(pubkey)) = (&signed, owner.as_solana()) {
            if !has_signature_from(tx, pubkey) {
                return Err(BridgeError::Unknown(format!(
                    "wallet returned a transaction without a signature from {}",
                    pubkey
                )));
            }
            if !signature_verifies(tx, pubkey) {
                return Err(BridgeError::Unknown(format!(
                    "signature from {} does not match the returned message",
                    pubkey
                )));
            }
        }

        let payload = encode_transport(&signed.encode()?, self.relay_encoding);
        drop(guard);

        info!("Transaction signed by {} ({} relay encoding)", owner, self.relay_encoding);
        Ok(SignedEnvelope::new(payload, self.relay_encoding))
    }

    /// Sign an envelope from the transaction builder.
    pub async fn sign_envelope(&self, envelope: &TransactionEnvelope) -> BridgeResult<SignedEnvelope> {
        if envelope.signed {
            return Err(BridgeError::InvalidState("envelope is already signed".to_string()));
        }
        if envelope.encoding != INBOUND_ENCODING {
            return Err(BridgeError::DeserializeError(format!(
                "unsigned payloads must be {}, got {}",
                INBOUND_ENCODING, envelope.encoding
            )));
        }
        self.sign(&envelope.encoded_payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::mock::{evm_fixture, MockEvmWallet, MockWallet, SignBehavior, MOCK_EVM_SIGNATURE};
    use crate::error::ErrorKind;
    use crate::transaction::fixtures::unsigned_transfer;
    use crate::transaction::{EvmTransaction, EvmTxType};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use solana_sdk::signature::Signer;
    use solana_sdk::transaction::VersionedTransaction;

    fn unsigned_payload(wallet: &MockWallet) -> String {
        let tx = unsigned_transfer(&wallet.keypair.pubkey());
        STANDARD.encode(bincode::serialize(&tx).unwrap())
    }

    async fn connected(wallet: MockWallet) -> WalletBridge<MockWallet> {
        let bridge = WalletBridge::new(Some(wallet));
        bridge.connect().await.unwrap();
        bridge
    }

    #[tokio::test]
    async fn signs_and_reencodes() {
        let wallet = MockWallet::new();
        let payload = unsigned_payload(&wallet);
        let owner = wallet.keypair.pubkey();
        let bridge = connected(wallet).await;

        let envelope = TransactionSigner::new(&bridge).sign(&payload).await.unwrap();
        assert_eq!(envelope.encoding(), TransportEncoding::Base64);

        let bytes = STANDARD.decode(envelope.into_payload()).unwrap();
        let tx: VersionedTransaction = bincode::deserialize(&bytes).unwrap();
        assert!(has_signature_from(&tx, &owner));
        assert!(tx.verify_with_results().iter().all(|ok| *ok));
        assert_eq!(bridge.state().name(), "connected");
    }

    #[tokio::test]
    async fn malformed_payload_never_reaches_the_wallet() {
        let bridge = connected(MockWallet::new()).await;
        let signer = TransactionSigner::new(&bridge);

        for bad in ["", "%%% not base64 %%%", "AAAA"] {
            let err = signer.sign(bad).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::DeserializeError, "input {:?}", bad);
        }
        assert_eq!(bridge.provider().unwrap().sign_calls.get(), 0);
        assert_eq!(bridge.state().name(), "connected");
    }

    #[tokio::test]
    async fn trailing_bytes_are_rejected() {
        let wallet = MockWallet::new();
        let mut bytes = bincode::serialize(&unsigned_transfer(&wallet.keypair.pubkey())).unwrap();
        bytes.push(0);
        let bridge = connected(wallet).await;

        let err = TransactionSigner::new(&bridge).sign(&STANDARD.encode(bytes)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeserializeError);
        assert_eq!(bridge.provider().unwrap().sign_calls.get(), 0);
    }

    #[tokio::test]
    async fn requires_connection() {
        let wallet = MockWallet::new();
        let payload = unsigned_payload(&wallet);
        let bridge = WalletBridge::new(Some(wallet));

        let err = TransactionSigner::new(&bridge).sign(&payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);

        let none: WalletBridge<MockWallet> = WalletBridge::new(None);
        let err = TransactionSigner::new(&none).sign(&payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProviderUnavailable);
    }

    #[tokio::test]
    async fn rejection_returns_to_connected() {
        let mut wallet = MockWallet::new();
        wallet.sign_behavior = SignBehavior::Reject;
        let payload = unsigned_payload(&wallet);
        let bridge = connected(wallet).await;

        let err = TransactionSigner::new(&bridge).sign(&payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserRejected);
        assert!(!err.is_retryable());
        assert_eq!(bridge.state().name(), "connected");
    }

    #[tokio::test]
    async fn unsigned_return_is_unknown() {
        let mut wallet = MockWallet::new();
        wallet.sign_behavior = SignBehavior::ReturnUnsigned;
        let payload = unsigned_payload(&wallet);
        let bridge = connected(wallet).await;

        let err = TransactionSigner::new(&bridge).sign(&payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(bridge.state().name(), "connected");
    }

    #[tokio::test]
    async fn each_call_yields_an_independent_envelope() {
        let wallet = MockWallet::new();
        let payload = unsigned_payload(&wallet);
        let bridge = connected(wallet).await;
        let signer = TransactionSigner::new(&bridge);

        let first = signer.sign(&payload).await.unwrap();
        let second = signer.sign(&payload).await.unwrap();
        assert_eq!(bridge.provider().unwrap().sign_calls.get(), 2);
        // ed25519 is deterministic, so the payloads match but the envelopes are separate values
        assert_eq!(first.payload(), second.payload());
        let _relayed = first.into_payload();
        assert!(!second.payload().is_empty());
    }

    #[tokio::test]
    async fn base58_relay_encoding() {
        let wallet = MockWallet::new();
        let payload = unsigned_payload(&wallet);
        let bridge = connected(wallet).await;

        let signer = TransactionSigner::with_relay_encoding(&bridge, TransportEncoding::Base58);
        let envelope = signer.sign(&payload).await.unwrap();
        assert_eq!(envelope.encoding(), TransportEncoding::Base58);
        let bytes = bs58::decode(envelope.payload()).into_vec().unwrap();
        assert!(bincode::deserialize::<VersionedTransaction>(&bytes).is_ok());
    }

    #[tokio::test]
    async fn already_signed_envelope_is_refused() {
        let bridge = connected(MockWallet::new()).await;
        let mut envelope = TransactionEnvelope::unsigned("AAAA");
        envelope.signed = true;
        let err = TransactionSigner::new(&bridge).sign_envelope(&envelope).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[tokio::test]
    async fn junk_signature_is_unknown() {
        let mut wallet = MockWallet::new();
        wallet.sign_behavior = SignBehavior::JunkSignature;
        let payload = unsigned_payload(&wallet);
        let bridge = connected(wallet).await;

        let err = TransactionSigner::new(&bridge).sign(&payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(bridge.state().name(), "connected");
    }

    #[tokio::test]
    async fn signs_evm_envelope() {
        let bridge = WalletBridge::new(Some(MockEvmWallet::new()));
        bridge.connect().await.unwrap();
        let unsigned = evm_fixture();

        let envelope = TransactionSigner::new(&bridge)
            .sign(&STANDARD.encode(unsigned.as_bytes()))
            .await
            .unwrap();
        assert_eq!(bridge.provider().unwrap().sign_calls.get(), 1);
        assert_eq!(bridge.state().name(), "connected");

        let bytes = STANDARD.decode(envelope.into_payload()).unwrap();
        let signed = EvmTransaction::decode(&bytes).unwrap();
        assert_eq!(signed.tx_type, EvmTxType::DynamicFee);
        assert!(bytes.ends_with(&MOCK_EVM_SIGNATURE));
        assert_ne!(bytes, unsigned.as_bytes());
    }

    #[tokio::test]
    async fn evm_payload_must_be_an_rlp_envelope() {
        let bridge = WalletBridge::new(Some(MockEvmWallet::new()));
        bridge.connect().await.unwrap();

        let err = TransactionSigner::new(&bridge).sign(&STANDARD.encode([0x02, 0x80])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DeserializeError);
        assert_eq!(bridge.provider().unwrap().sign_calls.get(), 0);
    }

    #[tokio::test]
    async fn wallet_returning_another_chain_is_unknown() {
        let mut wallet = MockEvmWallet::new();
        wallet.sign_behavior = SignBehavior::WrongChain;
        let bridge = WalletBridge::new(Some(wallet));
        bridge.connect().await.unwrap();

        let err = TransactionSigner::new(&bridge)
            .sign(&STANDARD.encode(evm_fixture().as_bytes()))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(bridge.state().name(), "connected");

        let mut wallet = MockWallet::new();
        wallet.sign_behavior = SignBehavior::WrongChain;
        let payload = unsigned_payload(&wallet);
        let bridge = connected(wallet).await;
        let err = TransactionSigner::new(&bridge).sign(&payload).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }
}
