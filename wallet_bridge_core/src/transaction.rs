// Transaction codecs: transport text <-> bytes <-> structured transaction
// for each ecosystem. No signing happens here.

use crate::error::{BridgeError, BridgeResult};
use crate::models::{Ecosystem, TransportEncoding};
use alloy_rlp::Header;
use base64::{engine::general_purpose::STANDARD as Base64Engine, Engine as _};
use solana_program::pubkey::Pubkey;
use solana_sdk::message::VersionedMessage;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::VersionedTransaction;
use std::fmt;

pub fn decode_transport(text: &str, encoding: TransportEncoding) -> BridgeResult<Vec<u8>> {
    let text = text.trim();
    if text.is_empty() {
        return Err(BridgeError::DeserializeError("empty transaction payload".to_string()));
    }
    match encoding {
        TransportEncoding::Base64 => Base64Engine
            .decode(text)
            .map_err(|e| BridgeError::DeserializeError(format!("invalid base64 payload: {}", e))),
        TransportEncoding::Base58 => bs58::decode(text)
            .into_vec()
            .map_err(|e| BridgeError::DeserializeError(format!("invalid base58 payload: {}", e))),
    }
}

pub fn encode_transport(bytes: &[u8], encoding: TransportEncoding) -> String {
    match encoding {
        TransportEncoding::Base64 => Base64Engine.encode(bytes),
        TransportEncoding::Base58 => bs58::encode(bytes).into_string(),
    }
}

/// EIP-2718 transaction type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvmTxType {
    Legacy,
    AccessList,
    DynamicFee,
    Blob,
    SetCode,
    Other(u8),
}

impl EvmTxType {
    fn from_type_byte(b: u8) -> Self {
        match b {
            0x01 => EvmTxType::AccessList,
            0x02 => EvmTxType::DynamicFee,
            0x03 => EvmTxType::Blob,
            0x04 => EvmTxType::SetCode,
            other => EvmTxType::Other(other),
        }
    }
}

impl fmt::Display for EvmTxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvmTxType::Legacy => f.write_str("legacy"),
            EvmTxType::AccessList => f.write_str("eip2930"),
            EvmTxType::DynamicFee => f.write_str("eip1559"),
            EvmTxType::Blob => f.write_str("eip4844"),
            EvmTxType::SetCode => f.write_str("eip7702"),
            EvmTxType::Other(b) => write!(f, "type-0x{:02x}", b),
        }
    }
}

/// An RLP-encoded EVM transaction whose envelope has been validated.
/// Field-level decoding is left to the wallet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvmTransaction {
    pub tx_type: EvmTxType,
    raw: Vec<u8>,
}

impl EvmTransaction {
    pub fn decode(bytes: &[u8]) -> BridgeResult<Self> {
        let first = *bytes
            .first()
            .ok_or_else(|| BridgeError::DeserializeError("empty EVM transaction".to_string()))?;

        let (tx_type, body) = if first >= 0xc0 {
            (EvmTxType::Legacy, bytes)
        } else if first <= 0x7f {
            (EvmTxType::from_type_byte(first), &bytes[1..])
        } else {
            return Err(BridgeError::DeserializeError(format!(
                "invalid EVM transaction prefix 0x{:02x}",
                first
            )));
        };

        let mut buf = body;
        let header = Header::decode(&mut buf)
            .map_err(|e| BridgeError::DeserializeError(format!("invalid RLP header: {}", e)))?;
        if !header.list {
            return Err(BridgeError::DeserializeError("EVM transaction body is not an RLP list".to_string()));
        }
        if header.payload_length != buf.len() {
            return Err(BridgeError::DeserializeError(format!(
                "RLP list declares {} bytes but {} follow",
                header.payload_length,
                buf.len()
            )));
        }

        Ok(Self { tx_type, raw: bytes.to_vec() })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// A deserialized transaction for one of the supported chains.
#[derive(Debug, Clone, PartialEq)]
pub enum ChainTransaction {
    Solana(VersionedTransaction),
    Evm(EvmTransaction),
}

impl ChainTransaction {
    pub fn decode(ecosystem: Ecosystem, bytes: &[u8]) -> BridgeResult<Self> {
        match ecosystem {
            Ecosystem::Solana => decode_solana(bytes).map(ChainTransaction::Solana),
            Ecosystem::Evm => EvmTransaction::decode(bytes).map(ChainTransaction::Evm),
        }
    }

    pub fn encode(&self) -> BridgeResult<Vec<u8>> {
        match self {
            ChainTransaction::Solana(tx) => bincode::serialize(tx)
                .map_err(|e| BridgeError::Unknown(format!("failed to serialize transaction: {}", e))),
            ChainTransaction::Evm(tx) => Ok(tx.raw.clone()),
        }
    }

    pub fn ecosystem(&self) -> Ecosystem {
        match self {
            ChainTransaction::Solana(_) => Ecosystem::Solana,
            ChainTransaction::Evm(_) => Ecosystem::Evm,
        }
    }

    /// Version tag: "legacy" / "v0" for Solana, the EIP-2718 type for EVM.
    pub fn version(&self) -> String {
        match self {
            ChainTransaction::Solana(tx) => match &tx.message {
                VersionedMessage::Legacy(_) => "legacy".to_string(),
                VersionedMessage::V0(_) => "v0".to_string(),
            },
            ChainTransaction::Evm(tx) => tx.tx_type.to_string(),
        }
    }

    pub fn instruction_count(&self) -> Option<usize> {
        match self {
            ChainTransaction::Solana(tx) => Some(tx.message.instructions().len()),
            ChainTransaction::Evm(_) => None,
        }
    }

    pub fn signature_count(&self) -> Option<usize> {
        match self {
            ChainTransaction::Solana(tx) => Some(tx.signatures.len()),
            ChainTransaction::Evm(_) => None,
        }
    }
}

fn decode_solana(bytes: &[u8]) -> BridgeResult<VersionedTransaction> {
    let tx: VersionedTransaction = bincode::deserialize(bytes)
        .map_err(|e| BridgeError::DeserializeError(format!("invalid Solana transaction: {}", e)))?;

    let consumed = bincode::serialized_size(&tx)
        .map_err(|e| BridgeError::DeserializeError(format!("invalid Solana transaction: {}", e)))?;
    if consumed as usize != bytes.len() {
        return Err(BridgeError::DeserializeError(format!(
            "{} trailing bytes after Solana transaction",
            bytes.len() - consumed as usize
        )));
    }

    tx.sanitize()
        .map_err(|e| BridgeError::DeserializeError(format!("malformed Solana transaction: {}", e)))?;
    Ok(tx)
}

/// Index of `signer` among the transaction's required signers.
pub fn signer_slot(tx: &VersionedTransaction, signer: &Pubkey) -> Option<usize> {
    let required = tx.message.header().num_required_signatures as usize;
    tx.message
        .static_account_keys()
        .iter()
        .take(required)
        .position(|k| k == signer)
}

pub fn has_signature_from(tx: &VersionedTransaction, signer: &Pubkey) -> bool {
    signer_slot(tx, signer)
        .and_then(|slot| tx.signatures.get(slot))
        .map(|sig| *sig != Signature::default())
        .unwrap_or(false)
}

/// Whether `signer`'s signature verifies against the transaction's message.
pub fn signature_verifies(tx: &VersionedTransaction, signer: &Pubkey) -> bool {
    let Some(sig) = signer_slot(tx, signer).and_then(|slot| tx.signatures.get(slot)) else {
        return false;
    };
    sig.verify(signer.as_ref(), &tx.message.serialize())
}
