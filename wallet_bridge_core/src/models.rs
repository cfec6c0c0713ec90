use crate::amount::{format_units, EVM_NATIVE_DECIMALS, SOLANA_NATIVE_DECIMALS};
use crate::error::{BridgeError, BridgeResult};
use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_program::pubkey::Pubkey;
use std::fmt;
use std::str::FromStr;

/// Wallet ecosystem a provider belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Ecosystem {
    Evm,
    Solana,
}

impl Ecosystem {
    pub fn native_decimals(self) -> u8 {
        match self {
            Ecosystem::Evm => EVM_NATIVE_DECIMALS,
            Ecosystem::Solana => SOLANA_NATIVE_DECIMALS,
        }
    }

    pub fn native_symbol(self) -> &'static str {
        match self {
            Ecosystem::Evm => "ETH",
            Ecosystem::Solana => "SOL",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ecosystem::Evm => f.write_str("evm"),
            Ecosystem::Solana => f.write_str("solana"),
        }
    }
}

impl FromStr for Ecosystem {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "evm" | "ethereum" | "metamask" => Ok(Ecosystem::Evm),
            "solana" | "sol" | "solflare" => Ok(Ecosystem::Solana),
            other => Err(BridgeError::Validation(format!("unknown ecosystem: {}", other))),
        }
    }
}

/// An address in one of the supported ecosystems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletAddress {
    Evm(Address),
    Solana(Pubkey),
}

impl WalletAddress {
    /// Parse `text` as an address of `ecosystem`. Failure is reported as
    /// `OwnerUnparsable`; callers parsing token identifiers remap it.
    pub fn parse(ecosystem: Ecosystem, text: &str) -> BridgeResult<Self> {
        let trimmed = text.trim();
        match ecosystem {
            Ecosystem::Evm => {
                if !trimmed.starts_with("0x") && !trimmed.starts_with("0X") {
                    return Err(BridgeError::OwnerUnparsable(format!("{}: missing 0x prefix", trimmed)));
                }
                Address::from_str(trimmed)
                    .map(WalletAddress::Evm)
                    .map_err(|e| BridgeError::OwnerUnparsable(format!("{}: {}", trimmed, e)))
            }
            Ecosystem::Solana => Pubkey::from_str(trimmed)
                .map(WalletAddress::Solana)
                .map_err(|e| BridgeError::OwnerUnparsable(format!("{}: {}", trimmed, e))),
        }
    }

    pub fn parse_token(ecosystem: Ecosystem, text: &str) -> BridgeResult<Self> {
        Self::parse(ecosystem, text).map_err(|e| match e {
            BridgeError::OwnerUnparsable(msg) => BridgeError::TokenUnparsable(msg),
            other => other,
        })
    }

    pub fn ecosystem(&self) -> Ecosystem {
        match self {
            WalletAddress::Evm(_) => Ecosystem::Evm,
            WalletAddress::Solana(_) => Ecosystem::Solana,
        }
    }

    pub fn as_evm(&self) -> Option<&Address> {
        match self {
            WalletAddress::Evm(a) => Some(a),
            WalletAddress::Solana(_) => None,
        }
    }

    pub fn as_solana(&self) -> Option<&Pubkey> {
        match self {
            WalletAddress::Solana(p) => Some(p),
            WalletAddress::Evm(_) => None,
        }
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletAddress::Evm(a) => write!(f, "{}", a),
            WalletAddress::Solana(p) => write!(f, "{}", p),
        }
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Live connection to a wallet; owned by the bridge for one session.
#[derive(Debug, Clone, Serialize)]
pub struct WalletConnection {
    pub address: WalletAddress,
    pub ecosystem: Ecosystem,
    pub connected_at: DateTime<Utc>,
    pub connected: bool,
}

impl WalletConnection {
    pub fn new(address: WalletAddress) -> Self {
        Self {
            ecosystem: address.ecosystem(),
            address,
            connected_at: Utc::now(),
            connected: true,
        }
    }
}

/// Non-prompting status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// One balance lookup. `token_identifier == None` means the native asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceQuery {
    pub owner_address: String,
    #[serde(default)]
    pub token_identifier: Option<String>,
}

impl BalanceQuery {
    pub fn native(owner: impl Into<String>) -> Self {
        Self { owner_address: owner.into(), token_identifier: None }
    }

    pub fn token(owner: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            owner_address: owner.into(),
            token_identifier: Some(token.into()),
        }
    }
}

/// Where a balance figure came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "address", rename_all = "kebab-case")]
pub enum BalanceOrigin {
    Native,
    /// Solana token account holding the balance
    TokenAccount(String),
    /// EVM token contract queried via balanceOf
    TokenContract(String),
    /// Owner holds no account for the mint; the zero is confirmed, not a failure.
    NoTokenAccount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceResult {
    pub raw_amount: U256,
    pub decimals: u8,
    pub formatted: String,
    pub origin: BalanceOrigin,
}

impl BalanceResult {
    pub fn new(raw_amount: U256, decimals: u8, origin: BalanceOrigin) -> Self {
        Self {
            formatted: format_units(raw_amount, decimals),
            raw_amount,
            decimals,
            origin,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.raw_amount.is_zero()
    }
}

/// Text encoding used to move transaction bytes to and from the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportEncoding {
    #[default]
    Base64,
    Base58,
}

impl fmt::Display for TransportEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportEncoding::Base64 => f.write_str("base64"),
            TransportEncoding::Base58 => f.write_str("base58"),
        }
    }
}

impl FromStr for TransportEncoding {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(TransportEncoding::Base64),
            "base58" => Ok(TransportEncoding::Base58),
            other => Err(BridgeError::Validation(format!("unknown transport encoding: {}", other))),
        }
    }
}

/// Transaction payload in transit. Unsigned envelopes come from the external
/// transaction builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub encoded_payload: String,
    pub encoding: TransportEncoding,
    pub signed: bool,
}

impl TransactionEnvelope {
    pub fn unsigned(encoded_payload: impl Into<String>) -> Self {
        Self {
            encoded_payload: encoded_payload.into(),
            encoding: TransportEncoding::Base64,
            signed: false,
        }
    }
}

/// A signed envelope ready for the relay.
///
/// Must be broadcast at most once; the payload can only be taken by value.
#[derive(Debug, PartialEq, Eq)]
pub struct SignedEnvelope {
    envelope: TransactionEnvelope,
    signed_at: DateTime<Utc>,
}

impl SignedEnvelope {
    pub(crate) fn new(encoded_payload: String, encoding: TransportEncoding) -> Self {
        Self {
            envelope: TransactionEnvelope { encoded_payload, encoding, signed: true },
            signed_at: Utc::now(),
        }
    }

    pub fn encoding(&self) -> TransportEncoding {
        self.envelope.encoding
    }

    pub fn signed_at(&self) -> DateTime<Utc> {
        self.signed_at
    }

    pub fn payload(&self) -> &str {
        &self.envelope.encoded_payload
    }

    /// Hand the payload off to the relay, consuming the envelope.
    pub fn into_payload(self) -> String {
        self.envelope.encoded_payload
    }

    pub fn into_envelope(self) -> TransactionEnvelope {
        self.envelope
    }
}
