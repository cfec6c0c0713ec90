// Wallet Bridge WASM Bindings
// Browser surface over the injected wallet and fetch-based RPC

#![cfg(target_arch = "wasm32")]

use log::{info, warn};
use serde::Serialize;
use std::rc::Rc;
use wallet_bridge_core::wasm::{FetchRpcTransport, WasmWalletProvider};
use wallet_bridge_core::{
    BalanceOrigin, BalanceQuery, BalanceReader, BridgeError, ChainBalances, Ecosystem, ErrorKind, Settings,
    TransactionSigner, TransportEncoding, WalletBridge,
};
use wasm_bindgen::prelude::*;

// Initialize panic hook and logger for WASM
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

/// Error shape the UI receives on rejection
#[derive(Serialize)]
struct JsBridgeError {
    kind: ErrorKind,
    message: String,
    status: &'static str,
    retryable: bool,
}

fn to_js_error(err: BridgeError) -> JsValue {
    let payload = JsBridgeError {
        kind: err.kind(),
        message: err.to_string(),
        status: err.status_message(),
        retryable: err.is_retryable(),
    };
    serde_wasm_bindgen::to_value(&payload).unwrap_or_else(|_| JsValue::from_str(&payload.message))
}

/// Balance as shown in the UI; the raw amount is a decimal string so no
/// precision is lost in JS numbers.
#[derive(Serialize)]
struct BalanceView {
    raw_amount: String,
    decimals: u8,
    formatted: String,
    origin: BalanceOrigin,
}

type Reader = BalanceReader<ChainBalances<FetchRpcTransport>>;

#[wasm_bindgen]
pub struct WalletSession {
    bridge: Rc<WalletBridge<WasmWalletProvider>>,
    reader: Rc<Reader>,
    relay_encoding: TransportEncoding,
}

#[wasm_bindgen]
impl WalletSession {
    /// `wallet` may be null/undefined when no extension is installed; the
    /// session then reports the wallet as unavailable.
    #[wasm_bindgen(constructor)]
    pub fn new(ecosystem: &str, wallet: JsValue, settings_json: Option<String>) -> Result<WalletSession, JsValue> {
        let ecosystem: Ecosystem = ecosystem.parse().map_err(to_js_error)?;
        let settings: Settings = match settings_json {
            Some(json) => serde_json::from_str(&json).map_err(|e| to_js_error(e.into()))?,
            None => Settings::default(),
        };
        settings.validate().map_err(to_js_error)?;

        let rpc_url = match ecosystem {
            Ecosystem::Solana => settings.solana_rpc_url.clone(),
            Ecosystem::Evm => settings.evm_rpc_url.clone(),
        };
        let provider = WasmWalletProvider::from_js(ecosystem, wallet);
        if provider.is_none() {
            warn!("No {} wallet injected", ecosystem);
        }

        let bridge = WalletBridge::new(provider).with_prompt_timeout(settings.prompt_timeout());
        let reader = BalanceReader::new(
            ChainBalances::for_ecosystem(ecosystem, FetchRpcTransport::new(rpc_url)),
            settings.decimals_cache_capacity,
        )
        .with_rpc_timeout(Some(settings.rpc_timeout()));

        info!("Wallet session created for {}", ecosystem);
        Ok(Self {
            bridge: Rc::new(bridge),
            reader: Rc::new(reader),
            relay_encoding: settings.relay_encoding,
        })
    }

    /// Prompt for account access; resolves to the connected address.
    #[wasm_bindgen]
    pub async fn connect(&self) -> Result<String, JsValue> {
        let bridge = Rc::clone(&self.bridge);
        let address = bridge.connect().await.map_err(to_js_error)?;
        Ok(address.to_string())
    }

    #[wasm_bindgen]
    pub fn is_connected(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.bridge.is_connected()).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    #[wasm_bindgen]
    pub fn state(&self) -> String {
        self.bridge.state().name().to_string()
    }

    #[wasm_bindgen]
    pub fn address(&self) -> Option<String> {
        self.bridge.connection().map(|c| c.address.to_string())
    }

    /// Balance of `owner` (defaults to the connected address); `token` is a
    /// mint or contract address, omitted for the native asset.
    #[wasm_bindgen]
    pub async fn get_balance(&self, owner: Option<String>, token: Option<String>) -> Result<JsValue, JsValue> {
        let owner = owner
            .or_else(|| self.address())
            .ok_or_else(|| to_js_error(BridgeError::InvalidState("no owner and no connected wallet".to_string())))?;
        let reader = Rc::clone(&self.reader);
        let query = BalanceQuery {
            owner_address: owner,
            token_identifier: token,
        };
        let result = reader.get_balance(&query).await.map_err(to_js_error)?;

        let view = BalanceView {
            raw_amount: result.raw_amount.to_string(),
            decimals: result.decimals,
            formatted: result.formatted,
            origin: result.origin,
        };
        serde_wasm_bindgen::to_value(&view).map_err(|e| JsValue::from_str(&e.to_string()))
    }

    /// Sign a base64 unsigned transaction; resolves to the relay-encoded
    /// signed transaction.
    #[wasm_bindgen]
    pub async fn sign(&self, unsigned_base64: String) -> Result<String, JsValue> {
        let bridge = Rc::clone(&self.bridge);
        let signer = TransactionSigner::with_relay_encoding(&bridge, self.relay_encoding);
        let envelope = signer.sign(&unsigned_base64).await.map_err(to_js_error)?;
        Ok(envelope.into_payload())
    }

    #[wasm_bindgen]
    pub fn relay_encoding(&self) -> String {
        self.relay_encoding.to_string()
    }

    #[wasm_bindgen]
    pub async fn disconnect(&self) -> Result<(), JsValue> {
        let bridge = Rc::clone(&self.bridge);
        bridge.disconnect().await.map_err(to_js_error)
    }
}

/// Exact decimal rendering of a raw integer amount.
#[wasm_bindgen]
pub fn format_units(raw: &str, decimals: u8) -> Result<String, JsValue> {
    let raw = wallet_bridge_core::parse_units(raw, 0).map_err(to_js_error)?;
    Ok(wallet_bridge_core::format_units(raw, decimals))
}
