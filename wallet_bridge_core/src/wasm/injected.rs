// Injected wallet provider - the page hands in an object wrapping the
// browser wallet (window.ethereum, window.solflare) with a byte-level
// interface:
//
//   requestAccounts(): Promise<string[]>
//   isConnected: boolean
//   signTransaction(tx: Uint8Array): Promise<Uint8Array>
//   disconnect(): Promise<void>          (optional)
//
// Rejections carry the wallet's `{ code, message }` error.

use crate::error::ProviderError;
use crate::models::Ecosystem;
use crate::provider::{ProviderResult, WalletProvider};
use crate::transaction::ChainTransaction;
use async_trait::async_trait;
use js_sys::{Array, Promise, Reflect, Uint8Array};
use log::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

#[wasm_bindgen]
extern "C" {
    pub type InjectedWallet;

    #[wasm_bindgen(method, catch, js_name = requestAccounts)]
    fn request_accounts(this: &InjectedWallet) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, getter, js_name = isConnected)]
    fn is_connected(this: &InjectedWallet) -> JsValue;

    #[wasm_bindgen(method, catch, js_name = signTransaction)]
    fn sign_transaction(this: &InjectedWallet, tx: Uint8Array) -> Result<Promise, JsValue>;

    #[wasm_bindgen(method, catch)]
    fn disconnect(this: &InjectedWallet) -> Result<Promise, JsValue>;
}

/// Turn a thrown JS value into the provider error shape.
pub fn provider_error(err: &JsValue) -> ProviderError {
    let code = Reflect::get(err, &JsValue::from_str("code"))
        .ok()
        .and_then(|c| c.as_f64())
        .map(|c| c as i64);
    let message = Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| err.as_string())
        .unwrap_or_else(|| format!("{:?}", err));
    ProviderError::new(code, message)
}

pub struct WasmWalletProvider {
    ecosystem: Ecosystem,
    wallet: InjectedWallet,
}

impl WasmWalletProvider {
    /// `None` when the page has no wallet to offer.
    pub fn from_js(ecosystem: Ecosystem, value: JsValue) -> Option<Self> {
        if value.is_null() || value.is_undefined() {
            return None;
        }
        Some(Self {
            ecosystem,
            wallet: value.unchecked_into(),
        })
    }

    fn has_method(&self, name: &str) -> bool {
        Reflect::get(self.wallet.as_ref(), &JsValue::from_str(name))
            .map(|f| f.is_function())
            .unwrap_or(false)
    }
}

async fn settle(promise: Result<Promise, JsValue>) -> ProviderResult<JsValue> {
    let promise = promise.map_err(|e| provider_error(&e))?;
    JsFuture::from(promise).await.map_err(|e| provider_error(&e))
}

#[async_trait(?Send)]
impl WalletProvider for WasmWalletProvider {
    fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    async fn request_accounts(&self) -> ProviderResult<Vec<String>> {
        let value = settle(self.wallet.request_accounts()).await?;
        let accounts: Array = value
            .dyn_into()
            .map_err(|_| ProviderError::new(None, "requestAccounts did not return an array"))?;
        accounts
            .iter()
            .map(|a| {
                a.as_string()
                    .ok_or_else(|| ProviderError::new(None, "requestAccounts returned a non-string account"))
            })
            .collect()
    }

    fn is_connected(&self) -> bool {
        self.wallet.is_connected().as_bool().unwrap_or(false)
    }

    async fn sign_transaction(&self, tx: &ChainTransaction) -> ProviderResult<ChainTransaction> {
        let bytes = tx
            .encode()
            .map_err(|e| ProviderError::new(None, e.to_string()))?;
        debug!("Handing {} bytes to the injected wallet for signing", bytes.len());

        let value = settle(self.wallet.sign_transaction(Uint8Array::from(bytes.as_slice()))).await?;
        let signed: Uint8Array = value
            .dyn_into()
            .map_err(|_| ProviderError::new(None, "signTransaction did not return bytes"))?;

        ChainTransaction::decode(self.ecosystem, &signed.to_vec())
            .map_err(|e| ProviderError::new(None, format!("wallet returned an undecodable transaction: {}", e)))
    }

    async fn disconnect(&self) -> ProviderResult<()> {
        if !self.has_method("disconnect") {
            return Ok(());
        }
        settle(self.wallet.disconnect()).await.map(|_| ())
    }
}
