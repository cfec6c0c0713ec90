use crate::amount::parse_hex_quantity;
use crate::balance::{ensure_evm, BalanceSource, TokenHolding};
use crate::error::{BridgeError, BridgeResult};
use crate::models::{BalanceOrigin, Ecosystem, WalletAddress};
use crate::rpc_client::{unexpected, JsonRpcTransport};
use alloy_primitives::{hex, Address, U256};
use async_trait::async_trait;
use log::debug;
use serde_json::json;

/// `balanceOf(address)`
pub const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];
/// `decimals()`
pub const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// EVM balance queries over JSON-RPC
pub struct EvmRpc<T> {
    transport: T,
    block: String,
}

impl<T: JsonRpcTransport> EvmRpc<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            block: "latest".to_string(),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn get_balance(&self, owner: &Address) -> BridgeResult<U256> {
        debug!("EVM RPC: eth_getBalance for {}", owner);
        let result = self
            .transport
            .call("eth_getBalance", json!([owner.to_string(), self.block]))
            .await?;
        let quantity = result
            .as_str()
            .ok_or_else(|| unexpected("eth_getBalance", "result is not a hex string"))?;
        parse_hex_quantity(quantity)
    }

    /// Read-only contract call returning the raw return data
    pub async fn eth_call(&self, to: &Address, data: &[u8]) -> BridgeResult<Vec<u8>> {
        let params = json!([{ "to": to.to_string(), "data": hex::encode_prefixed(data) }, self.block]);
        let result = self.transport.call("eth_call", params).await?;
        let text = result
            .as_str()
            .ok_or_else(|| unexpected("eth_call", "result is not a hex string"))?;
        hex::decode(text.trim_start_matches("0x"))
            .map_err(|e| BridgeError::NetworkError(format!("eth_call: bad return data: {}", e)))
    }

    pub async fn balance_of(&self, token: &Address, owner: &Address) -> BridgeResult<U256> {
        debug!("EVM RPC: balanceOf({}) on {}", owner, token);
        let data = self.eth_call(token, &encode_balance_of(owner)).await?;
        first_word(&data, "balanceOf")
    }

    pub async fn decimals(&self, token: &Address) -> BridgeResult<u8> {
        debug!("EVM RPC: decimals() on {}", token);
        let data = self.eth_call(token, &DECIMALS_SELECTOR).await?;
        let word = first_word(&data, "decimals")?;
        if word > U256::from(u8::MAX) {
            return Err(unexpected("decimals", "value out of range"));
        }
        Ok(word.byte(0))
    }
}

pub fn encode_balance_of(owner: &Address) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + 32);
    data.extend_from_slice(&BALANCE_OF_SELECTOR);
    data.extend_from_slice(&[0u8; 12]);
    data.extend_from_slice(owner.as_slice());
    data
}

/// First ABI word of the return data. Empty data means the address has no
/// contract code or the call reverted silently.
fn first_word(data: &[u8], what: &str) -> BridgeResult<U256> {
    if data.len() < 32 {
        return Err(unexpected(what, &format!("{} bytes of return data", data.len())));
    }
    Ok(U256::from_be_slice(&data[..32]))
}

#[async_trait(?Send)]
impl<T: JsonRpcTransport> BalanceSource for EvmRpc<T> {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Evm
    }

    async fn native_balance(&self, owner: &WalletAddress) -> BridgeResult<U256> {
        self.get_balance(ensure_evm(owner)?).await
    }

    async fn token_holding(&self, owner: &WalletAddress, token: &WalletAddress) -> BridgeResult<Option<TokenHolding>> {
        let owner = ensure_evm(owner)?;
        let token = token
            .as_evm()
            .ok_or_else(|| BridgeError::TokenUnparsable(format!("{} is not an EVM contract", token)))?;

        // Contract balances always exist; a holder without tokens reads zero.
        let raw_amount = self.balance_of(token, owner).await?;
        Ok(Some(TokenHolding {
            raw_amount,
            decimals: None,
            origin: BalanceOrigin::TokenContract(token.to_string()),
        }))
    }

    async fn token_decimals(&self, token: &WalletAddress) -> BridgeResult<u8> {
        let token = token
            .as_evm()
            .ok_or_else(|| BridgeError::TokenUnparsable(format!("{} is not an EVM contract", token)))?;
        self.decimals(token).await
    }
}
