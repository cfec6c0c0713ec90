use crate::balance::{ensure_solana, BalanceSource, TokenHolding};
use crate::error::{BridgeError, BridgeResult};
use crate::models::{BalanceOrigin, Ecosystem, WalletAddress};
use crate::rpc_client::{unexpected, JsonRpcTransport};
use alloy_primitives::U256;
use async_trait::async_trait;
use log::debug;
use serde_json::{json, Value};
use solana_program::pubkey::Pubkey;
use spl_associated_token_account::get_associated_token_address_with_program_id;

pub const DEFAULT_COMMITMENT: &str = "confirmed";

/// Solana balance queries over JSON-RPC
pub struct SolanaRpc<T> {
    transport: T,
    commitment: String,
}

impl<T: JsonRpcTransport> SolanaRpc<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            commitment: DEFAULT_COMMITMENT.to_string(),
        }
    }

    pub fn with_commitment(mut self, commitment: impl Into<String>) -> Self {
        self.commitment = commitment.into();
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn get_balance(&self, owner: &Pubkey) -> BridgeResult<u64> {
        debug!("Solana RPC: getBalance for {}", owner);
        let params = json!([owner.to_string(), { "commitment": self.commitment }]);
        let result = self.transport.call("getBalance", params).await?;

        result["value"]
            .as_u64()
            .ok_or_else(|| unexpected("getBalance", "missing lamports value"))
    }

    /// Token accounts of `owner` for `mint`, as `(account, holding)` pairs.
    pub async fn get_token_accounts_by_owner(&self, owner: &Pubkey, mint: &Pubkey) -> BridgeResult<Vec<(Pubkey, ParsedTokenAmount)>> {
        debug!("Solana RPC: getTokenAccountsByOwner for {} (mint {})", owner, mint);
        let params = json!([
            owner.to_string(),
            { "mint": mint.to_string() },
            { "encoding": "jsonParsed", "commitment": self.commitment }
        ]);
        let result = self.transport.call("getTokenAccountsByOwner", params).await?;

        let accounts = result["value"]
            .as_array()
            .ok_or_else(|| unexpected("getTokenAccountsByOwner", "missing account list"))?;

        accounts.iter().map(parse_token_account).collect()
    }

    pub async fn get_token_supply_decimals(&self, mint: &Pubkey) -> BridgeResult<u8> {
        debug!("Solana RPC: getTokenSupply for {}", mint);
        let result = self
            .transport
            .call("getTokenSupply", json!([mint.to_string(), { "commitment": self.commitment }]))
            .await?;

        result["value"]["decimals"]
            .as_u64()
            .and_then(|d| u8::try_from(d).ok())
            .ok_or_else(|| unexpected("getTokenSupply", "missing decimals"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTokenAmount {
    pub amount: U256,
    pub decimals: u8,
}

fn parse_token_account(entry: &Value) -> BridgeResult<(Pubkey, ParsedTokenAmount)> {
    const METHOD: &str = "getTokenAccountsByOwner";

    let pubkey = entry["pubkey"]
        .as_str()
        .and_then(|s| s.parse::<Pubkey>().ok())
        .ok_or_else(|| unexpected(METHOD, "token account without pubkey"))?;

    let token_amount = &entry["account"]["data"]["parsed"]["info"]["tokenAmount"];
    let amount = token_amount["amount"]
        .as_str()
        .ok_or_else(|| unexpected(METHOD, "token account without amount"))
        .and_then(|s| {
            U256::from_str_radix(s, 10)
                .map_err(|e| BridgeError::NetworkError(format!("{}: bad amount {:?}: {}", METHOD, s, e)))
        })?;
    let decimals = token_amount["decimals"]
        .as_u64()
        .and_then(|d| u8::try_from(d).ok())
        .ok_or_else(|| unexpected(METHOD, "token account without decimals"))?;

    Ok((pubkey, ParsedTokenAmount { amount, decimals }))
}

#[async_trait(?Send)]
impl<T: JsonRpcTransport> BalanceSource for SolanaRpc<T> {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Solana
    }

    async fn native_balance(&self, owner: &WalletAddress) -> BridgeResult<U256> {
        let lamports = self.get_balance(ensure_solana(owner)?).await?;
        Ok(U256::from(lamports))
    }

    async fn token_holding(&self, owner: &WalletAddress, token: &WalletAddress) -> BridgeResult<Option<TokenHolding>> {
        let owner = ensure_solana(owner)?;
        let mint = token
            .as_solana()
            .ok_or_else(|| BridgeError::TokenUnparsable(format!("{} is not a Solana mint", token)))?;

        let accounts = self.get_token_accounts_by_owner(owner, mint).await?;
        if accounts.is_empty() {
            return Ok(None);
        }

        // The associated token account is canonical; otherwise take the first.
        let ata = get_associated_token_address_with_program_id(owner, mint, &spl_token::id());
        let (account, parsed) = accounts
            .iter()
            .find(|(pk, _)| *pk == ata)
            .or_else(|| accounts.first())
            .cloned()
            .ok_or_else(|| unexpected("getTokenAccountsByOwner", "empty account list"))?;
        if accounts.len() > 1 {
            debug!("{} token accounts for mint {}, using {}", accounts.len(), mint, account);
        }

        Ok(Some(TokenHolding {
            raw_amount: parsed.amount,
            decimals: Some(parsed.decimals),
            origin: BalanceOrigin::TokenAccount(account.to_string()),
        }))
    }

    async fn token_decimals(&self, token: &WalletAddress) -> BridgeResult<u8> {
        let mint = token
            .as_solana()
            .ok_or_else(|| BridgeError::TokenUnparsable(format!("{} is not a Solana mint", token)))?;
        self.get_token_supply_decimals(mint).await
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    pub fn token_account(pubkey: &str, mint: &str, owner: &str, amount: &str, decimals: u8) -> Value {
        json!({
            "pubkey": pubkey,
            "account": {
                "data": {
                    "parsed": {
                        "info": {
                            "isNative": false,
                            "mint": mint,
                            "owner": owner,
                            "state": "initialized",
                            "tokenAmount": {
                                "amount": amount,
                                "decimals": decimals,
                                "uiAmountString": amount
                            }
                        },
                        "type": "account"
                    },
                    "program": "spl-token",
                    "space": 165
                },
                "executable": false,
                "lamports": 2039280,
                "owner": "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA"
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::token_account;
    use super::*;
    use crate::rpc_client::mock::MockTransport;

    #[tokio::test]
    async fn prefers_associated_token_account() {
        let owner = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ata = get_associated_token_address_with_program_id(&owner, &mint, &spl_token::id());
        let stray = Pubkey::new_unique();

        let transport = MockTransport::new().respond(
            "getTokenAccountsByOwner",
            json!({
                "context": { "slot": 1 },
                "value": [
                    token_account(&stray.to_string(), &mint.to_string(), &owner.to_string(), "5", 6),
                    token_account(&ata.to_string(), &mint.to_string(), &owner.to_string(), "1500000", 6),
                ]
            }),
        );
        let rpc = SolanaRpc::new(transport);

        let holding = rpc
            .token_holding(&WalletAddress::Solana(owner), &WalletAddress::Solana(mint))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(holding.raw_amount, U256::from(1_500_000u64));
        assert_eq!(holding.decimals, Some(6));
        assert_eq!(holding.origin, BalanceOrigin::TokenAccount(ata.to_string()));

        let (method, params) = rpc.transport().calls.borrow()[0].clone();
        assert_eq!(method, "getTokenAccountsByOwner");
        assert_eq!(params[1]["mint"], mint.to_string());
        assert_eq!(params[2]["encoding"], "jsonParsed");
    }

    #[tokio::test]
    async fn empty_account_list_means_no_holding() {
        let transport = MockTransport::new().respond("getTokenAccountsByOwner", json!({ "value": [] }));
        let rpc = SolanaRpc::new(transport);
        let holding = rpc
            .token_holding(
                &WalletAddress::Solana(Pubkey::new_unique()),
                &WalletAddress::Solana(Pubkey::new_unique()),
            )
            .await
            .unwrap();
        assert!(holding.is_none());
    }

    #[tokio::test]
    async fn malformed_response_is_a_network_error() {
        let transport = MockTransport::new().respond("getBalance", json!({ "value": "lots" }));
        let rpc = SolanaRpc::new(transport);
        let err = rpc.get_balance(&Pubkey::new_unique()).await.unwrap_err();
        assert!(matches!(err, BridgeError::NetworkError(_)));
    }
}
