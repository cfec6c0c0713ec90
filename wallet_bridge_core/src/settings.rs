use crate::error::{BridgeError, BridgeResult};
use crate::models::TransportEncoding;
use crate::purchase::NotificationPrefs;
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable naming the settings file
pub const CONFIG_PATH_ENV: &str = "WALLET_BRIDGE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_solana_rpc_url")]
    pub solana_rpc_url: String,
    #[serde(default = "default_evm_rpc_url")]
    pub evm_rpc_url: String,
    /// Encoding of signed payloads handed to the relay
    #[serde(default)]
    pub relay_encoding: TransportEncoding,
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    /// Wallet prompts wait indefinitely when unset
    #[serde(default)]
    pub prompt_timeout_secs: Option<u64>,
    #[serde(default = "default_decimals_cache_capacity")]
    pub decimals_cache_capacity: usize,
    #[serde(default)]
    pub purchase: PurchaseSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseSettings {
    #[serde(default = "default_stablecoin_mint")]
    pub stablecoin_mint: String,
    #[serde(default = "default_stablecoin_decimals")]
    pub stablecoin_decimals: u8,
    /// Raw units per purchase (20 USDC = "20000000")
    #[serde(default = "default_increment_amount")]
    pub increment_amount: String,
    #[serde(default = "default_max_tokens_per_run")]
    pub max_tokens_per_run: usize,
    #[serde(default)]
    pub email_notifications: bool,
    #[serde(default)]
    pub low_balance_notified: bool,
}

impl Default for PurchaseSettings {
    fn default() -> Self {
        Self {
            stablecoin_mint: default_stablecoin_mint(),
            stablecoin_decimals: default_stablecoin_decimals(),
            increment_amount: default_increment_amount(),
            max_tokens_per_run: default_max_tokens_per_run(),
            email_notifications: false,
            low_balance_notified: false,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            solana_rpc_url: default_solana_rpc_url(),
            evm_rpc_url: default_evm_rpc_url(),
            relay_encoding: TransportEncoding::default(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            prompt_timeout_secs: None,
            decimals_cache_capacity: default_decimals_cache_capacity(),
            purchase: PurchaseSettings::default(),
        }
    }
}

impl Settings {
    /// Load from a TOML file, then apply `WALLET_BRIDGE__*` overrides
    /// (e.g. `WALLET_BRIDGE__PURCHASE__MAX_TOKENS_PER_RUN=3`).
    #[cfg(feature = "native")]
    pub fn from_file(path: &str) -> Result<Self, BridgeError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("WALLET_BRIDGE").separator("__"));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    /// Path from `WALLET_BRIDGE_CONFIG_PATH`, falling back to `config.toml`.
    pub fn config_path_from_env() -> String {
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    #[cfg(feature = "native")]
    pub fn save_to_file(&self, path: &str) -> Result<(), BridgeError> {
        let toml_string = toml::to_string(self)?;
        std::fs::write(path, toml_string)?;
        Ok(())
    }

    pub fn validate(&self) -> BridgeResult<()> {
        for (name, value) in [("solana_rpc_url", &self.solana_rpc_url), ("evm_rpc_url", &self.evm_rpc_url)] {
            let parsed = url::Url::parse(value)
                .map_err(|e| BridgeError::Validation(format!("{} is not a valid URL: {}", name, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(BridgeError::Validation(format!("{} must use http or https", name)));
            }
        }

        if self.rpc_timeout_secs == 0 || self.rpc_timeout_secs > 300 {
            return Err(BridgeError::Validation("rpc_timeout_secs must be between 1 and 300".to_string()));
        }
        if self.prompt_timeout_secs == Some(0) {
            return Err(BridgeError::Validation("prompt_timeout_secs must be positive when set".to_string()));
        }
        if self.decimals_cache_capacity == 0 {
            return Err(BridgeError::Validation("decimals_cache_capacity must be positive".to_string()));
        }

        let p = &self.purchase;
        p.stablecoin_mint
            .parse::<solana_program::pubkey::Pubkey>()
            .map_err(|e| BridgeError::Validation(format!("purchase.stablecoin_mint: {}", e)))?;
        if self.increment()?.is_zero() {
            return Err(BridgeError::Validation("purchase.increment_amount must be greater than zero".to_string()));
        }
        if p.max_tokens_per_run == 0 {
            return Err(BridgeError::Validation("purchase.max_tokens_per_run must be positive".to_string()));
        }
        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn prompt_timeout(&self) -> Option<Duration> {
        self.prompt_timeout_secs.map(Duration::from_secs)
    }

    pub fn increment(&self) -> BridgeResult<U256> {
        U256::from_str_radix(self.purchase.increment_amount.trim(), 10).map_err(|e| {
            BridgeError::Validation(format!(
                "purchase.increment_amount {:?}: {}",
                self.purchase.increment_amount, e
            ))
        })
    }

    pub fn notification_prefs(&self) -> NotificationPrefs {
        NotificationPrefs {
            email_notifications: self.purchase.email_notifications,
            low_balance_notified: self.purchase.low_balance_notified,
        }
    }
}

fn default_solana_rpc_url() -> String { "https://api.mainnet-beta.solana.com".to_string() }
fn default_evm_rpc_url() -> String { "https://eth.llamarpc.com".to_string() }
fn default_rpc_timeout_secs() -> u64 { 30 }
fn default_decimals_cache_capacity() -> usize { 256 }
fn default_stablecoin_mint() -> String { "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string() }
fn default_stablecoin_decimals() -> u8 { 6 }
fn default_increment_amount() -> String { "20000000".to_string() }
fn default_max_tokens_per_run() -> usize { 5 }
