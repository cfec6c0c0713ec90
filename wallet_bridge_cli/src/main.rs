mod error;

use clap::{Parser, Subcommand};
use error::AppError;
use log::{debug, info, warn};
use serde_json::json;
use std::io::Read;
use std::path::{Path, PathBuf};
use wallet_bridge_core::native::{HttpRpcTransport, KeypairWallet};
use wallet_bridge_core::settings::CONFIG_PATH_ENV;
use wallet_bridge_core::{
    format_units, parse_units, plan_purchases, should_notify, BalanceQuery, BalanceReader, ChainBalances, Ecosystem,
    Settings, TransactionSigner, WalletBridge,
};

/// Base64 secret key used when `--keypair` is not given
const KEYPAIR_ENV: &str = "WALLET_BRIDGE_KEYPAIR_B64";

#[derive(Parser)]
#[command(name = "wallet-bridge", version, about = "Wallet balances and transaction signing for Solana and EVM")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a raw integer amount as an exact decimal
    Format { raw: String, decimals: u8 },

    /// Connect a local keypair wallet and print its address
    Address {
        #[arg(long)]
        keypair: Option<PathBuf>,
    },

    /// Read a native or token balance
    Balance {
        #[arg(long, default_value = "solana")]
        chain: Ecosystem,
        #[arg(long)]
        owner: String,
        /// Mint (Solana) or contract (EVM); omit for the native asset
        #[arg(long)]
        token: Option<String>,
    },

    /// Sign a base64 unsigned transaction with a local keypair ("-" reads stdin)
    Sign {
        #[arg(long)]
        keypair: Option<PathBuf>,
        payload: String,
    },

    /// Plan stablecoin purchases over a ranked token list
    Plan {
        #[arg(long)]
        owner: String,
        /// Raw stablecoin balance; read from chain when omitted
        #[arg(long)]
        balance: Option<String>,
        #[arg(required = true)]
        tokens: Vec<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AppError> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Format { raw, decimals } => {
            let raw = parse_units(&raw, 0)?;
            println!("{}", format_units(raw, decimals));
        }
        Command::Address { keypair } => {
            let bridge = WalletBridge::new(Some(load_wallet(keypair.as_deref())?));
            let address = bridge.connect().await?;
            println!("{}", address);
        }
        Command::Balance { chain, owner, token } => {
            let settings = load_settings()?;
            let reader = balance_reader(&settings, chain)?;
            let result = reader
                .get_balance(&BalanceQuery {
                    owner_address: owner,
                    token_identifier: token,
                })
                .await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "raw_amount": result.raw_amount.to_string(),
                    "decimals": result.decimals,
                    "formatted": result.formatted,
                    "origin": result.origin,
                }))?
            );
        }
        Command::Sign { keypair, payload } => {
            let settings = load_settings()?;
            let payload = if payload == "-" {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                buf.trim().to_string()
            } else {
                payload
            };

            let bridge = WalletBridge::new(Some(load_wallet(keypair.as_deref())?))
                .with_prompt_timeout(settings.prompt_timeout());
            bridge.connect().await?;
            let signer = TransactionSigner::with_relay_encoding(&bridge, settings.relay_encoding);
            let envelope = signer.sign(&payload).await?;
            info!("Signed payload ready for relay ({})", envelope.encoding());
            println!("{}", envelope.into_payload());
        }
        Command::Plan { owner, balance, tokens } => {
            let settings = load_settings()?;
            let decimals = settings.purchase.stablecoin_decimals;

            let balance = match balance {
                Some(raw) => parse_units(&raw, 0)?,
                None => {
                    let reader = balance_reader(&settings, Ecosystem::Solana)?;
                    let query = BalanceQuery::token(owner.clone(), settings.purchase.stablecoin_mint.clone());
                    reader.get_balance(&query).await?.raw_amount
                }
            };

            let plan = plan_purchases(balance, settings.increment()?, settings.purchase.max_tokens_per_run, &tokens)?;
            let notify = should_notify(&plan, &settings.notification_prefs());
            if notify {
                warn!("Low stablecoin balance for {}: {}", owner, format_units(balance, decimals));
            }
            debug!("{}", plan.summary(decimals));

            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "owner": owner,
                    "selected": plan.selected,
                    "purchase_count": plan.purchase_count,
                    "increment": format_units(plan.increment, decimals),
                    "initial_balance": format_units(plan.initial_balance, decimals),
                    "total_spend": format_units(plan.total_spend, decimals),
                    "remaining_balance": format_units(plan.remaining_balance, decimals),
                    "low_balance": plan.low_balance,
                    "notify": notify,
                }))?
            );
        }
    }

    Ok(())
}

/// Settings from `WALLET_BRIDGE_CONFIG_PATH` (default `config.toml`). A
/// missing default file means built-in defaults; an explicit path must exist.
fn load_settings() -> Result<Settings, AppError> {
    let explicit = std::env::var(CONFIG_PATH_ENV).is_ok();
    let config_path = Settings::config_path_from_env();

    let settings = if explicit || Path::new(&config_path).exists() {
        debug!("Loading settings from {}", config_path);
        Settings::from_file(&config_path)?
    } else {
        debug!("No {} found, using default settings", config_path);
        Settings::default()
    };
    settings.validate()?;
    Ok(settings)
}

fn balance_reader(settings: &Settings, chain: Ecosystem) -> Result<BalanceReader<ChainBalances<HttpRpcTransport>>, AppError> {
    let url = match chain {
        Ecosystem::Solana => &settings.solana_rpc_url,
        Ecosystem::Evm => &settings.evm_rpc_url,
    };
    let transport = HttpRpcTransport::new(url.clone(), settings.rpc_timeout())?;
    Ok(BalanceReader::new(ChainBalances::for_ecosystem(chain, transport), settings.decimals_cache_capacity)
        .with_rpc_timeout(Some(settings.rpc_timeout())))
}

fn load_wallet(path: Option<&Path>) -> Result<KeypairWallet, AppError> {
    if let Some(path) = path {
        return KeypairWallet::from_file(path).map_err(|e| AppError::InvalidKeypair(format!("{}: {}", path.display(), e)));
    }
    KeypairWallet::from_env_var(KEYPAIR_ENV)
        .map_err(|e| AppError::InvalidKeypair(e.to_string()))?
        .ok_or_else(|| AppError::InvalidArgument(format!("no wallet configured: pass --keypair or set {}", KEYPAIR_ENV)))
}
