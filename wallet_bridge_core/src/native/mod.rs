// Native implementations

pub mod http;
pub mod keypair_wallet;

pub use http::HttpRpcTransport;
pub use keypair_wallet::KeypairWallet;
