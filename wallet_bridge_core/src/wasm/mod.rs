// WASM-specific implementations
pub mod injected;
pub mod rpc;
pub mod utils;

// Re-exports
pub use injected::*;
pub use rpc::*;
pub use utils::*;
