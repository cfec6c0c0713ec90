// RPC transport abstraction - allows both native and WASM implementations

use crate::error::BridgeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result type for RPC operations
pub type RpcResult<T> = Result<T, BridgeError>;

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl RpcResponse {
    /// Unwrap a JSON-RPC response body into its `result`.
    pub fn into_result(self, method: &str) -> RpcResult<Value> {
        if let Some(error) = self.error {
            return Err(BridgeError::NetworkError(format!(
                "{} failed: RPC error {}: {}",
                method, error.code, error.message
            )));
        }
        // A null result is legitimate for some methods; keep it.
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Abstract JSON-RPC 2.0 transport, implemented per platform.
///
/// Transport and RPC failures are `NetworkError`; a missing endpoint or
/// injected transport is `ProviderUnavailable`.
#[async_trait(?Send)]
pub trait JsonRpcTransport {
    async fn call(&self, method: &str, params: Value) -> RpcResult<Value>;

    /// Endpoint description for logs
    fn endpoint(&self) -> &str;
}

#[async_trait(?Send)]
impl<T: JsonRpcTransport + ?Sized> JsonRpcTransport for Box<T> {
    async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
        (**self).call(method, params).await
    }

    fn endpoint(&self) -> &str {
        (**self).endpoint()
    }
}

pub(crate) fn unexpected(method: &str, what: &str) -> BridgeError {
    BridgeError::NetworkError(format!("{}: unexpected response: {}", method, what))
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Canned responses keyed by method; records every call.
    #[derive(Default)]
    pub struct MockTransport {
        pub responses: RefCell<HashMap<String, Vec<RpcResult<Value>>>>,
        pub calls: RefCell<Vec<(String, Value)>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, method: &str, value: Value) -> Self {
            self.responses
                .borrow_mut()
                .entry(method.to_string())
                .or_default()
                .push(Ok(value));
            self
        }

        pub fn fail(self, method: &str, err: BridgeError) -> Self {
            self.responses
                .borrow_mut()
                .entry(method.to_string())
                .or_default()
                .push(Err(err));
            self
        }

        pub fn call_count(&self, method: &str) -> usize {
            self.calls.borrow().iter().filter(|(m, _)| m == method).count()
        }
    }

    #[async_trait(?Send)]
    impl JsonRpcTransport for MockTransport {
        async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
            self.calls.borrow_mut().push((method.to_string(), params));
            let mut responses = self.responses.borrow_mut();
            let queue = responses
                .get_mut(method)
                .ok_or_else(|| BridgeError::NetworkError(format!("no mock for {}", method)))?;
            // The last queued success repeats; errors are used once.
            if queue.is_empty() {
                return Err(BridgeError::NetworkError(format!("no mock for {}", method)));
            }
            if queue.len() == 1 {
                if let Ok(v) = &queue[0] {
                    return Ok(v.clone());
                }
            }
            queue.remove(0)
        }

        fn endpoint(&self) -> &str {
            "mock://rpc"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_object_becomes_network_error() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32602, "message": "Invalid param"}});
        let resp: RpcResponse = serde_json::from_value(body).unwrap();
        let err = resp.into_result("getBalance").unwrap_err();
        assert!(matches!(err, BridgeError::NetworkError(ref m) if m.contains("-32602")));
    }

    #[test]
    fn result_is_extracted() {
        let body = json!({"jsonrpc": "2.0", "id": 1, "result": {"value": 5}});
        let resp: RpcResponse = serde_json::from_value(body).unwrap();
        assert_eq!(resp.into_result("getBalance").unwrap()["value"], 5);
    }
}
