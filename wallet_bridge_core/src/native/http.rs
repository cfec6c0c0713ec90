// Native JSON-RPC transport using reqwest

use crate::error::BridgeError;
use crate::rpc_client::{JsonRpcTransport, RpcRequest, RpcResponse, RpcResult};
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub struct HttpRpcTransport {
    client: Client,
    endpoint: String,
    request_id: AtomicU64,
}

impl HttpRpcTransport {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            request_id: AtomicU64::new(1),
        })
    }
}

#[async_trait(?Send)]
impl JsonRpcTransport for HttpRpcTransport {
    async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        debug!("RPC {} (id {}) -> {}", method, id, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(&RpcRequest::new(id, method, params))
            .send()
            .await
            .map_err(|e| BridgeError::NetworkError(format!("{}: HTTP request failed: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::NetworkError(format!("{}: HTTP {}", method, status)));
        }

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::NetworkError(format!("{}: malformed response: {}", method, e)))?;
        body.into_result(method)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
