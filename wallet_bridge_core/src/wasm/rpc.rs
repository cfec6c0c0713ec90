// WASM JSON-RPC transport using the browser fetch API

use crate::error::BridgeError;
use crate::rpc_client::{JsonRpcTransport, RpcRequest, RpcResponse, RpcResult};
use async_trait::async_trait;
use log::debug;
use serde_json::Value;
use std::cell::Cell;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

pub struct FetchRpcTransport {
    endpoint: String,
    request_id: Cell<u64>,
}

impl FetchRpcTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            request_id: Cell::new(0),
        }
    }

    fn next_id(&self) -> u64 {
        let id = self.request_id.get() + 1;
        self.request_id.set(id);
        id
    }
}

fn js_err(context: &str, e: JsValue) -> BridgeError {
    BridgeError::NetworkError(format!("{}: {:?}", context, e))
}

#[async_trait(?Send)]
impl JsonRpcTransport for FetchRpcTransport {
    async fn call(&self, method: &str, params: Value) -> RpcResult<Value> {
        debug!("WASM RPC: {} via {}", method, self.endpoint);
        let request = RpcRequest::new(self.next_id(), method, params);
        let body = serde_json::to_string(&request)?;

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_body(&JsValue::from_str(&body));

        let req = Request::new_with_str_and_init(&self.endpoint, &opts)
            .map_err(|e| js_err("Failed to create request", e))?;
        req.headers()
            .set("Content-Type", "application/json")
            .map_err(|e| js_err("Failed to set headers", e))?;

        let window = web_sys::window().ok_or(BridgeError::ProviderUnavailable)?;
        let resp_value = JsFuture::from(window.fetch_with_request(&req))
            .await
            .map_err(|e| js_err("Fetch failed", e))?;
        let resp: Response = resp_value
            .dyn_into()
            .map_err(|_| BridgeError::NetworkError("Failed to cast response".to_string()))?;

        if !resp.ok() {
            return Err(BridgeError::NetworkError(format!("{}: HTTP {}", method, resp.status())));
        }

        // Parse as text so large integers keep full precision
        let text_promise = resp.text().map_err(|e| js_err("Failed to get text", e))?;
        let text = JsFuture::from(text_promise)
            .await
            .map_err(|e| js_err("Failed to await text", e))?
            .as_string()
            .ok_or_else(|| BridgeError::NetworkError("Response text is not a string".to_string()))?;

        let response: RpcResponse = serde_json::from_str(&text)
            .map_err(|e| BridgeError::NetworkError(format!("{}: malformed response: {}", method, e)))?;
        response.into_result(method)
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
