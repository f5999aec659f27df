//! HTTP transport for XML-RPC calls.

use crate::codec::{decode_response, encode_call};
use crate::error::{RpcError, RpcResult};
use crate::value::Value;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::debug;

/// Posts XML-RPC documents to a single endpoint.
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport for `endpoint` (e.g. `https://satellite/rpc/api`).
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> RpcResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RpcError::transport(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Call `method` with positional `params` and decode the result.
    pub async fn call(&self, method: &str, params: &[Value]) -> RpcResult<Value> {
        debug!("XML-RPC call: {}", method);
        let body = encode_call(method, params);

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| RpcError::transport(format!("{} request failed: {}", method, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RpcError::transport(format!("failed to read {} response: {}", method, e)))?;

        if !status.is_success() {
            return Err(RpcError::transport(format!(
                "HTTP {} from {} for {}",
                status, self.endpoint, method
            )));
        }

        decode_response(&text)
    }
}
