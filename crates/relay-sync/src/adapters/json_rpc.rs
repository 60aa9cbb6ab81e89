//! JSON-RPC Transport
//!
//! Shared JSON-RPC 2.0 over HTTP plumbing for the source-chain and ledger
//! gateway adapters. Errors are kept transport-shaped here; each adapter
//! maps them into `RelayError` with its own meaning.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

/// JSON-RPC request structure.
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: P,
}

/// JSON-RPC response structure.
///
/// `result` is `None` only when the member is absent; an explicit `null`
/// is kept as `Some(Value::Null)`.
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default, deserialize_with = "present")]
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// JSON-RPC error object.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct JsonRpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

/// Errors from a single JSON-RPC call.
#[derive(Debug, Error)]
pub enum RpcCallError {
    /// Connection, TLS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status without a JSON-RPC error body.
    #[error("HTTP status {0}")]
    Status(u16),

    /// The server answered with a JSON-RPC error object.
    #[error("RPC error {}: {}", .0.code, .0.message)]
    Rpc(JsonRpcError),

    /// Response body could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// HTTP Basic credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct RpcCredentials {
    /// User name.
    pub user: String,
    /// Password.
    pub password: String,
}

impl RpcCredentials {
    /// Parse `user:password`.
    pub fn parse(auth: &str) -> Option<Self> {
        let (user, password) = auth.split_once(':')?;
        if user.is_empty() {
            return None;
        }
        Some(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }
}

impl std::fmt::Debug for RpcCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// JSON-RPC 2.0 client over HTTP.
pub struct JsonRpcTransport {
    http_client: Client,
    url: String,
    credentials: Option<RpcCredentials>,
    request_id: AtomicU64,
}

impl JsonRpcTransport {
    /// Create a transport with a per-request timeout.
    pub fn new(
        url: impl Into<String>,
        credentials: Option<RpcCredentials>,
        timeout: Duration,
    ) -> Result<Self, RpcCallError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| RpcCallError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.into(),
            credentials,
            request_id: AtomicU64::new(1),
        })
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Make a JSON-RPC call.
    pub async fn call<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<R, RpcCallError> {
        let result = self.call_raw(method, params).await?;
        serde_json::from_value(result).map_err(|e| RpcCallError::Decode(e.to_string()))
    }

    /// Make a JSON-RPC call whose result may be `null`.
    ///
    /// `null` reads as `None`. A response with neither `result` nor
    /// `error` is still a decode failure.
    pub async fn call_optional<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &str,
        params: P,
    ) -> Result<Option<R>, RpcCallError> {
        match self.call_raw(method, params).await? {
            Value::Null => Ok(None),
            result => serde_json::from_value(result)
                .map(Some)
                .map_err(|e| RpcCallError::Decode(e.to_string())),
        }
    }

    async fn call_raw<P: Serialize>(&self, method: &str, params: P) -> Result<Value, RpcCallError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id(),
            method,
            params,
        };
        trace!("[relay] rpc {} -> {}", method, self.url);

        let mut builder = self.http_client.post(&self.url).json(&request);
        if let Some(credentials) = &self.credentials {
            builder = builder.basic_auth(&credentials.user, Some(&credentials.password));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RpcCallError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(RpcCallError::Status(status.as_u16()));
        }

        // bitcoind reports RPC errors with HTTP 500/404 and a JSON body,
        // so decode before looking at the status.
        let body = response
            .text()
            .await
            .map_err(|e| RpcCallError::Transport(e.to_string()))?;
        let rpc_response: JsonRpcResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if !status.is_success() => return Err(RpcCallError::Status(status.as_u16())),
            Err(e) => return Err(RpcCallError::Decode(e.to_string())),
        };

        if let Some(error) = rpc_response.error {
            return Err(RpcCallError::Rpc(error));
        }

        rpc_response
            .result
            .ok_or_else(|| RpcCallError::Decode("missing result in response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_parse() {
        let creds = RpcCredentials::parse("test:1234").unwrap();
        assert_eq!(creds.user, "test");
        assert_eq!(creds.password, "1234");
    }

    #[test]
    fn test_credentials_password_may_contain_colon() {
        let creds = RpcCredentials::parse("user:pa:ss").unwrap();
        assert_eq!(creds.password, "pa:ss");
    }

    #[test]
    fn test_credentials_reject_malformed() {
        assert!(RpcCredentials::parse("nocolon").is_none());
        assert!(RpcCredentials::parse(":secret").is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = RpcCredentials::parse("test:hunter2").unwrap();
        assert!(!format!("{:?}", creds).contains("hunter2"));
    }

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "getblockhash",
            params: serde_json::json!([717_695]),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["method"], "getblockhash");
        assert_eq!(json["params"][0], 717_695);
        assert_eq!(json["id"], 7);
    }

    #[test]
    fn test_error_response_deserialization() {
        let body = r#"{"result":null,"error":{"code":-8,"message":"Block height out of range"},"id":1}"#;
        let response: JsonRpcResponse = serde_json::from_str(body).unwrap();
        assert_eq!(response.result, Some(Value::Null));
        assert_eq!(response.error.unwrap().code, -8);
    }

    #[test]
    fn test_absent_result_differs_from_null() {
        let absent: JsonRpcResponse = serde_json::from_str(r#"{"jsonrpc":"2.0","id":1}"#).unwrap();
        assert!(absent.result.is_none());
        assert!(absent.error.is_none());

        let null: JsonRpcResponse =
            serde_json::from_str(r#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
        assert_eq!(null.result, Some(Value::Null));
    }

    #[test]
    fn test_transport_builds() {
        let transport =
            JsonRpcTransport::new("http://127.0.0.1:18443", None, Duration::from_secs(5)).unwrap();
        assert_eq!(transport.url(), "http://127.0.0.1:18443");
    }
}
