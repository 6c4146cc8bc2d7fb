//! Shared HTTP client with an explicit proxy-rewrite rule.
//!
//! Every component that talks to the network receives an [`HttpClient`]
//! instead of reaching for a process-wide client. Insecure `http://` targets
//! can be routed through an HTTPS proxy by configuring a [`ProxyRewrite`].

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::RpcError;

static NEXT_RPC_ID: AtomicU64 = AtomicU64::new(1);

/// Rewrites insecure URLs to go through an HTTPS proxy.
///
/// When the proxy base ends with `?` the target is URL-encoded before being
/// appended (the `corsproxy.io/?<target>` convention); otherwise the target is
/// appended verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRewrite {
    base: String,
}

impl ProxyRewrite {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }

    pub fn rewrite<'a>(&self, url: &'a str) -> Cow<'a, str> {
        if !url.starts_with("http://") {
            return Cow::Borrowed(url);
        }
        if self.base.ends_with('?') {
            Cow::Owned(format!("{}{}", self.base, urlencoding::encode(url)))
        } else {
            Cow::Owned(format!("{}{}", self.base, url))
        }
    }
}

/// HTTP client handle injected into the LLM, wallet and storage layers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client,
    proxy: Option<ProxyRewrite>,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            proxy: None,
        }
    }

    pub fn with_proxy(mut self, proxy: Option<ProxyRewrite>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn proxy(&self) -> Option<&ProxyRewrite> {
        self.proxy.as_ref()
    }

    /// The URL actually requested for `url` after proxy rewriting.
    pub fn resolve<'a>(&self, url: &'a str) -> Cow<'a, str> {
        match &self.proxy {
            Some(proxy) => proxy.rewrite(url),
            None => Cow::Borrowed(url),
        }
    }

    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let target = self.resolve(url);
        tracing::debug!(target = %target, "GET");
        self.inner.get(target.as_ref())
    }

    pub fn post(&self, url: &str) -> reqwest::RequestBuilder {
        let target = self.resolve(url);
        tracing::debug!(target = %target, "POST");
        self.inner.post(target.as_ref())
    }

    /// Issue one JSON-RPC 2.0 call and return its `result`.
    pub async fn json_rpc(&self, url: &str, method: &str, params: Value) -> Result<Value, RpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": NEXT_RPC_ID.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });

        let response = self.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RpcError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| RpcError::Decode(e.to_string()))?;
        envelope.into_result()
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

impl RpcEnvelope {
    fn into_result(self) -> Result<Value, RpcError> {
        if let Some(error) = self.error {
            return Err(RpcError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn rewrite_only_touches_insecure_urls() {
        let proxy = ProxyRewrite::new("https://proxy.example/");
        assert_eq!(
            proxy.rewrite("http://node.example:5678/rpc"),
            "https://proxy.example/http://node.example:5678/rpc"
        );
        assert_eq!(
            proxy.rewrite("https://secure.example/rpc"),
            "https://secure.example/rpc"
        );
    }

    #[test]
    fn rewrite_encodes_target_for_query_style_proxies() {
        let proxy = ProxyRewrite::new("https://corsproxy.io/?");
        assert_eq!(
            proxy.rewrite("http://a.example/x?y=1"),
            "https://corsproxy.io/?http%3A%2F%2Fa.example%2Fx%3Fy%3D1"
        );
    }

    #[test]
    fn client_without_proxy_leaves_urls_alone() {
        let client = HttpClient::new(Duration::from_secs(5));
        assert_eq!(client.resolve("http://x.example"), "http://x.example");
    }

    #[tokio::test]
    async fn json_rpc_surfaces_error_objects() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "eth_chainId"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": 4902, "message": "Unrecognized chain"}
            })))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5));
        let err = client
            .json_rpc(&server.uri(), "eth_chainId", json!([]))
            .await
            .unwrap_err();
        match err {
            RpcError::Rpc { code, message } => {
                assert_eq!(code, 4902);
                assert_eq!(message, "Unrecognized chain");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn json_rpc_returns_result_value() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 7,
                "result": "0x40d9"
            })))
            .mount(&server)
            .await;

        let client = HttpClient::new(Duration::from_secs(5));
        let value = client
            .json_rpc(&server.uri(), "eth_chainId", json!([]))
            .await
            .unwrap();
        assert_eq!(value, json!("0x40d9"));
    }
}
