use crate::config::Config;
use crate::errors::ToolError;
use crate::services::logger::Logger;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use serde_json::Value;
use std::sync::Arc;

/// Fully-specified shape of one Admin API request before transmission.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiCall {
    pub path: String,
    pub method: String,
    pub params: Option<serde_json::Map<String, Value>>,
    pub payload: Option<Value>,
}

impl ApiCall {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: "GET".to_string(),
            params: None,
            payload: None,
        }
    }
}

/// Normalized success outcome of one gateway call, resolved once from the
/// declared content type.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiBody {
    Json(Value),
    Text(String),
}

impl ApiBody {
    pub fn render(&self) -> String {
        match self {
            ApiBody::Json(value) => serde_json::to_string(value).unwrap_or_default(),
            ApiBody::Text(text) => text.clone(),
        }
    }
}

/// Wire-ready request handed to the transport: method already uppercased,
/// path carrying exactly one leading slash, query flattened to pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedCall {
    pub method: String,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: String,
    pub body: String,
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, call: &PreparedCall) -> Result<RawResponse, ToolError>;
}

/// Production transport over reqwest. Basic auth and TLS policy come from the
/// immutable endpoint configuration; the pooled client is safe for concurrent
/// invocations and carries the end-to-end timeout.
pub struct HttpTransport {
    config: Arc<Config>,
    client: Client,
}

impl HttpTransport {
    pub fn new(config: Arc<Config>) -> Result<Self, ToolError> {
        let mut builder = Client::builder()
            .user_agent(concat!("pingfederate-mcp/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout);
        if !config.verify_tls {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let client = builder
            .build()
            .map_err(|err| ToolError::internal(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, call: &PreparedCall) -> Result<RawResponse, ToolError> {
        let method = Method::from_bytes(call.method.as_bytes()).map_err(|_| {
            ToolError::invalid_params(format!("method '{}' is not a valid HTTP token", call.method))
        })?;
        let url = format!("{}{}", self.config.base_url, call.path);
        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.config.username, Some(&self.config.password));
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(body) = &call.body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                ToolError::timeout("PingFederate request timed out")
            } else {
                ToolError::transport(format!("PingFederate request failed: {}", err))
            }
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        let body = response.text().await.map_err(|err| {
            ToolError::transport(format!("Failed to read response body: {}", err))
        })?;

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Executes exactly one authenticated HTTP call per invocation and normalizes
/// the outcome. Stateless across invocations; no retries.
pub struct Gateway {
    logger: Logger,
    verify_tls: bool,
    transport: Arc<dyn Transport>,
}

impl Gateway {
    pub fn new(logger: Logger, config: &Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            logger: logger.child("gateway"),
            verify_tls: config.verify_tls,
            transport,
        }
    }

    pub async fn request(&self, call: &ApiCall) -> Result<ApiBody, ToolError> {
        if call.path.trim().is_empty() {
            return Err(ToolError::invalid_params("path must not be empty"));
        }
        let prepared = PreparedCall {
            method: normalize_method(&call.method),
            path: normalize_path(&call.path),
            query: flatten_params(call.params.as_ref()),
            body: call.payload.clone(),
        };

        let response = self.transport.send(&prepared).await?;

        // Never the body, never credentials.
        self.logger.debug(
            &call_diagnostic(&prepared.method, &prepared.path, response.status, self.verify_tls),
            None,
        );

        if response.status >= 400 {
            return Err(ToolError::upstream(response.status, response.body));
        }

        if response.content_type.contains("json") {
            // Downstream APIs occasionally mislabel content, so a parse
            // failure downgrades to raw text instead of failing the call.
            if let Ok(parsed) = serde_json::from_str(&response.body) {
                return Ok(ApiBody::Json(parsed));
            }
        }
        Ok(ApiBody::Text(response.body))
    }
}

fn normalize_method(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "GET".to_string()
    } else {
        trimmed.to_uppercase()
    }
}

fn normalize_path(raw: &str) -> String {
    if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    }
}

fn flatten_params(params: Option<&serde_json::Map<String, Value>>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let Some(params) = params else {
        return pairs;
    };
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), scalar_to_string(item)));
                }
            }
            other => pairs.push((key.clone(), scalar_to_string(other))),
        }
    }
    pairs
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn call_diagnostic(method: &str, path: &str, status: u16, verify_tls: bool) -> String {
    format!(
        "PingFederate {} {} -> {} (verify_tls={})",
        method, path, status, verify_tls
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StubTransport {
        calls: AtomicUsize,
        seen: Mutex<Vec<PreparedCall>>,
        response: RawResponse,
    }

    impl StubTransport {
        fn new(status: u16, content_type: &str, body: &str) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                response: RawResponse {
                    status,
                    content_type: content_type.to_string(),
                    body: body.to_string(),
                },
            })
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        async fn send(&self, call: &PreparedCall) -> Result<RawResponse, ToolError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(call.clone());
            Ok(self.response.clone())
        }
    }

    fn gateway(transport: Arc<dyn Transport>) -> Gateway {
        let config = Config {
            base_url: "https://localhost:9999/pf-admin-api/v1".to_string(),
            username: "Administrator".to_string(),
            password: "2FederateM0re".to_string(),
            verify_tls: false,
            timeout: std::time::Duration::from_secs(30),
        };
        Gateway::new(Logger::new("test"), &config, transport)
    }

    #[test]
    fn path_gets_exactly_one_leading_slash() {
        assert_eq!(normalize_path("version"), "/version");
        assert_eq!(normalize_path("/version"), "/version");
    }

    #[test]
    fn method_is_uppercased_and_defaults_to_get() {
        assert_eq!(normalize_method("get"), "GET");
        assert_eq!(normalize_method(" delete "), "DELETE");
        assert_eq!(normalize_method(""), "GET");
        // Unrecognized methods pass through for the upstream API to judge.
        assert_eq!(normalize_method("purge"), "PURGE");
    }

    #[test]
    fn params_flatten_strings_lists_and_scalars() {
        let params: serde_json::Map<String, Value> = serde_json::from_value(serde_json::json!({
            "filter": "active",
            "page": 2,
            "role": ["ADMINISTRATOR", "AUDITOR"],
            "skip": null,
        }))
        .unwrap();
        let pairs = flatten_params(Some(&params));
        assert_eq!(
            pairs,
            vec![
                ("filter".to_string(), "active".to_string()),
                ("page".to_string(), "2".to_string()),
                ("role".to_string(), "ADMINISTRATOR".to_string()),
                ("role".to_string(), "AUDITOR".to_string()),
            ]
        );
    }

    #[test]
    fn diagnostic_reflects_tls_verification_flag() {
        let line = call_diagnostic("GET", "/version", 200, false);
        assert!(line.contains("verify_tls=false"));
        assert!(call_diagnostic("GET", "/version", 200, true).contains("verify_tls=true"));
    }

    #[tokio::test]
    async fn empty_path_fails_before_any_transport_call() {
        let transport = StubTransport::new(200, "application/json", "{}");
        let gw = gateway(transport.clone());
        let err = gw
            .request(&ApiCall {
                path: "  ".to_string(),
                method: "GET".to_string(),
                params: None,
                payload: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::errors::ToolErrorKind::InvalidParams);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn json_content_type_parses_body() {
        let transport = StubTransport::new(200, "application/json;charset=utf-8", "{\"version\":\"12.1\"}");
        let body = gateway(transport).request(&ApiCall::get("version")).await.unwrap();
        assert_eq!(body, ApiBody::Json(serde_json::json!({"version": "12.1"})));
    }

    #[tokio::test]
    async fn mislabeled_json_falls_back_to_raw_text() {
        let transport = StubTransport::new(200, "application/json", "{\"a\":");
        let body = gateway(transport).request(&ApiCall::get("/version")).await.unwrap();
        assert_eq!(body, ApiBody::Text("{\"a\":".to_string()));
    }

    #[tokio::test]
    async fn non_json_content_type_returns_text_unconditionally() {
        let transport = StubTransport::new(200, "text/plain", "{\"a\":1}");
        let body = gateway(transport).request(&ApiCall::get("/version")).await.unwrap();
        assert_eq!(body, ApiBody::Text("{\"a\":1}".to_string()));
    }

    #[tokio::test]
    async fn error_status_surfaces_status_and_exact_body() {
        let transport = StubTransport::new(404, "application/json", "{\"resultId\":\"404\"}");
        let err = gateway(transport)
            .request(&ApiCall::get("/administrativeAccounts/ghost"))
            .await
            .unwrap_err();
        assert_eq!(err.status, Some(404));
        // Error bodies are surfaced verbatim, never JSON-parsed.
        assert_eq!(err.body(), Some("{\"resultId\":\"404\"}"));
    }

    #[tokio::test]
    async fn transport_sees_normalized_method_and_path() {
        let transport = StubTransport::new(200, "application/json", "{}");
        let gw = gateway(transport.clone());
        gw.request(&ApiCall {
            path: "administrativeAccounts".to_string(),
            method: "post".to_string(),
            params: None,
            payload: Some(serde_json::json!({"username": "alice"})),
        })
        .await
        .unwrap();
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].method, "POST");
        assert_eq!(seen[0].path, "/administrativeAccounts");
        assert_eq!(seen[0].body, Some(serde_json::json!({"username": "alice"})));
    }
}
