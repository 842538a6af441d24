use serde::Serialize;
use serde_json::Value;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    InvalidParams,
    NotFound,
    Timeout,
    Transport,
    Upstream,
    Internal,
}

/// Domain error for capability invocations and gateway calls.
///
/// `status` and the `body` detail are only populated for upstream API errors,
/// where the raw response is surfaced verbatim for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: code.into(),
            message: message.into(),
            status: None,
            hint: None,
            details: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidParams, "INVALID_PARAMS", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, "NOT_FOUND", message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Timeout, "TIMEOUT", message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Transport, "TRANSPORT", message)
    }

    /// Non-2xx upstream response. The body is kept as raw text, never parsed.
    pub fn upstream(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let mut err = Self::new(
            ToolErrorKind::Upstream,
            "UPSTREAM_ERROR",
            format!("PingFederate responded with {}: {}", status, body),
        );
        err.status = Some(status);
        err.details = Some(serde_json::json!({ "status": status, "body": body }));
        err
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Internal, "INTERNAL", message)
    }

    /// Raw upstream body for upstream errors, if recorded.
    pub fn body(&self) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|d| d.get("body"))
            .and_then(|v| v.as_str())
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ToolError {}

impl From<std::io::Error> for ToolError {
    fn from(err: std::io::Error) -> Self {
        ToolError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_error_carries_status_and_raw_body() {
        let err = ToolError::upstream(404, "{\"resultId\":\"404\"}");
        assert_eq!(err.kind, ToolErrorKind::Upstream);
        assert_eq!(err.status, Some(404));
        assert_eq!(err.body(), Some("{\"resultId\":\"404\"}"));
        assert!(err.message.contains("404"));
    }

    #[test]
    fn invocation_errors_have_no_status() {
        assert_eq!(ToolError::not_found("no such tool").status, None);
        assert_eq!(ToolError::invalid_params("username is required").status, None);
    }
}
