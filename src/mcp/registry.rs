use crate::errors::ToolError;
use crate::mcp::catalog::{tool_catalog, validate_tool_args};
use crate::services::gateway::{ApiBody, ApiCall, Gateway};
use serde_json::Value;
use std::sync::Arc;

/// The capability set is closed and fixed at startup; every variant resolves
/// to exactly one gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    GetVersion,
    ListAdminAccounts,
    GetAdminAccount,
    CallAdminApi,
}

impl Capability {
    pub fn for_name(name: &str) -> Option<Self> {
        match name {
            "pingfederate.get_version" => Some(Self::GetVersion),
            "pingfederate.list_admin_accounts" => Some(Self::ListAdminAccounts),
            "pingfederate.get_admin_account" => Some(Self::GetAdminAccount),
            "pingfederate.call_admin_api" => Some(Self::CallAdminApi),
            _ => None,
        }
    }

    /// Translate invocation arguments into a call descriptor. Runs entirely
    /// before the network; argument failures abort with no side effects.
    pub fn descriptor(self, args: &Value) -> Result<ApiCall, ToolError> {
        match self {
            Self::GetVersion => Ok(ApiCall::get("/version")),
            Self::ListAdminAccounts => Ok(ApiCall::get("/administrativeAccounts")),
            Self::GetAdminAccount => {
                let username = args
                    .get("username")
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| {
                        ToolError::invalid_params("username is required and must be non-empty")
                    })?;
                Ok(ApiCall::get(format!("/administrativeAccounts/{}", username)))
            }
            // Escape hatch: any path/method/params/payload combination, built
            // verbatim. The upstream API is authoritative on validity.
            Self::CallAdminApi => {
                let path = args
                    .get("path")
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| ToolError::invalid_params("path is required"))?;
                let method = args
                    .get("method")
                    .and_then(|v| v.as_str())
                    .unwrap_or("GET");
                Ok(ApiCall {
                    path: path.to_string(),
                    method: method.to_string(),
                    params: args
                        .get("params")
                        .and_then(|v| v.as_object())
                        .cloned(),
                    payload: args.get("payload").cloned().filter(|v| !v.is_null()),
                })
            }
        }
    }
}

/// Maps capability invocations onto the gateway and exposes the fixed catalog
/// for discovery. Stateless; safe to share across concurrent invocations.
pub struct Registry {
    gateway: Arc<Gateway>,
}

impl Registry {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    pub async fn invoke(&self, name: &str, args: &Value) -> Result<ApiBody, ToolError> {
        let capability = Capability::for_name(name).ok_or_else(|| {
            let known: Vec<&str> = tool_catalog().iter().map(|t| t.name.as_str()).collect();
            ToolError::not_found(format!("Unknown tool '{}'", name))
                .with_hint(format!("Known tools: {}", known.join(", ")))
        })?;
        let args = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args.clone()
        };
        validate_tool_args(name, &args)?;
        let call = capability.descriptor(&args)?;
        self.gateway.request(&call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fixed_capabilities_produce_fixed_descriptors() {
        assert_eq!(
            Capability::GetVersion.descriptor(&json!({})).unwrap(),
            ApiCall::get("/version")
        );
        assert_eq!(
            Capability::ListAdminAccounts.descriptor(&json!({})).unwrap(),
            ApiCall::get("/administrativeAccounts")
        );
    }

    #[test]
    fn get_admin_account_builds_the_account_path() {
        let call = Capability::GetAdminAccount
            .descriptor(&json!({"username": "alice"}))
            .unwrap();
        assert_eq!(call, ApiCall::get("/administrativeAccounts/alice"));
        assert!(call.params.is_none());
        assert!(call.payload.is_none());
    }

    #[test]
    fn get_admin_account_rejects_missing_or_blank_username() {
        assert!(Capability::GetAdminAccount.descriptor(&json!({})).is_err());
        assert!(Capability::GetAdminAccount
            .descriptor(&json!({"username": "   "}))
            .is_err());
    }

    #[test]
    fn call_admin_api_on_version_matches_get_version() {
        let via_escape_hatch = Capability::CallAdminApi
            .descriptor(&json!({"path": "/version", "method": "get"}))
            .unwrap();
        let fixed = Capability::GetVersion.descriptor(&json!({})).unwrap();
        // The gateway normalizes method case, so both descriptors transmit
        // identically.
        assert_eq!(via_escape_hatch.path, fixed.path);
        assert_eq!(
            via_escape_hatch.method.to_uppercase(),
            fixed.method.to_uppercase()
        );
        assert_eq!(via_escape_hatch.params, fixed.params);
        assert_eq!(via_escape_hatch.payload, fixed.payload);
    }

    #[test]
    fn call_admin_api_passes_method_through_unvalidated() {
        let call = Capability::CallAdminApi
            .descriptor(&json!({"path": "/bulk/export", "method": "purge"}))
            .unwrap();
        assert_eq!(call.method, "purge");
    }

    #[test]
    fn unknown_names_have_no_capability() {
        assert!(Capability::for_name("pingfederate.delete_everything").is_none());
        assert!(Capability::for_name("").is_none());
    }
}
