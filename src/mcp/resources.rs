use crate::errors::{ErrorCode, McpError};
use serde_json::Value;

/// Static read-only document bundled with the build.
pub struct ResourceDef {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
    pub text: &'static str,
}

pub const RESOURCES: &[ResourceDef] = &[
    ResourceDef {
        uri: "pf://admin-api/swagger",
        name: "PingFederate Admin API spec",
        description: "Local swagger.json bundled with the project for offline reference.",
        mime_type: "application/json",
        text: include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/swagger.json")),
    },
    ResourceDef {
        uri: "pf://docker/compose",
        name: "PingFederate docker compose",
        description: "docker/compose.yml used to run PingFederate locally.",
        mime_type: "text/yaml",
        text: include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/docker/compose.yml")),
    },
];

pub fn list_resources() -> Value {
    let resources: Vec<Value> = RESOURCES
        .iter()
        .map(|res| {
            serde_json::json!({
                "uri": res.uri,
                "name": res.name,
                "description": res.description,
                "mimeType": res.mime_type,
            })
        })
        .collect();
    serde_json::json!({ "resources": resources })
}

pub fn read_resource(uri: &str) -> Result<Value, McpError> {
    let resource = RESOURCES
        .iter()
        .find(|res| res.uri == uri)
        .ok_or_else(|| {
            McpError::new(
                ErrorCode::InvalidParams,
                format!("Unknown resource '{}'", uri),
            )
        })?;
    Ok(serde_json::json!({
        "contents": [
            {
                "uri": resource.uri,
                "mimeType": resource.mime_type,
                "text": resource.text,
            }
        ]
    }))
}
