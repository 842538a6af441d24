use crate::app::App;
use crate::errors::{ErrorCode, McpError, ToolError, ToolErrorKind};
use crate::mcp::catalog::tool_catalog;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::resources::{list_resources, read_resource};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};

const PROTOCOL_VERSION: &str = "2025-06-18";
const SERVER_NAME: &str = "pingfederate-mcp";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

fn map_tool_error(tool: &str, error: &ToolError) -> McpError {
    let mut lines = vec![
        "PingFederateError".to_string(),
        format!("tool: {}", tool),
        format!("kind: {:?}", error.kind).to_lowercase(),
        format!("code: {}", error.code),
    ];
    if let Some(status) = error.status {
        lines.push(format!("status: {}", status));
    }
    lines.push(format!("message: {}", error.message));
    if let Some(body) = error.body() {
        lines.push(format!("body: {}", body));
    }
    if let Some(hint) = &error.hint {
        lines.push(format!("hint: {}", hint));
    }
    let message = lines.join("\n");

    match error.kind {
        ToolErrorKind::InvalidParams => McpError::new(ErrorCode::InvalidParams, message),
        ToolErrorKind::Timeout => McpError::new(ErrorCode::RequestTimeout, message),
        ToolErrorKind::NotFound => McpError::new(ErrorCode::InvalidRequest, message),
        _ => McpError::new(ErrorCode::InternalError, message),
    }
}

fn take_trace_id(args: &Value) -> (Value, String) {
    let trace_id = args
        .get("trace_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let stripped = if let Some(obj) = args.as_object() {
        let mut out = obj.clone();
        out.remove("trace_id");
        Value::Object(out)
    } else {
        args.clone()
    };
    (stripped, trace_id)
}

pub struct McpServer {
    app: Arc<App>,
}

impl McpServer {
    pub fn new() -> Result<Self, ToolError> {
        let app = App::initialize()?;
        Ok(Self { app: Arc::new(app) })
    }

    fn handle_initialize(&self) -> Value {
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {"list": true, "call": true},
                "resources": {"list": true, "read": true},
            },
            "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
        })
    }

    fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": tool_catalog() })
    }

    async fn handle_tools_call(&self, name: &str, raw_args: Value) -> Result<Value, McpError> {
        let (args, trace_id) = take_trace_id(&raw_args);
        self.app.logger.debug(
            "tools/call",
            Some(&serde_json::json!({ "tool": name, "trace_id": trace_id })),
        );

        let body = self
            .app
            .registry
            .invoke(name, &args)
            .await
            .map_err(|err| map_tool_error(name, &err))?;

        Ok(serde_json::json!({
            "content": [ { "type": "text", "text": body.render() } ]
        }))
    }

    fn handle_resources_read(&self, params: &Value) -> Result<Value, McpError> {
        let uri = params
            .get("uri")
            .and_then(|v| v.as_str())
            .ok_or_else(|| McpError::new(ErrorCode::InvalidParams, "Missing resource uri"))?;
        read_resource(uri)
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin).lines();
        let mut writer = BufWriter::new(stdout);

        while let Some(line) = reader
            .next_line()
            .await
            .map_err(|err| ToolError::internal(err.to_string()))?
        {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => match serde_json::from_value(value) {
                    Ok(req) => req,
                    Err(_) => {
                        write_response(
                            &mut writer,
                            &JsonRpcResponse::failure(
                                Value::Null,
                                ErrorCode::InvalidRequest.as_i32(),
                                "Invalid request".to_string(),
                            ),
                        )
                        .await?;
                        continue;
                    }
                },
                Err(_) => {
                    write_response(
                        &mut writer,
                        &JsonRpcResponse::failure(
                            Value::Null,
                            ErrorCode::ParseError.as_i32(),
                            "Parse error".to_string(),
                        ),
                    )
                    .await?;
                    continue;
                }
            };

            let response = match request.method.as_str() {
                "notifications/initialized" => request
                    .id
                    .clone()
                    .map(|id| JsonRpcResponse::success(id, serde_json::json!({}))),
                _ if request.method.starts_with("notifications/") && request.id.is_none() => None,
                "initialize" => request
                    .id
                    .clone()
                    .map(|id| JsonRpcResponse::success(id, self.handle_initialize())),
                "tools/list" => request
                    .id
                    .clone()
                    .map(|id| JsonRpcResponse::success(id, self.handle_tools_list())),
                "resources/list" => request
                    .id
                    .clone()
                    .map(|id| JsonRpcResponse::success(id, list_resources())),
                "resources/read" => match request.id.clone() {
                    Some(id) => Some(match self.handle_resources_read(&request.params) {
                        Ok(result) => JsonRpcResponse::success(id, result),
                        Err(err) => JsonRpcResponse::failure(id, err.code.as_i32(), err.message),
                    }),
                    None => None,
                },
                "tools/call" => match request.id.clone() {
                    Some(id) => {
                        let params = request.params.as_object().cloned().unwrap_or_default();
                        let name = params.get("name").and_then(|v| v.as_str()).unwrap_or("");
                        if name.is_empty() {
                            Some(JsonRpcResponse::failure(
                                id,
                                ErrorCode::InvalidParams.as_i32(),
                                "Missing tool name".to_string(),
                            ))
                        } else {
                            let args = params.get("arguments").cloned().unwrap_or(Value::Null);
                            let call = match self.handle_tools_call(name, args).await {
                                Ok(result) => JsonRpcResponse::success(id, result),
                                Err(err) => {
                                    JsonRpcResponse::failure(id, err.code.as_i32(), err.message)
                                }
                            };
                            Some(call)
                        }
                    }
                    None => None,
                },
                _ => request.id.clone().map(|id| {
                    JsonRpcResponse::failure(
                        id,
                        ErrorCode::MethodNotFound.as_i32(),
                        "Method not found".to_string(),
                    )
                }),
            };

            if let Some(response) = response {
                write_response(&mut writer, &response).await?;
            }
        }

        Ok(())
    }
}

async fn write_response(
    writer: &mut BufWriter<tokio::io::Stdout>,
    response: &JsonRpcResponse,
) -> Result<(), ToolError> {
    let payload = serde_json::to_string(response).unwrap_or_default();
    writer.write_all(payload.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

pub async fn run_stdio() -> Result<(), ToolError> {
    let server = McpServer::new()?;
    server.run_stdio().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_failures_map_to_internal_error_with_status_and_body() {
        let err = ToolError::upstream(502, "bad gateway");
        let mapped = map_tool_error("pingfederate.call_admin_api", &err);
        assert_eq!(mapped.code, ErrorCode::InternalError);
        assert!(mapped.message.contains("status: 502"));
        assert!(mapped.message.contains("body: bad gateway"));
    }

    #[test]
    fn invocation_errors_map_to_their_json_rpc_codes() {
        assert_eq!(
            map_tool_error("x", &ToolError::invalid_params("bad")).code,
            ErrorCode::InvalidParams
        );
        assert_eq!(
            map_tool_error("x", &ToolError::not_found("nope")).code,
            ErrorCode::InvalidRequest
        );
        assert_eq!(
            map_tool_error("x", &ToolError::timeout("slow")).code,
            ErrorCode::RequestTimeout
        );
    }

    #[test]
    fn trace_id_is_stripped_from_tool_arguments() {
        let (args, trace_id) =
            take_trace_id(&serde_json::json!({"username": "alice", "trace_id": "t-1"}));
        assert_eq!(trace_id, "t-1");
        assert_eq!(args, serde_json::json!({"username": "alice"}));
    }

    #[test]
    fn missing_trace_id_generates_one() {
        let (_, trace_id) = take_trace_id(&serde_json::json!({}));
        assert!(!trace_id.is_empty());
    }
}
