//! 基于 stdio 的工具服务：每行一条 JSON-RPC 2.0 消息

pub mod jsonrpc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, info, warn};

use crate::error::{ArkImageError, Result};
use crate::tools::{ToolInvocation, ToolOutput, ToolRegistry};
use jsonrpc::{
    JsonRpcRequest, JsonRpcResponse, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION,
    METHOD_NOT_FOUND, PARSE_ERROR,
};

pub const SERVER_NAME: &str = "arkimage";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";

pub struct ToolServer {
    registry: ToolRegistry,
}

impl ToolServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// 在 stdin/stdout 上运行，直到输入结束
    pub async fn serve_stdio(&self) -> Result<()> {
        info!("starting {} tool server on stdio", SERVER_NAME);
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ArkImageError::Other(anyhow::anyhow!("failed to read request: {e}")))?
        {
            if line.trim().is_empty() {
                continue;
            }
            if let Some(response) = self.handle_message(&line).await {
                let mut payload = serde_json::to_string(&response)
                    .map_err(|e| ArkImageError::Other(anyhow::anyhow!(e)))?;
                payload.push('\n');
                writer.write_all(payload.as_bytes()).await.map_err(|e| {
                    ArkImageError::Other(anyhow::anyhow!("failed to write response: {e}"))
                })?;
                writer.flush().await.map_err(|e| {
                    ArkImageError::Other(anyhow::anyhow!("failed to flush response: {e}"))
                })?;
            }
        }
        info!("input closed, tool server stopped");
        Ok(())
    }

    /// 处理一条消息，通知消息不返回响应
    pub async fn handle_message(&self, line: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(err) => {
                warn!(error = %err, "received malformed message");
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    PARSE_ERROR,
                    format!("parse error: {err}"),
                ));
            }
        };

        let Some(id) = request.id.clone() else {
            debug!(method = %request.method, "notification received");
            return None;
        };

        if request.jsonrpc.as_deref() != Some(JSONRPC_VERSION) {
            return Some(JsonRpcResponse::failure(
                id,
                INVALID_REQUEST,
                "jsonrpc must be \"2.0\"",
            ));
        }

        debug!(method = %request.method, "request received");
        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, Self::initialize(&request.params)),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                JsonRpcResponse::success(id, json!({ "tools": self.registry.manifests() }))
            }
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            ),
        };
        Some(response)
    }

    fn initialize(params: &Value) -> Value {
        let protocol_version = params
            .get("protocolVersion")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    async fn call_tool(&self, id: Value, params: Value) -> JsonRpcResponse {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, "missing tool name");
        };
        if self.registry.get(name).is_none() {
            return JsonRpcResponse::failure(id, INVALID_PARAMS, format!("unknown tool: {name}"));
        }

        let arguments = params
            .get("arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));
        let invocation = ToolInvocation::new(name, arguments);

        match self.registry.call(invocation).await {
            Ok(output) => JsonRpcResponse::success(id, tool_success(output)),
            Err(err) => {
                error!(tool = %name, kind = err.kind(), error = %err, "tool call failed");
                JsonRpcResponse::success(id, tool_failure(&err))
            }
        }
    }
}

fn tool_success(output: ToolOutput) -> Value {
    json!({
        "content": [{ "type": "text", "text": output.text }],
        "structuredContent": output.structured,
        "isError": false
    })
}

/// 工具失败时返回带类型标签的错误，而不是 JSON-RPC 错误
fn tool_failure(err: &ArkImageError) -> Value {
    let mut detail = json!({
        "kind": err.kind(),
        "message": err.to_string(),
    });
    if let Some(field) = err.field() {
        detail["field"] = json!(field);
    }
    if let ArkImageError::Download { attempted, failures } = err {
        detail["attempted"] = json!(attempted);
        detail["failures"] = json!(failures);
    }
    json!({
        "content": [{ "type": "text", "text": format!("Error: {err}") }],
        "structuredContent": { "error": detail },
        "isError": true
    })
}
