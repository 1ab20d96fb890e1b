//! MCP server loop
//!
//! Reads line-delimited JSON-RPC from stdin, routes each message, and writes
//! responses to stdout. Transport and host-runtime concerns stay out of the
//! handlers; this layer only parses, routes, and frames.

use std::io::{BufRead, Write};

use serde_json::Value;

use crate::error::Result;
use crate::mcp::registry;
use crate::mcp::tools::ToolHandler;
use crate::mcp::types::*;

const SERVER_NAME: &str = "google-toolbox";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// URI of the discovery resource listing the registered tool names
pub const TOOL_LIST_RESOURCE_URI: &str = "google://available-google-tools";

/// MCP server for the Google toolbox
pub struct McpServer {
    tool_handler: ToolHandler,
    initialized: bool,
}

impl McpServer {
    pub fn new(tool_handler: ToolHandler) -> Self {
        Self {
            tool_handler,
            initialized: false,
        }
    }

    /// Run the server on stdio until EOF
    pub async fn run_stdio(&mut self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();

        let reader = stdin.lock();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match self.handle_message(&line).await {
                Some(response) => {
                    let response_str = serde_json::to_string(&response)?;
                    writeln!(stdout, "{}", response_str)?;
                    stdout.flush()?;
                }
                None => {
                    // Notification, no response needed
                }
            }
        }

        Ok(())
    }

    /// Handle one incoming JSON-RPC message
    pub async fn handle_message(&mut self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(request) => request,
            Err(err) => {
                return Some(JsonRpcResponse::error(
                    RequestId::Number(0),
                    JsonRpcError::parse_error(err.to_string()),
                ));
            }
        };

        if request.method == methods::INITIALIZED {
            self.initialized = true;
            return None;
        }

        let id = request.id.clone().unwrap_or(RequestId::Number(0));

        let response = match request.method.as_str() {
            methods::INITIALIZE => JsonRpcResponse::success(id, self.initialize_result()),
            methods::PING => JsonRpcResponse::success(id, serde_json::json!({})),
            methods::LIST_TOOLS => {
                let result = ListToolsResult {
                    tools: self.tool_handler.list_tools(),
                };
                match serde_json::to_value(result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(err) => JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(err.to_string()),
                    ),
                }
            }
            methods::CALL_TOOL => {
                let result = self.handle_call_tool(&request).await;
                JsonRpcResponse::success(id, result)
            }
            methods::LIST_RESOURCES => {
                let result = ListResourcesResult {
                    resources: vec![ResourceDescriptor {
                        uri: TOOL_LIST_RESOURCE_URI.to_string(),
                        name: "available-google-tools".to_string(),
                        description: "The ordered list of Google tools this server exposes"
                            .to_string(),
                        mime_type: "application/json".to_string(),
                    }],
                };
                match serde_json::to_value(result) {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(err) => JsonRpcResponse::error(
                        id,
                        JsonRpcError::invalid_params(err.to_string()),
                    ),
                }
            }
            methods::READ_RESOURCE => self.handle_read_resource(id, request.params.as_ref()),
            other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
        };

        Some(response)
    }

    fn initialize_result(&self) -> Value {
        let result = InitializeResult {
            protocol_version: MCP_VERSION.to_string(),
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {}),
                resources: Some(ResourcesCapability {}),
            },
        };

        serde_json::to_value(result).unwrap_or(Value::Null)
    }

    async fn handle_call_tool(&self, request: &JsonRpcRequest) -> Value {
        let params: CallToolParams = match request.params.as_ref() {
            Some(params) => match serde_json::from_value(params.clone()) {
                Ok(params) => params,
                Err(err) => {
                    return envelope_value(CallToolResult::error(format!(
                        "Invalid tool parameters: {}",
                        err
                    )));
                }
            },
            None => return envelope_value(CallToolResult::error("Missing tool parameters")),
        };

        let result = self
            .tool_handler
            .call_tool(&params.name, params.arguments)
            .await;
        envelope_value(result)
    }

    fn handle_read_resource(&self, id: RequestId, params: Option<&Value>) -> JsonRpcResponse {
        let params: ReadResourceParams = match params {
            Some(params) => match serde_json::from_value(params.clone()) {
                Ok(params) => params,
                Err(err) => {
                    return JsonRpcResponse::error(id, JsonRpcError::invalid_params(err.to_string()))
                }
            },
            None => {
                return JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_params("missing resource parameters"),
                )
            }
        };

        if params.uri != TOOL_LIST_RESOURCE_URI {
            return JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_params(format!("unknown resource: {}", params.uri)),
            );
        }

        let names = registry::tool_names();
        let text = serde_json::to_string_pretty(&names).unwrap_or_default();
        let result = ReadResourceResult {
            contents: vec![ResourceContents {
                uri: params.uri,
                mime_type: "application/json".to_string(),
                text,
            }],
        };

        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(err) => JsonRpcResponse::error(id, JsonRpcError::invalid_params(err.to_string())),
        }
    }
}

fn envelope_value(result: CallToolResult) -> Value {
    serde_json::to_value(result).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::google::auth::CredentialStore;
    use crate::google::services::ServiceFactory;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn test_server(dir: &tempfile::TempDir) -> McpServer {
        let config = Config {
            token_path: dir.path().join("token.json"),
            client_id: None,
            client_secret: None,
            refresh_token: None,
            api_key: None,
            cse_id: None,
            scopes: vec![],
            oauth_callback_port: 3000,
            time_zone: "UTC".to_string(),
            log_level: "info".to_string(),
            log_to_file: false,
            log_dir: PathBuf::from("logs"),
        };
        let http = reqwest::Client::new();
        let credentials = Arc::new(CredentialStore::new(&config, http.clone()));
        let services = ServiceFactory::new(http, None, None);
        McpServer::new(ToolHandler::new(credentials, services, config.time_zone))
    }

    #[tokio::test]
    async fn test_initialize_advertises_tools_and_resources() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
            .await
            .unwrap();
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], MCP_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"]["tools"].is_object());
        assert!(result["capabilities"]["resources"].is_object());
    }

    #[tokio::test]
    async fn test_initialized_notification_has_no_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
        assert!(server.initialized);
    }

    #[tokio::test]
    async fn test_list_tools_count() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#)
            .await
            .unwrap();
        let tools = &response.result.unwrap()["tools"];
        assert_eq!(tools.as_array().unwrap().len(), 11);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":3,"method":"prompts/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_read_discovery_resource() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let message = format!(
            r#"{{"jsonrpc":"2.0","id":4,"method":"resources/read","params":{{"uri":"{}"}}}}"#,
            TOOL_LIST_RESOURCE_URI
        );
        let response = server.handle_message(&message).await.unwrap();
        let result = response.result.unwrap();
        let text = result["contents"][0]["text"].as_str().unwrap();
        assert!(text.contains("list_emails"));
        assert!(text.contains("search_gdrive"));
    }

    #[tokio::test]
    async fn test_parse_error_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = test_server(&dir);

        let response = server.handle_message("not json at all").await.unwrap();
        assert_eq!(response.error.unwrap().code, -32700);
    }
}
