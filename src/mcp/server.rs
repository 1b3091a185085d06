//! MCP Server Implementation
//!
//! Line-delimited JSON-RPC over stdio: connection state, tool registration and
//! request routing.

use crate::mcp::protocol::{
    CallToolParams, CallToolResult, Implementation, InitializeParams, InitializeResult,
    JSONRPC_VERSION, JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest,
    ListToolsResult, MCP_VERSION, RequestId, SUPPORTED_PROTOCOL_VERSIONS, ServerCapabilities,
    Tool, ToolsCapability,
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// MCP Server state and configuration
pub struct McpServer {
    pub server_info: Implementation,
    pub capabilities: ServerCapabilities,
    /// Registered tools and their handlers, keyed by tool name
    tools: RwLock<BTreeMap<String, RegisteredTool>>,
    connection_state: RwLock<ConnectionState>,
}

struct RegisteredTool {
    definition: Tool,
    handler: Box<dyn ToolHandler>,
}

/// Connection state tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Uninitialized,
    Initializing,
    Ready,
    Closed,
}

/// Tool handler trait for implementing tool execution
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, params: CallToolParams) -> Result<CallToolResult>;
}

/// Message handler for processing incoming messages
pub struct MessageHandler {
    server: Arc<McpServer>,
}

impl McpServer {
    #[inline]
    pub fn new(name: String, version: String) -> Self {
        Self {
            server_info: Implementation { name, version },
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability::default()),
            },
            tools: RwLock::new(BTreeMap::new()),
            connection_state: RwLock::new(ConnectionState::Uninitialized),
        }
    }

    /// Register a tool with the server
    #[inline]
    pub async fn register_tool<H>(&self, tool: Tool, handler: H)
    where
        H: ToolHandler + 'static,
    {
        let tool_name = tool.name.clone();
        self.tools.write().await.insert(
            tool_name.clone(),
            RegisteredTool {
                definition: tool,
                handler: Box::new(handler),
            },
        );
        debug!("Registered tool: {}", tool_name);
    }

    /// Start the server using stdio transport
    #[inline]
    pub async fn serve_stdio(self: Arc<Self>) -> Result<()> {
        info!("Starting MCP server with stdio transport");
        self.serve(BufReader::new(io::stdin()), io::stdout()).await
    }

    /// Serve one connection until the reader reaches EOF
    #[inline]
    pub async fn serve<R, W>(self: Arc<Self>, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => {
                    info!("EOF reached, closing connection");
                    break;
                }
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    self.handle_line(line, &mut writer).await?;
                }
                Err(e) => {
                    error!("Error reading from stdin: {}", e);
                    break;
                }
            }
        }

        *self.connection_state.write().await = ConnectionState::Closed;
        info!("MCP server stopped");
        Ok(())
    }

    async fn handle_line<W>(self: &Arc<Self>, line: &str, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let raw_value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                error!("Failed to parse JSON: {}", e);
                let response = JsonRpcMessage::failure(None, JsonRpcError::parse_error());
                return self.send_message(writer, &response).await;
            }
        };

        let message = match serde_json::from_value::<JsonRpcMessage>(raw_value) {
            Ok(message) if message.jsonrpc() == JSONRPC_VERSION => message,
            Ok(message) => {
                error!("Unsupported JSON-RPC version: {}", message.jsonrpc());
                return self.send_invalid_request(writer, request_id(&message)).await;
            }
            Err(e) => {
                error!("Message validation failed: {}", e);
                return self.send_invalid_request(writer, None).await;
            }
        };

        let handler = MessageHandler::new(Arc::clone(self));
        if let Err(e) = handler.process_message(message, writer).await {
            error!("Error processing message: {}", e);
        }
        Ok(())
    }

    async fn send_invalid_request<W>(&self, writer: &mut W, id: Option<RequestId>) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let response = JsonRpcMessage::failure(id, JsonRpcError::invalid_request());
        self.send_message(writer, &response).await
    }

    /// Send a message to the client
    async fn send_message<W>(&self, writer: &mut W, message: &JsonRpcMessage) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let json = serde_json::to_string(message)?;
        writer.write_all(json.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    #[inline]
    pub async fn connection_state(&self) -> ConnectionState {
        *self.connection_state.read().await
    }

    #[inline]
    pub async fn tool_names(&self) -> Vec<String> {
        self.tools.read().await.keys().cloned().collect()
    }
}

fn request_id(message: &JsonRpcMessage) -> Option<RequestId> {
    match message {
        JsonRpcMessage::Request(request) => Some(request.id.clone()),
        JsonRpcMessage::Response(response) => Some(response.id.clone()),
        JsonRpcMessage::ErrorResponse(response) => response.id.clone(),
        JsonRpcMessage::Notification(_) => None,
    }
}

impl MessageHandler {
    #[inline]
    pub fn new(server: Arc<McpServer>) -> Self {
        Self { server }
    }

    /// Process an incoming message
    #[inline]
    pub async fn process_message<W>(&self, message: JsonRpcMessage, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        match message {
            JsonRpcMessage::Request(request) => self.handle_request(request, writer).await,
            JsonRpcMessage::Notification(notification) => {
                self.handle_notification(notification).await;
                Ok(())
            }
            JsonRpcMessage::Response(_) | JsonRpcMessage::ErrorResponse(_) => {
                warn!("Received unexpected response message from client");
                Ok(())
            }
        }
    }

    async fn handle_request<W>(&self, request: JsonRpcRequest, writer: &mut W) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        debug!("Handling request {}", request.method);
        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(request.params).await,
            "ping" => Ok(serde_json::json!({})),
            method => Err(JsonRpcError::method_not_found(method)),
        };

        let message = match response {
            Ok(result) => JsonRpcMessage::success(request.id, result),
            Err(error) => {
                error!("Error handling request {}: {}", request.method, error.message);
                JsonRpcMessage::failure(Some(request.id), error)
            }
        };
        self.server.send_message(writer, &message).await
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            "initialized" | "notifications/initialized" => {
                *self.server.connection_state.write().await = ConnectionState::Ready;
                info!("Server ready to handle requests");
            }
            "notifications/cancelled" => debug!("Received cancellation notification"),
            _ => warn!("Unknown notification method: {}", notification.method),
        }
    }

    /// Handle initialize request
    #[inline]
    pub async fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = parse_params(params, "initialize")?;

        // Echo a supported version, otherwise offer our latest
        let protocol_version = if SUPPORTED_PROTOCOL_VERSIONS.contains(&params.protocol_version.as_str()) {
            params.protocol_version.clone()
        } else {
            warn!(
                "Client requested unsupported protocol version {}, offering {}",
                params.protocol_version, MCP_VERSION
            );
            MCP_VERSION.to_string()
        };

        *self.server.connection_state.write().await = ConnectionState::Initializing;

        let result = InitializeResult {
            protocol_version,
            capabilities: self.server.capabilities.clone(),
            server_info: self.server.server_info.clone(),
            instructions: Some(
                "Product catalog search. Call search_products with a natural language description of what the shopper wants."
                    .to_string(),
            ),
        };

        info!("Client initialized: {}", params.client_info.name);
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    /// Handle list tools request
    #[inline]
    pub async fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let tools = self.server.tools.read().await;
        let result = ListToolsResult {
            tools: tools.values().map(|tool| tool.definition.clone()).collect(),
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    /// Handle call tool request
    #[inline]
    pub async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: CallToolParams = parse_params(params, "tools/call")?;

        let tools = self.server.tools.read().await;
        let tool = tools.get(&params.name).ok_or_else(|| {
            JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name))
        })?;

        let result = match tool.handler.handle(params).await {
            Ok(result) => result,
            Err(e) => {
                error!("Tool execution failed: {}", e);
                CallToolResult::error(format!("Tool execution failed: {}", e))
            }
        };
        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }
}

fn parse_params<T>(params: Option<Value>, method: &str) -> Result<T, JsonRpcError>
where
    T: serde::de::DeserializeOwned,
{
    let params = params.ok_or_else(|| {
        JsonRpcError::invalid_params(format!("{} request missing parameters", method))
    })?;
    serde_json::from_value(params).map_err(|e| JsonRpcError::invalid_params(e.to_string()))
}
