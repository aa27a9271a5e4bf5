// ocular-server/src/server.rs

//! MCP service exposing the tool registry over rmcp.

use anyhow::Context;
use async_trait::async_trait;
use ocular_core::{ProgressSink, ProgressUpdate, ServiceResponse, ToolError, ToolRegistry};
use rmcp::{model::*, service::*, Error as McpError};
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct OcularServer {
    name: String,
    peer: Arc<Mutex<Option<Peer<RoleServer>>>>,
    registry: ToolRegistry,
    tools: Arc<Vec<Tool>>,
}

impl OcularServer {
    pub fn new(name: impl Into<String>, registry: ToolRegistry) -> Self {
        let tools = registry
            .names()
            .into_iter()
            .filter_map(|name| {
                let tool = registry.get(name)?;
                let schema = registry.schema(name)?;
                Some(Tool::new(name, tool.description(), Arc::new(schema)))
            })
            .collect();
        Self {
            name: name.into(),
            peer: Arc::new(Mutex::new(None)),
            registry,
            tools: Arc::new(tools),
        }
    }

    fn current_peer(&self) -> Option<Peer<RoleServer>> {
        self.peer.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    async fn call_tool(&self, params: CallToolRequestParam) -> Result<CallToolResult, McpError> {
        let name = params.name.to_string();
        let args = params.arguments.unwrap_or_default();
        info!(tool = %name, "Tool call received");

        let sink = self.current_peer().map(|peer| McpProgress::new(peer, &name));
        let progress = sink.as_ref().map(|s| s as &dyn ProgressSink);

        match self.registry.call(&name, args, progress).await {
            Ok(response) => tool_result(&response),
            Err(ToolError::UnknownTool(_)) => {
                warn!(tool = %name, "Call for unknown tool");
                Err(McpError::method_not_found::<CallToolRequestMethod>())
            }
            Err(e) => Err(McpError::invalid_params(e.to_string(), None)),
        }
    }
}

/// Wraps a response as a single pretty-printed JSON text item.
pub fn tool_result(response: &ServiceResponse) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(&response.to_dict())
        .map_err(|e| McpError::internal_error(format!("Failed to serialize response: {}", e), None))?;
    let content = vec![Content::text(text)];
    if response.has_errors() {
        Ok(CallToolResult::error(content))
    } else {
        Ok(CallToolResult::success(content))
    }
}

/// Forwards executor progress to the connected client as logging notifications.
pub struct McpProgress {
    peer: Peer<RoleServer>,
    service: String,
}

impl McpProgress {
    pub fn new(peer: Peer<RoleServer>, service: &str) -> Self {
        Self {
            peer,
            service: service.to_string(),
        }
    }
}

#[async_trait]
impl ProgressSink for McpProgress {
    async fn report(&self, update: ProgressUpdate) -> anyhow::Result<()> {
        self.peer
            .notify_logging_message(LoggingMessageNotificationParam {
                level: LoggingLevel::Info,
                logger: Some(self.service.clone()),
                data: json!({
                    "service": self.service,
                    "progress": update.progress,
                    "total": update.total,
                    "message": update.message,
                }),
            })
            .await
            .with_context(|| format!("Failed to send progress for {}", self.service))
    }
}

impl Service<RoleServer> for OcularServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: Some(true) }),
                ..Default::default()
            },
            server_info: Implementation {
                name: self.name.clone(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
            instructions: Some(
                "Network diagnostic and penetration-testing tools. Every call returns a JSON \
                 record with the command that ran, its exit code, stdout and stderr."
                    .into(),
            ),
        }
    }

    fn get_peer(&self) -> Option<Peer<RoleServer>> {
        self.current_peer()
    }

    fn set_peer(&mut self, peer: Peer<RoleServer>) {
        *self.peer.lock().unwrap_or_else(PoisonError::into_inner) = Some(peer);
    }

    #[allow(refining_impl_trait)]
    fn handle_request(
        &self,
        request: ClientRequest,
        _context: RequestContext<RoleServer>,
    ) -> Pin<Box<dyn Future<Output = Result<ServerResult, McpError>> + Send + '_>> {
        Box::pin(async move {
            match request {
                ClientRequest::InitializeRequest(_) => {
                    Ok(ServerResult::InitializeResult(rmcp::Service::get_info(self)))
                }
                ClientRequest::PingRequest(_) => Ok(ServerResult::empty(())),
                ClientRequest::ListToolsRequest(_) => {
                    debug!(count = self.tools.len(), "Listing tools");
                    Ok(ServerResult::ListToolsResult(ListToolsResult {
                        tools: self.tools.as_ref().clone(),
                        next_cursor: None,
                    }))
                }
                ClientRequest::CallToolRequest(request) => {
                    self.call_tool(request.params).await.map(ServerResult::CallToolResult)
                }
                _ => Err(McpError::method_not_found::<InitializeResultMethod>()),
            }
        })
    }

    #[allow(refining_impl_trait)]
    fn handle_notification(
        &self,
        _notification: ClientNotification,
    ) -> Pin<Box<dyn Future<Output = Result<(), McpError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }
}
