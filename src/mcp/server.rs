//! MCP server for remote-controlling EPLAN Electric P8.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: capability negotiation and version agreement
//! 2. **Operation**: handling tool calls and other requests
//! 3. **Shutdown**: graceful connection termination
//!
//! # Architecture
//!
//! The server is a pure translation layer. Each tool call is converted
//! into either a connection-management call or an [`Operation`] from the
//! closed catalogue, handed to the dispatcher, and the structured result
//! serialised back into the tool-call content. All intelligence about
//! what to do with a project lives in the calling agent.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::Config;
use crate::eplan::client::{self, InstanceSelector};
use crate::eplan::discovery;
use crate::eplan::ops::Operation;
use crate::eplan::transport::TcpTransport;
use crate::eplan::{Dispatcher, QuietBridge};
use crate::error::EplanError;
use crate::mcp::protocol::{
    ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::StdioTransport;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool, so we must take &bool here
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }
}

impl From<EplanError> for ToolCallResult {
    fn from(e: EplanError) -> Self {
        Self::error(format!("{}: {e}", e.kind()))
    }
}

/// The MCP server exposing EPLAN remote control as tools.
pub struct McpServer {
    /// Current server state.
    state: ServerState,
    /// The transport layer.
    transport: StdioTransport,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<String>,
    /// Runtime configuration.
    config: Config,
    /// Session owner and action router.
    dispatcher: Dispatcher<TcpTransport>,
}

impl McpServer {
    /// Creates a new MCP server from the loaded configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let bridge = QuietBridge::new(config.quiet.resolved_temp_dir(), config.timeouts.quiet());
        let dispatcher = Dispatcher::new(config.timeouts.clone(), bridge);
        Self {
            state: ServerState::AwaitingInit,
            transport: StdioTransport::new(),
            protocol_version: None,
            config,
            dispatcher,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let result = self.run_with_shutdown().await;
        // Whatever ended the loop, release the EPLAN session.
        self.dispatcher.disconnect().await;
        result
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        self.handle_line(&line).await?;

        if self.state == ServerState::ShuttingDown {
            return Ok(true);
        }

        Ok(false)
    }

    /// Handles a single line of input.
    async fn handle_line(&mut self, line: &str) -> std::io::Result<()> {
        use crate::mcp::protocol::parse_message;

        match parse_message(line) {
            Ok(msg) => self.handle_message(msg).await,
            Err(error) => {
                self.transport.write_error(&error).await?;
                Ok(())
            }
        }
    }

    /// Handles a parsed incoming message.
    async fn handle_message(&mut self, msg: IncomingMessage) -> std::io::Result<()> {
        match msg {
            IncomingMessage::Request(req) => self.handle_request(req).await,
            IncomingMessage::Notification(ref notif) => {
                self.handle_notification(notif);
                Ok(())
            }
        }
    }

    /// Handles an incoming request.
    async fn handle_request(&mut self, req: JsonRpcRequest) -> std::io::Result<()> {
        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "tools/list" => self.handle_tools_list(&req),
            "tools/call" => self.handle_tools_call(&req).await,
            "ping" => Ok(Self::handle_ping(&req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        match response {
            Ok(resp) => self.transport.write_response(&resp).await,
            Err(error) => self.transport.write_error(&error).await,
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            self.state = ServerState::Running;
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::new(
                Some(req.id.clone()),
                JsonRpcErrorData::with_message(
                    ErrorCode::InvalidRequest,
                    "Server already initialised",
                ),
            ));
        }

        let _params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid initialize params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing initialize params")
            })?;

        let negotiated_version = MCP_PROTOCOL_VERSION.to_string();

        self.protocol_version = Some(negotiated_version.clone());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let result = json!({
            "tools": Self::get_tool_definitions(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(
        &mut self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid tool call params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params")
            })?;

        let result = self.call_tool(&params.name, params.arguments).await;

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::new(
                Some(id.clone()),
                JsonRpcErrorData::with_message(ErrorCode::InvalidRequest, "Server not initialised"),
            ));
        }
        Ok(())
    }

    /// Routes one tool call to its handler.
    async fn call_tool(&self, name: &str, arguments: Value) -> ToolCallResult {
        match name {
            "eplan_list_instances" => self.call_list_instances().await,
            "eplan_connect" => self.call_connect(&arguments).await,
            "eplan_disconnect" => self.call_disconnect().await,
            "eplan_ping" => self.call_ping().await,
            "eplan_status" => self.call_status().await,
            _ => match build_operation(name, arguments) {
                Some(Ok(op)) => self.call_operation(&op).await,
                Some(Err(message)) => ToolCallResult::error(message),
                None => EplanError::Unsupported(format!("unknown tool '{name}'")).into(),
            },
        }
    }

    /// Tool: scan the configured port range for running instances.
    async fn call_list_instances(&self) -> ToolCallResult {
        let instances =
            discovery::list_instances(&self.config.eplan, &self.config.discovery).await;

        match serde_json::to_string_pretty(&instances) {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => ToolCallResult::error(format!("Failed to serialise instances: {e}")),
        }
    }

    /// Tool: establish the session, replacing any existing one.
    async fn call_connect(&self, arguments: &Value) -> ToolCallResult {
        let selector = match arguments.get("port").and_then(Value::as_u64) {
            Some(port) => match u16::try_from(port) {
                Ok(port) => InstanceSelector::Port(port),
                Err(_) => return ToolCallResult::error(format!("Invalid port: {port}")),
            },
            None => InstanceSelector::FirstDiscovered,
        };

        let session = match client::connect(
            &self.config.eplan,
            &self.config.discovery,
            selector,
            self.config.timeouts.connect(),
        )
        .await
        {
            Ok(session) => session,
            Err(e) => return e.into(),
        };

        let status = session.status();
        self.dispatcher.install_session(session).await;

        match serde_json::to_string_pretty(&status) {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => ToolCallResult::error(format!("Failed to serialise status: {e}")),
        }
    }

    /// Tool: release the session. Succeeds even when none exists.
    async fn call_disconnect(&self) -> ToolCallResult {
        self.dispatcher.disconnect().await;
        ToolCallResult::text(r#"{"disconnected": true}"#)
    }

    /// Tool: liveness check on the session.
    async fn call_ping(&self) -> ToolCallResult {
        let alive = self.dispatcher.ping().await;
        ToolCallResult::text(format!(r#"{{"alive": {alive}}}"#))
    }

    /// Tool: status snapshot of the session.
    async fn call_status(&self) -> ToolCallResult {
        let status = self.dispatcher.status().await;
        match serde_json::to_string_pretty(&status) {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => ToolCallResult::error(format!("Failed to serialise status: {e}")),
        }
    }

    /// Executes one catalogue operation through the dispatcher.
    async fn call_operation(&self, op: &Operation) -> ToolCallResult {
        let request = op.request();

        match self.dispatcher.execute(&request).await {
            Ok(result) => match serde_json::to_string_pretty(&result) {
                Ok(text) if result.success => ToolCallResult::text(text),
                Ok(text) => ToolCallResult::error(text),
                Err(e) => ToolCallResult::error(format!("Failed to serialise result: {e}")),
            },
            Err(e) => e.into(),
        }
    }

    /// Returns the list of available tools.
    #[allow(clippy::too_many_lines)]
    fn get_tool_definitions() -> Vec<ToolDefinition> {
        let no_args = json!({
            "type": "object",
            "properties": {}
        });

        vec![
            // === Connection management ===
            ToolDefinition {
                name: "eplan_list_instances".to_string(),
                description: Some(
                    "Scan the local port range for running EPLAN Electric P8 instances. \
                     Returns host, port and version for every instance that answered the \
                     handshake. An empty list means no instance is running."
                        .to_string(),
                ),
                input_schema: no_args.clone(),
            },
            ToolDefinition {
                name: "eplan_connect".to_string(),
                description: Some(
                    "Connect to a running EPLAN instance. Without arguments, discovers \
                     instances and connects to the first one (preferring the configured \
                     target version). Pass a port to connect to a specific instance. \
                     Replaces any existing session."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "port": {
                            "type": "integer",
                            "description": "Optional: remoting port of a specific instance"
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "eplan_disconnect".to_string(),
                description: Some(
                    "Release the current EPLAN session. Succeeds even when no session exists."
                        .to_string(),
                ),
                input_schema: no_args.clone(),
            },
            ToolDefinition {
                name: "eplan_ping".to_string(),
                description: Some(
                    "Check whether the connected EPLAN instance is still responding."
                        .to_string(),
                ),
                input_schema: no_args.clone(),
            },
            ToolDefinition {
                name: "eplan_status".to_string(),
                description: Some(
                    "Report the current session: connected instance, connection time and \
                     last activity."
                        .to_string(),
                ),
                input_schema: no_args.clone(),
            },
            // === Project lifecycle ===
            ToolDefinition {
                name: "eplan_open_project".to_string(),
                description: Some(
                    "Open an EPLAN project file (.elk). Optionally open read-only or \
                     exclusive."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "project_path": {
                            "type": "string",
                            "description": "Full path to the project file (.elk)"
                        },
                        "open_mode": {
                            "type": "string",
                            "enum": ["Standard", "ReadOnly", "Exclusive"],
                            "description": "Optional: how to open the project"
                        }
                    },
                    "required": ["project_path"]
                }),
            },
            ToolDefinition {
                name: "eplan_close_project".to_string(),
                description: Some(
                    "Close the currently open project. Runs dialog-suppressed, so unsaved \
                     confirmation prompts are answered automatically."
                        .to_string(),
                ),
                input_schema: no_args.clone(),
            },
            ToolDefinition {
                name: "eplan_backup_project".to_string(),
                description: Some(
                    "Back up a project into an archive file in the destination directory."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "destination_path": {
                            "type": "string",
                            "description": "Target directory for the archive"
                        },
                        "archive_name": {
                            "type": "string",
                            "description": "Archive filename without path (e.g. 'demo.zw1')"
                        },
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        },
                        "comment": {
                            "type": "string",
                            "description": "Optional: backup comment"
                        },
                        "backup_method": {
                            "type": "string",
                            "enum": ["BACKUP", "SOURCEOUT", "ARCHIVE"],
                            "description": "Optional: backup method (default BACKUP)"
                        },
                        "include_external_documents": {
                            "type": "boolean",
                            "description": "Include external documents (default false)"
                        },
                        "include_images": {
                            "type": "boolean",
                            "description": "Include images (default false)"
                        }
                    },
                    "required": ["destination_path", "archive_name"]
                }),
            },
            ToolDefinition {
                name: "eplan_backup_masterdata".to_string(),
                description: Some(
                    "Back up master data (symbols, forms, macros, articles, ...) from a \
                     source directory into an archive file."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "destination_path": {
                            "type": "string",
                            "description": "Target directory for the archive"
                        },
                        "archive_name": {
                            "type": "string",
                            "description": "Archive filename without path (e.g. 'symbols.zw2')"
                        },
                        "source_path": {
                            "type": "string",
                            "description": "Directory holding the master data"
                        },
                        "md_type": {
                            "type": "string",
                            "enum": ["SYMBOLS", "MACROS", "FORMS", "ARTICLES",
                                     "LANGUAGES", "STANDARDSHEET", "STATIONDATA"],
                            "description": "Master data type"
                        },
                        "filename": {
                            "type": "string",
                            "description": "File pattern within the source directory (default '*.*')"
                        },
                        "comment": {
                            "type": "string",
                            "description": "Optional: backup comment"
                        }
                    },
                    "required": ["destination_path", "archive_name", "source_path", "md_type"]
                }),
            },
            ToolDefinition {
                name: "eplan_restore_project".to_string(),
                description: Some(
                    "Restore a project from a backup archive. Runs dialog-suppressed so \
                     overwrite prompts are answered automatically."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "archive_name": {
                            "type": "string",
                            "description": "Path to the archive file"
                        },
                        "project_name": {
                            "type": "string",
                            "description": "Target project path"
                        },
                        "unpack_project": {
                            "type": "boolean",
                            "description": "Unpack a previously packed project (default false)"
                        }
                    },
                    "required": ["archive_name", "project_name"]
                }),
            },
            ToolDefinition {
                name: "eplan_restore_masterdata".to_string(),
                description: Some(
                    "Restore master data from a backup archive into a directory."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "archive_name": {
                            "type": "string",
                            "description": "Path to the archive file"
                        },
                        "destination_path": {
                            "type": "string",
                            "description": "Target directory"
                        }
                    },
                    "required": ["archive_name", "destination_path"]
                }),
            },
            // === Export / import / print ===
            ToolDefinition {
                name: "eplan_export_pdf".to_string(),
                description: Some("Export the project as a single PDF file.".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "export_file": {
                            "type": "string",
                            "description": "Output PDF file path"
                        },
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        },
                        "export_scheme": {
                            "type": "string",
                            "description": "Optional: PDF export scheme name"
                        },
                        "black_white": {
                            "type": "integer",
                            "description": "0 colour, 1 black/white, 2 greyscale, 3 white inverted (default 0)"
                        },
                        "language": {
                            "type": "string",
                            "description": "Optional: language code (e.g. 'en_US')"
                        }
                    },
                    "required": ["export_file"]
                }),
            },
            ToolDefinition {
                name: "eplan_export_images".to_string(),
                description: Some(
                    "Export every project page as an image file (PNG, TIF, GIF, JPG or BMP)."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "destination_path": {
                            "type": "string",
                            "description": "Output directory"
                        },
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        },
                        "format": {
                            "type": "string",
                            "enum": ["PNG", "TIF", "GIF", "JPG", "BMP"],
                            "description": "Image format (default PNG)"
                        },
                        "colour_depth": {
                            "type": "integer",
                            "description": "Colour depth in bits (default 24)"
                        },
                        "image_width": {
                            "type": "integer",
                            "description": "Image width in pixels (default 1024)"
                        }
                    },
                    "required": ["destination_path"]
                }),
            },
            ToolDefinition {
                name: "eplan_export_dxf".to_string(),
                description: Some(
                    "Export the project pages as DXF files into a directory.".to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "destination_path": {
                            "type": "string",
                            "description": "Output directory"
                        },
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        },
                        "export_scheme": {
                            "type": "string",
                            "description": "Optional: DXF export scheme name"
                        },
                        "language": {
                            "type": "string",
                            "description": "Optional: language code (e.g. 'en_US')"
                        }
                    },
                    "required": ["destination_path"]
                }),
            },
            ToolDefinition {
                name: "eplan_export_dwg".to_string(),
                description: Some(
                    "Export the project pages as DWG files into a directory.".to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "destination_path": {
                            "type": "string",
                            "description": "Output directory"
                        },
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        },
                        "export_scheme": {
                            "type": "string",
                            "description": "Optional: DWG export scheme name"
                        },
                        "language": {
                            "type": "string",
                            "description": "Optional: language code (e.g. 'en_US')"
                        }
                    },
                    "required": ["destination_path"]
                }),
            },
            ToolDefinition {
                name: "eplan_import_project".to_string(),
                description: Some("Import a PXF/EPJ project file.".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "import_file": {
                            "type": "string",
                            "description": "Path to the PXF/EPJ file"
                        },
                        "project_name": {
                            "type": "string",
                            "description": "Target project path"
                        },
                        "run_check_after_import": {
                            "type": "boolean",
                            "description": "Run the project check after import (default false)"
                        }
                    },
                    "required": ["import_file", "project_name"]
                }),
            },
            ToolDefinition {
                name: "eplan_print_project".to_string(),
                description: Some(
                    "Print the project. Runs dialog-suppressed so the printer dialog is \
                     skipped; without a printer name the default printer is used."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        },
                        "printer_name": {
                            "type": "string",
                            "description": "Optional: printer name"
                        },
                        "copies": {
                            "type": "integer",
                            "description": "Number of copies (default 1)"
                        }
                    }
                }),
            },
            // === Project data ===
            ToolDefinition {
                name: "eplan_check_project".to_string(),
                description: Some(
                    "Run the project verification and record its messages.".to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        },
                        "verification_scheme": {
                            "type": "string",
                            "description": "Optional: verification scheme name"
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "eplan_generate_connections".to_string(),
                description: Some(
                    "Regenerate the project's connection data, either incrementally or \
                     rebuilding everything."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        },
                        "rebuild_all": {
                            "type": "boolean",
                            "description": "Rebuild all connections instead of updating (default false)"
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "eplan_generate_macros".to_string(),
                description: Some(
                    "Generate window and symbol macros from the project pages.".to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        },
                        "destination_path": {
                            "type": "string",
                            "description": "Optional: output directory for the macro files"
                        },
                        "scheme": {
                            "type": "string",
                            "description": "Optional: macro generation scheme"
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "eplan_update_reports".to_string(),
                description: Some(
                    "Update all report and evaluation pages of the project.".to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "eplan_renumber_devices".to_string(),
                description: Some("Renumber device tags in the project.".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        },
                        "config_scheme": {
                            "type": "string",
                            "description": "Optional: numbering configuration scheme"
                        },
                        "post_numerate_only": {
                            "type": "boolean",
                            "description": "Only renumber tags still carrying a '?' placeholder (default false)"
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "eplan_create_labels".to_string(),
                description: Some(
                    "Produce a label output file (txt, xls, xlsx or xml) for the project."
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "destination_file": {
                            "type": "string",
                            "description": "Output file path"
                        },
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        },
                        "config_scheme": {
                            "type": "string",
                            "description": "Optional: labelling configuration scheme"
                        },
                        "language": {
                            "type": "string",
                            "description": "Optional: language code"
                        }
                    },
                    "required": ["destination_file"]
                }),
            },
            ToolDefinition {
                name: "eplan_translate_project".to_string(),
                description: Some(
                    "Translate project texts using the translation database.".to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "eplan_compress_project".to_string(),
                description: Some(
                    "Compress the project database to reclaim disk space.".to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        }
                    }
                }),
            },
            ToolDefinition {
                name: "eplan_get_current_project".to_string(),
                description: Some(
                    "Query the path of the project currently selected in EPLAN.".to_string(),
                ),
                input_schema: no_args,
            },
            ToolDefinition {
                name: "eplan_set_project_property".to_string(),
                description: Some(
                    "Set a project property by its numeric identifier or name.".to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "property_id": {
                            "type": "string",
                            "description": "Property identifier (number or name, e.g. '10013')"
                        },
                        "value": {
                            "type": "string",
                            "description": "Value to set"
                        },
                        "project_name": {
                            "type": "string",
                            "description": "Optional: project path; defaults to the selected project"
                        }
                    },
                    "required": ["property_id", "value"]
                }),
            },
        ]
    }
}

/// Builds a catalogue operation from a tool name and its JSON arguments.
///
/// Returns `None` for names outside the catalogue, `Some(Err)` when the
/// arguments do not match the operation's parameter schema.
fn build_operation(tool_name: &str, arguments: Value) -> Option<Result<Operation, String>> {
    // Parameterless operations take no arguments at all.
    match tool_name {
        "eplan_close_project" => return Some(Ok(Operation::CloseProject)),
        "eplan_get_current_project" => return Some(Ok(Operation::GetCurrentProject)),
        _ => {}
    }

    let variant = match tool_name {
        "eplan_open_project" => "OpenProject",
        "eplan_backup_project" => "BackupProject",
        "eplan_backup_masterdata" => "BackupMasterData",
        "eplan_restore_project" => "RestoreProject",
        "eplan_restore_masterdata" => "RestoreMasterData",
        "eplan_export_pdf" => "ExportPdf",
        "eplan_export_images" => "ExportImages",
        "eplan_export_dxf" => "ExportDxf",
        "eplan_export_dwg" => "ExportDwg",
        "eplan_import_project" => "ImportProject",
        "eplan_print_project" => "PrintProject",
        "eplan_check_project" => "CheckProject",
        "eplan_generate_connections" => "GenerateConnections",
        "eplan_generate_macros" => "GenerateMacros",
        "eplan_update_reports" => "UpdateReports",
        "eplan_renumber_devices" => "RenumberDevices",
        "eplan_create_labels" => "CreateLabels",
        "eplan_translate_project" => "TranslateProject",
        "eplan_compress_project" => "CompressProject",
        "eplan_set_project_property" => "SetProjectProperty",
        _ => return None,
    };

    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };

    // Reuse the catalogue's own schema via externally-tagged deserialisation.
    let tagged = json!({ variant: arguments });
    Some(
        serde_json::from_value(tagged)
            .map_err(|e| format!("Invalid arguments for {tool_name}: {e}")),
    )
}
