//! Integration tests for MCP protocol handling.
//!
//! These tests verify the JSON-RPC 2.0 protocol implementation, including
//! request/response parsing, error responses, and the server's initial
//! lifecycle state.

use eplan_remote_mcp::config::Config;
use eplan_remote_mcp::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcResponse, RequestId,
    MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use eplan_remote_mcp::mcp::server::{McpServer, ServerState, ToolCallResult};

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "initialize");
        assert_eq!(req.id, RequestId::Number(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_tools_call_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/call",
        "params": {
            "name": "eplan_open_project",
            "arguments": {"project_path": "C:/Projects/demo.elk"}
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "tools/call");
        assert_eq!(req.id, RequestId::Number(7));
        assert!(req.params.is_some());
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_initialized_notification() {
    let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;
    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Notification(notif) = result.unwrap() {
        assert_eq!(notif.method, "notifications/initialized");
    } else {
        panic!("Expected Notification");
    }
}

#[test]
fn test_parse_invalid_json_is_parse_error() {
    let err = parse_message("{ truncated").unwrap_err();
    assert_eq!(err.error.code, ErrorCode::ParseError.code());
}

#[test]
fn test_parse_array_is_parse_error() {
    let err = parse_message("[1, 2, 3]").unwrap_err();
    assert_eq!(err.error.code, ErrorCode::ParseError.code());
}

#[test]
fn test_parse_wrong_version_is_invalid_request() {
    let json = r#"{"jsonrpc": "1.0", "id": 1, "method": "initialize"}"#;
    let err = parse_message(json).unwrap_err();
    assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
}

#[test]
fn test_parse_empty_method_is_invalid_request() {
    let json = r#"{"jsonrpc": "2.0", "id": 1, "method": ""}"#;
    let err = parse_message(json).unwrap_err();
    assert_eq!(err.error.code, ErrorCode::InvalidRequest.code());
}

// =============================================================================
// Response Serialisation Tests
// =============================================================================

#[test]
fn test_success_response_wire_shape() {
    let response = JsonRpcResponse::success(
        RequestId::String("req-1".to_string()),
        serde_json::json!({"tools": []}),
    );
    let wire = serde_json::to_string(&response).unwrap();

    assert!(wire.contains(r#""jsonrpc":"2.0""#));
    assert!(wire.contains(r#""id":"req-1""#));
    assert!(!wire.contains('\n'));
}

#[test]
fn test_error_response_wire_shape() {
    let error = JsonRpcError::invalid_params(RequestId::Number(3), "missing field `name`");
    let wire = serde_json::to_string(&error).unwrap();

    assert!(wire.contains(r#""code":-32602"#));
    assert!(wire.contains("missing field `name`"));
    assert!(!wire.contains('\n'));
}

#[test]
fn test_tool_call_result_wire_shape() {
    let result = ToolCallResult::text(r#"{"success": true}"#);
    let wire = serde_json::to_value(&result).unwrap();

    assert_eq!(wire["content"][0]["type"], "text");
    assert!(wire.get("isError").is_none());
}

// =============================================================================
// Server Lifecycle Tests
// =============================================================================

#[test]
fn test_server_starts_awaiting_init() {
    let server = McpServer::new(Config::default());
    assert_eq!(server.state(), ServerState::AwaitingInit);
}

#[test]
fn test_protocol_constants() {
    assert_eq!(MCP_PROTOCOL_VERSION, "2024-11-05");
    assert_eq!(SERVER_NAME, "eplan-remote-mcp");
}
