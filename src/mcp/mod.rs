//! Model Context Protocol (MCP) server implementation.
//!
//! This module exposes EPLAN remote control as MCP tools to AI
//! assistants. The server communicates over stdio transport using
//! JSON-RPC 2.0 messages:
//!
//! - `protocol` — JSON-RPC message types and parsing
//! - `transport` — newline-delimited stdio framing
//! - `server` — lifecycle, tool catalogue and tool-call handlers
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::McpServer;
pub use transport::StdioTransport;
