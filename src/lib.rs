//! eplan-remote-mcp: MCP server for AI-driven EPLAN Electric P8 automation
//!
//! This library lets AI assistants remote-control a locally running EPLAN
//! Electric P8 instance over its TCP remoting port. Operations are
//! expressed in the host's action-string syntax; the crate discovers
//! running instances, holds one session at a time, and wraps
//! dialog-popping actions in generated quiet-mode scripts.
//!
//! # Architecture
//!
//! The crate is a translation layer. The AI decides what to do with a
//! project; EPLAN performs the actual work. This crate only:
//!
//! - **Discovery**: scans the local port range for running instances
//! - **Session**: explicit connect/disconnect, one action in flight
//! - **Dispatch**: renders typed operations into action strings and
//!   classifies the textual responses
//! - **Quiet execution**: scripts around actions that pop dialogs
//!
//! # Modules
//!
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error types
//! - [`eplan`] — Discovery, sessions, action grammar and dispatch
//! - [`mcp`] — MCP protocol implementation

pub mod config;
pub mod eplan;
pub mod error;
pub mod mcp;
