//! EPLAN Electric P8 remoting.
//!
//! This module talks to a locally running EPLAN instance over its TCP
//! remoting port using the host's action-string syntax
//! (`ActionName /KEY:"value"`):
//!
//! - `discovery` — port-range scan for running instances
//! - `client` — instances, the single session, and `connect`
//! - `transport` — the line-oriented TCP exchange and its test seam
//! - `action` — the action-string grammar and response classification
//! - `ops` — the closed catalogue of supported operations
//! - `dispatch` — session ownership and one-at-a-time execution
//! - `quiet` — script-based execution for dialog-popping actions
//!
//! # Architecture
//!
//! The crate drives EPLAN; it never parses project files itself. Every
//! effect happens inside the host, and the crate only formats requests,
//! bounds them with timeouts and classifies the textual responses.

pub mod action;
pub mod client;
pub mod discovery;
pub mod dispatch;
pub mod ops;
pub mod quiet;
pub mod transport;

pub use action::{ActionRequest, ActionResult, ParamValue};
pub use client::{connect, Instance, InstanceSelector, Session, SessionStatus};
pub use dispatch::Dispatcher;
pub use ops::Operation;
pub use quiet::QuietBridge;
pub use transport::TcpTransport;
