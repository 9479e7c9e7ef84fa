//! Model Context Protocol (MCP) client connections.
//!
//! Retrieval tools such as paper search or encyclopedia lookup usually live in
//! separate MCP servers. [`McpToolConnection`] spawns one over stdio and
//! exposes its tools through the [`ToolConnection`](crate::tools::ToolConnection) seam.

/// stdio MCP client built on rmcp.
pub mod client;

pub use client::McpToolConnection;
