//! Tools available to the researcher
//!
//! # Module Structure
//!
//! - [`invoker`] - [`ToolConnection`] seam and the [`ToolInvoker`] that routes calls
//! - [`registry`] - [`Tool`] trait and [`LocalToolConnection`] for in-process tools
//! - [`search`] - daedra-backed `web_search` and `fetch_page`
//!
//! # Example
//!
//! ```ignore
//! let mut invoker = ToolInvoker::new();
//! invoker
//!     .attach(Arc::new(LocalToolConnection::with_builtin_tools(true, true, 5)))
//!     .await?;
//! let text = invoker.invoke("web_search", json!({"query": "rust"})).await?;
//! ```
//!
//! External tools served over MCP attach the same way; see the `mcp` module.

/// Tool connections and the invoker that routes calls onto them.
pub mod invoker;
/// In-process tool trait and connection.
pub mod registry;
/// Web search and page fetch tools using daedra.
pub mod search;

pub use invoker::{normalize_result, RemoteError, ToolConnection, ToolInvoker};
pub use registry::{LocalToolConnection, Tool};
