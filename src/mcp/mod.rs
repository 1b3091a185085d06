//! MCP (Model Context Protocol) Server Implementation
//!
//! JSON-RPC 2.0 over stdio exposing the product search tool to an agent.


pub mod protocol;
pub mod server;
pub mod tools;

pub use server::{ConnectionState, McpServer, ToolHandler};
pub use tools::SearchProductsHandler;
