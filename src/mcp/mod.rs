//! Model Context Protocol server
//!
//! JSON-RPC types, the tool registry with argument coercion, the tool
//! handlers, and the stdio server loop.

pub mod registry;
pub mod server;
pub mod tools;
pub mod types;
