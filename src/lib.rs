//! Google Toolbox MCP Server Library
//!
//! A Model Context Protocol (MCP) server exposing Gmail, Google Calendar,
//! Google Drive, and Google Custom Search as tools.

pub mod config;
pub mod error;
pub mod google;
pub mod mcp;

pub use config::Config;
pub use error::{Result, ToolboxError};
