//! # ADAMS MCP
//!
//! A Model Context Protocol (MCP) server for searching, downloading and reading
//! documents from the NRC ADAMS repository.
//!
//! ## Architecture
//!
//! - [`models`]: Core data structures (Document, SearchRequest, SearchOutcome, etc.)
//! - [`sources`]: The ADAMS API client, the optional Google secondary source and
//!   the hybrid search that merges them
//! - [`mcp`]: MCP tools and server (stdio and streamable HTTP)
//! - [`utils`]: HTTP client, retry, deduplication, PDF extraction and validation
//! - [`config`]: Configuration management

pub mod config;
pub mod mcp;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use models::{AccessionNumber, Document};
pub use sources::{AdamsSource, HybridSearch, Source};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
