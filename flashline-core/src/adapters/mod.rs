//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - DuckDB for the Repository port
//! - Notion HTTP client for ContentSource and AuthorizationProvider
//! - Built-in demo pages for ContentSource (demo mode)

pub mod demo;
pub mod duckdb;
pub mod notion;

#[cfg(test)]
pub mod notion_mock;
