//! NutriView Tools module
//!
//! View builders behind the MCP tools and the command line analyzer.

pub mod dashboard;
pub mod history;
pub mod status;
