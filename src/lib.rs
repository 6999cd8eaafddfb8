//! NutriView Library
//!
//! Client for clinical meal-photo analysis: backend access, the analysis
//! session state machine, and dashboard views.

pub mod api;
pub mod build_info;
pub mod config;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod session;
pub mod tools;
