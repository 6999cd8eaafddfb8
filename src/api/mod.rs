//! Backend access
//!
//! The backend port and its HTTP adapter.

pub mod backend;
pub mod client;

pub use backend::NutritionBackend;
pub use client::{extract_detail, ApiError, ApiResult, HttpBackend};
