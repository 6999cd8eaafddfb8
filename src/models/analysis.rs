//! Meal submission types
//!
//! The pending image a clinician attached and the backend's reply to `POST /analyze`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Image attached for the next analysis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealImage {
    pub path: PathBuf,
    pub file_name: String,
}

impl MealImage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "meal.jpg".to_string());
        Self { path, file_name }
    }

    /// Content type guessed from the extension
    pub fn mime_type(&self) -> &'static str {
        let ext = self
            .path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "png" => "image/png",
            "gif" => "image/gif",
            "webp" => "image/webp",
            "heic" => "image/heic",
            "jpg" | "jpeg" => "image/jpeg",
            _ => "application/octet-stream",
        }
    }
}

/// Reply to a meal submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    /// Served from a previously computed analysis
    #[serde(default)]
    pub cached: bool,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub image_url: Option<String>,
}
