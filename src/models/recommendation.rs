//! Food-swap recommendation model

use serde::{Deserialize, Serialize};

/// Maximum number of tags shown per recommendation card
pub const DISPLAYED_TAGS: usize = 3;

/// A food suggested to close nutrient gaps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub food_name: String,
    #[serde(default)]
    pub serving: String,
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub reason: String,
    /// Comma-delimited, may be null
    #[serde(default)]
    pub tags: Option<String>,
}

impl Recommendation {
    /// All tags, trimmed, empty segments dropped
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or("")
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn display_tags(&self) -> Vec<String> {
        let mut tags = self.tag_list();
        tags.truncate(DISPLAYED_TAGS);
        tags
    }
}
