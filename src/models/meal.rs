//! Meal record model
//!
//! Historical meals as returned by `GET /history/{user_id}`.

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A stored meal analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealRecord {
    pub meal_id: i64,
    pub created_at: String,
    /// JSON-encoded text, plain text, or an already structured object
    #[serde(default)]
    pub ai_analysis_summary: Value,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Decoded form of `ai_analysis_summary`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "content", rename_all = "lowercase")]
pub enum MealAnalysis {
    Structured(Value),
    Text(String),
}

impl MealRecord {
    pub fn analysis(&self) -> MealAnalysis {
        match &self.ai_analysis_summary {
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                // A bare JSON string literal is still just text
                Ok(Value::String(inner)) => MealAnalysis::Text(inner),
                Ok(parsed) => MealAnalysis::Structured(parsed),
                Err(_) => MealAnalysis::Text(s.clone()),
            },
            Value::Null => MealAnalysis::Text(String::new()),
            other => MealAnalysis::Structured(other.clone()),
        }
    }

    /// Creation time, if the backend timestamp parses
    pub fn created_at_parsed(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.created_at)
    }

    /// `YYYY-MM-DD`, or the raw timestamp when unparseable
    pub fn display_date(&self) -> String {
        self.created_at_parsed()
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| self.created_at.clone())
    }

    /// `HH:MM`, or empty when unparseable
    pub fn display_time(&self) -> String {
        self.created_at_parsed()
            .map(|dt| dt.format("%H:%M").to_string())
            .unwrap_or_default()
    }
}

/// Parse the timestamp shapes the backend emits (with or without offset)
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    for fmt in &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt);
        }
    }

    None
}
