//! Nutrient report model
//!
//! Percentage-of-daily-allowance report for a patient or a single meal.

use serde::{Deserialize, Serialize};

use crate::nutrition::top_nutrients;

/// One nutrient and how much of the daily allowance it covers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientReportEntry {
    pub nutrient_name: String,
    pub percentage: f64,
}

/// Report as returned by `GET /report/{user_id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutrientReport {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub report: Vec<NutrientReportEntry>,
}

impl NutrientReport {
    /// Textual assessment, empty when the backend sent none
    pub fn summary_text(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }

    /// Highest-coverage entries, descending
    pub fn top(&self, n: usize) -> Vec<NutrientReportEntry> {
        top_nutrients(&self.report, n)
    }

    pub fn is_empty(&self) -> bool {
        self.report.is_empty()
    }
}
