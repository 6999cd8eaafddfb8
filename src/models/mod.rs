//! Data models
//!
//! Shapes of what the analysis backend sends and what the clinician attaches.

mod analysis;
mod meal;
mod patient;
mod recommendation;
mod report;

pub use analysis::{AnalyzeResponse, MealImage};
pub use meal::{parse_timestamp, MealAnalysis, MealRecord};
pub use patient::Patient;
pub use recommendation::{Recommendation, DISPLAYED_TAGS};
pub use report::{NutrientReport, NutrientReportEntry};
