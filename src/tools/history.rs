//! Meal history views
//!
//! Past meals of the selected patient and the detail/report of one meal.

use serde::Serialize;

use crate::models::{MealAnalysis, MealRecord, NutrientReport};
use crate::session::SessionSnapshot;
use crate::tools::dashboard::{report_metrics, ChartView, NutrientMetric};

/// One card in the history list
#[derive(Debug, Clone, Serialize)]
pub struct MealSummary {
    pub meal_id: i64,
    pub date: String,
    pub time: String,
    pub image_url: Option<String>,
}

impl From<&MealRecord> for MealSummary {
    fn from(meal: &MealRecord) -> Self {
        Self {
            meal_id: meal.meal_id,
            date: meal.display_date(),
            time: meal.display_time(),
            image_url: meal.image_url.clone(),
        }
    }
}

/// Response for get_meal_history
#[derive(Debug, Clone, Serialize)]
pub struct MealHistoryResponse {
    pub patient_id: Option<i64>,
    /// False until a history fetch for this patient has succeeded
    pub loaded: bool,
    pub meals: Vec<MealSummary>,
    pub total: usize,
}

/// Response for get_meal_details
#[derive(Debug, Clone, Serialize)]
pub struct MealDetailResponse {
    pub meal_id: i64,
    pub created_at: String,
    pub date: String,
    pub time: String,
    pub image_url: Option<String>,
    pub analysis: MealAnalysis,
}

/// Response for get_meal_report
#[derive(Debug, Clone, Serialize)]
pub struct MealReportResponse {
    pub meal_id: i64,
    pub summary: Option<String>,
    pub top_metrics: Vec<NutrientMetric>,
    pub chart: ChartView,
}

pub fn meal_history(snapshot: &SessionSnapshot) -> MealHistoryResponse {
    let meals: Vec<MealSummary> = snapshot
        .history
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(MealSummary::from)
        .collect();

    MealHistoryResponse {
        patient_id: snapshot.selected_patient_id,
        loaded: snapshot.history.is_some(),
        total: meals.len(),
        meals,
    }
}

pub fn meal_details(meal: &MealRecord) -> MealDetailResponse {
    MealDetailResponse {
        meal_id: meal.meal_id,
        created_at: meal.created_at.clone(),
        date: meal.display_date(),
        time: meal.display_time(),
        image_url: meal.image_url.clone(),
        analysis: meal.analysis(),
    }
}

pub fn meal_report(meal_id: i64, report: &NutrientReport) -> MealReportResponse {
    let (top_metrics, chart) = report_metrics(report);
    MealReportResponse {
        meal_id,
        summary: report.summary.clone(),
        top_metrics,
        chart,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NutrientReportEntry;
    use crate::session::SessionPhase;
    use serde_json::json;

    fn meal(meal_id: i64, created_at: &str, summary: serde_json::Value) -> MealRecord {
        MealRecord {
            meal_id,
            created_at: created_at.to_string(),
            ai_analysis_summary: summary,
            image_url: Some(format!("https://img.example/{}.jpg", meal_id)),
        }
    }

    fn snapshot(history: Option<Vec<MealRecord>>) -> SessionSnapshot {
        SessionSnapshot {
            patients: Vec::new(),
            selected_patient_id: Some(1),
            selected_patient: None,
            pending_file: None,
            phase: SessionPhase::Idle,
            in_flight: false,
            cache_badge_visible: false,
            notification: None,
            refresh_diagnostic: None,
            report: None,
            recommendations: Vec::new(),
            history,
        }
    }

    #[test]
    fn test_history_cards() {
        let snap = snapshot(Some(vec![
            meal(4, "2025-02-10T08:15:42", json!(null)),
            meal(5, "not a date", json!(null)),
        ]));
        let response = meal_history(&snap);

        assert!(response.loaded);
        assert_eq!(response.total, 2);
        assert_eq!(response.meals[0].date, "2025-02-10");
        assert_eq!(response.meals[0].time, "08:15");
        assert_eq!(response.meals[1].date, "not a date");
        assert_eq!(response.meals[1].time, "");
    }

    #[test]
    fn test_history_not_loaded() {
        let response = meal_history(&snapshot(None));
        assert!(!response.loaded);
        assert!(response.meals.is_empty());
    }

    #[test]
    fn test_details_decode_analysis() {
        let structured = meal(
            7,
            "2025-02-10T12:00:00",
            json!("{\"overall_analysis\": \"balanced\"}"),
        );
        let details = meal_details(&structured);
        assert_eq!(
            details.analysis,
            MealAnalysis::Structured(json!({"overall_analysis": "balanced"}))
        );

        let text = meal(8, "2025-02-10T12:00:00", json!("just some notes"));
        assert_eq!(
            meal_details(&text).analysis,
            MealAnalysis::Text("just some notes".to_string())
        );
    }

    #[test]
    fn test_meal_report_metrics() {
        let report = NutrientReport {
            summary: Some("Single meal".to_string()),
            report: vec![
                NutrientReportEntry {
                    nutrient_name: "zinc".to_string(),
                    percentage: 112.0,
                },
                NutrientReportEntry {
                    nutrient_name: "iron".to_string(),
                    percentage: 30.0,
                },
            ],
        };
        let response = meal_report(9, &report);
        assert_eq!(response.meal_id, 9);
        assert_eq!(response.top_metrics[0].nutrient_name, "zinc");
        assert_eq!(response.chart.series.len(), 2);
    }
}
