//! Dashboard view
//!
//! Turns a session snapshot into the clinician dashboard: AI assessment,
//! top nutrient metrics, the adequacy chart and food recommendations.

use std::fmt::Write;

use serde::Serialize;

use crate::models::{NutrientReport, NutrientReportEntry, Recommendation};
use crate::nutrition::{
    display_name, rounded_percentage, top_nutrients, AdequacyStatus, DASHBOARD_TOP_N,
    REFERENCE_LINE,
};
use crate::session::SessionSnapshot;

const NO_NUTRIENT_DATA: &str = "No nutrient data available for this meal.";

/// One nutrient with its adequacy band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutrientMetric {
    pub nutrient_name: String,
    pub label: String,
    pub percentage: f64,
    pub rounded_percentage: i64,
    pub status: AdequacyStatus,
    pub color: &'static str,
}

impl NutrientMetric {
    pub fn from_entry(entry: &NutrientReportEntry) -> Self {
        let status = AdequacyStatus::classify(entry.percentage);
        Self {
            nutrient_name: entry.nutrient_name.clone(),
            label: display_name(&entry.nutrient_name),
            percentage: entry.percentage,
            rounded_percentage: rounded_percentage(entry.percentage),
            status,
            color: status.color(),
        }
    }
}

/// Bar chart of every nutrient in backend order
#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
    pub reference_line: f64,
    pub series: Vec<NutrientMetric>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecommendationView {
    pub food_name: String,
    pub serving: String,
    pub calories: i64,
    pub reason: String,
    pub tags: Vec<String>,
}

impl From<&Recommendation> for RecommendationView {
    fn from(rec: &Recommendation) -> Self {
        Self {
            food_name: rec.food_name.clone(),
            serving: rec.serving.clone(),
            calories: rec.calories.round() as i64,
            reason: rec.reason.clone(),
            tags: rec.display_tags(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientView {
    pub user_id: i64,
    pub label: String,
}

/// Everything the dashboard shows for the selected patient
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub patient: Option<PatientView>,
    pub summary: Option<String>,
    pub top_metrics: Vec<NutrientMetric>,
    pub chart: ChartView,
    pub recommendations: Vec<RecommendationView>,
    pub pending_file: Option<String>,
    pub cache_badge_visible: bool,
    pub in_flight: bool,
    pub phase: &'static str,
    pub notification: Option<String>,
    pub refresh_diagnostic: Option<String>,
}

/// Summary metrics and chart series for a report
pub fn report_metrics(report: &NutrientReport) -> (Vec<NutrientMetric>, ChartView) {
    let top_metrics = top_nutrients(&report.report, DASHBOARD_TOP_N)
        .iter()
        .map(NutrientMetric::from_entry)
        .collect();
    let chart = ChartView {
        reference_line: REFERENCE_LINE,
        series: report.report.iter().map(NutrientMetric::from_entry).collect(),
    };
    (top_metrics, chart)
}

/// Build the dashboard for the snapshot's selected patient
pub fn build_dashboard(snapshot: &SessionSnapshot) -> DashboardView {
    let patient = match (&snapshot.selected_patient, snapshot.selected_patient_id) {
        (Some(record), _) => Some(PatientView {
            user_id: record.user_id,
            label: record.display_label(),
        }),
        (None, Some(user_id)) => Some(PatientView {
            user_id,
            label: format!("Patient {}", user_id),
        }),
        (None, None) => None,
    };

    let (summary, top_metrics, chart) = match &snapshot.report {
        Some(report) => {
            let (top_metrics, chart) = report_metrics(report);
            (report.summary.clone(), top_metrics, chart)
        }
        None => (
            None,
            Vec::new(),
            ChartView {
                reference_line: REFERENCE_LINE,
                series: Vec::new(),
            },
        ),
    };

    DashboardView {
        patient,
        summary,
        top_metrics,
        chart,
        recommendations: snapshot
            .recommendations
            .iter()
            .map(RecommendationView::from)
            .collect(),
        pending_file: snapshot.pending_file.as_ref().map(|f| f.file_name.clone()),
        cache_badge_visible: snapshot.cache_badge_visible,
        in_flight: snapshot.in_flight,
        phase: snapshot.phase.as_str(),
        notification: snapshot.notification.as_ref().map(|n| n.message.clone()),
        refresh_diagnostic: snapshot.refresh_diagnostic.clone(),
    }
}

/// Plain-text rendering for terminals
pub fn render_text(view: &DashboardView) -> String {
    let mut out = String::new();

    match &view.patient {
        Some(patient) => {
            let _ = writeln!(out, "Patient: {}", patient.label);
        }
        None => {
            let _ = writeln!(out, "No patient selected");
        }
    }

    if let Some(message) = &view.notification {
        let _ = writeln!(out, "Analysis failed: {}", message);
    }
    if view.cache_badge_visible {
        let _ = writeln!(out, "[Served from cache]");
    }
    if view.in_flight {
        let _ = writeln!(out, "Analyzing... ({})", view.phase);
    }

    out.push_str("\nAI Assessment\n");
    let _ = writeln!(out, "{}", view.summary.as_deref().unwrap_or("-"));

    out.push('\n');
    if view.top_metrics.is_empty() {
        let _ = writeln!(out, "{}", NO_NUTRIENT_DATA);
    } else {
        for metric in &view.top_metrics {
            let _ = writeln!(
                out,
                "  {:<24} {:>5}%  {}",
                metric.label,
                metric.rounded_percentage,
                metric.status.as_str()
            );
        }
    }

    if !view.chart.series.is_empty() {
        let _ = writeln!(
            out,
            "\nMicronutrient Status (reference {}%)",
            view.chart.reference_line
        );
        for metric in &view.chart.series {
            let _ = writeln!(
                out,
                "  {:<24} {:>5}%",
                metric.label, metric.rounded_percentage
            );
        }
    }

    if !view.recommendations.is_empty() {
        out.push_str("\nRecommended Foods\n");
        for rec in &view.recommendations {
            let _ = writeln!(
                out,
                "  {} ({}, {} kcal): {}",
                rec.food_name, rec.serving, rec.calories, rec.reason
            );
            if !rec.tags.is_empty() {
                let _ = writeln!(out, "    tags: {}", rec.tags.join(", "));
            }
        }
    }

    if let Some(diagnostic) = &view.refresh_diagnostic {
        let _ = writeln!(out, "\n(last refresh incomplete: {})", diagnostic);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Patient;
    use crate::session::{Notification, SessionPhase};

    fn entry(name: &str, percentage: f64) -> NutrientReportEntry {
        NutrientReportEntry {
            nutrient_name: name.to_string(),
            percentage,
        }
    }

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            patients: Vec::new(),
            selected_patient_id: Some(3),
            selected_patient: Some(Patient {
                user_id: 3,
                full_name: "Noa Katz".to_string(),
                is_pregnant: true,
                gender: Some("female".to_string()),
            }),
            pending_file: None,
            phase: SessionPhase::Idle,
            in_flight: false,
            cache_badge_visible: false,
            notification: None,
            refresh_diagnostic: None,
            report: Some(NutrientReport {
                summary: Some("Low iron intake".to_string()),
                report: vec![
                    entry("iron", 40.0),
                    entry("vitamin_c", 150.0),
                    entry("calcium", 95.0),
                    entry("vitamin_b12", 10.0),
                    entry("folate", 60.0),
                ],
            }),
            recommendations: vec![Recommendation {
                food_name: "Lentils".to_string(),
                serving: "1 cup".to_string(),
                calories: 229.6,
                reason: "Iron (+37%)".to_string(),
                tags: Some("iron, vegan, fiber, protein".to_string()),
            }],
            history: None,
        }
    }

    #[test]
    fn test_top_metrics_sorted_and_classified() {
        let view = build_dashboard(&snapshot());

        let percentages: Vec<f64> = view.top_metrics.iter().map(|m| m.percentage).collect();
        assert_eq!(percentages, vec![150.0, 95.0, 60.0, 40.0]);

        assert_eq!(view.top_metrics[0].label, "Vitamin C");
        assert_eq!(view.top_metrics[0].status, AdequacyStatus::Excess);
        assert_eq!(view.top_metrics[1].status, AdequacyStatus::Adequate);
        assert_eq!(view.top_metrics[2].color, "#ef4444");
    }

    #[test]
    fn test_chart_keeps_backend_order() {
        let view = build_dashboard(&snapshot());
        let names: Vec<&str> = view
            .chart
            .series
            .iter()
            .map(|m| m.nutrient_name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["iron", "vitamin_c", "calcium", "vitamin_b12", "folate"]
        );
        assert_eq!(view.chart.reference_line, 100.0);
    }

    #[test]
    fn test_patient_and_recommendations() {
        let view = build_dashboard(&snapshot());
        assert_eq!(view.patient.unwrap().label, "Noa Katz (Pregnant)");

        let rec = &view.recommendations[0];
        assert_eq!(rec.calories, 230);
        assert_eq!(rec.tags, vec!["iron", "vegan", "fiber"]);
    }

    #[test]
    fn test_empty_report_renders_placeholder() {
        let mut snap = snapshot();
        snap.report = Some(NutrientReport::default());
        let text = render_text(&build_dashboard(&snap));
        assert!(text.contains(NO_NUTRIENT_DATA));
    }

    #[test]
    fn test_render_text_flags() {
        let mut snap = snapshot();
        snap.cache_badge_visible = true;
        snap.notification = Some(Notification::new("unsupported image format"));
        snap.refresh_diagnostic = Some("history: Request timed out".to_string());

        let text = render_text(&build_dashboard(&snap));
        assert!(text.contains("Patient: Noa Katz (Pregnant)"));
        assert!(text.contains("[Served from cache]"));
        assert!(text.contains("Analysis failed: unsupported image format"));
        assert!(text.contains("Low iron intake"));
        assert!(text.contains("Vitamin B12"));
        assert!(text.contains("last refresh incomplete"));
    }

    #[test]
    fn test_unknown_patient_record() {
        let mut snap = snapshot();
        snap.selected_patient = None;
        snap.report = None;
        let view = build_dashboard(&snap);
        assert_eq!(view.patient.unwrap().label, "Patient 3");
        assert!(view.summary.is_none());
        assert!(view.chart.series.is_empty());
    }
}
