//! NutriView MCP Server Implementation
//!
//! Exposes the analysis session as MCP tools.

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::api::HttpBackend;
use crate::config::ClientConfig;
use crate::models::{MealImage, Patient};
use crate::session::{AnalysisSessionController, RefreshOutcome, SessionError, SubmitOutcome};
use crate::tools::dashboard::{self, DashboardView};
use crate::tools::history;
use crate::tools::status::StatusTracker;

/// NutriView MCP Service
#[derive(Clone)]
pub struct NutriViewService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    session: AnalysisSessionController<HttpBackend>,
    tool_router: ToolRouter<NutriViewService>,
}

impl NutriViewService {
    pub fn new(config: ClientConfig, session: AnalysisSessionController<HttpBackend>) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(config))),
            session,
            tool_router: Self::tool_router(),
        }
    }

    fn dashboard(&self) -> DashboardView {
        dashboard::build_dashboard(&self.session.snapshot())
    }
}

fn session_error(e: SessionError) -> McpError {
    McpError::internal_error(e.to_string(), None)
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Response Structs
// ============================================================================

#[derive(Debug, Serialize)]
struct ListPatientsResponse {
    patients: Vec<Patient>,
    selected_patient_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SelectPatientResponse {
    refresh: RefreshOutcome,
    dashboard: DashboardView,
}

#[derive(Debug, Serialize)]
struct AttachMealImageResponse {
    attached: MealImage,
    mime_type: &'static str,
}

#[derive(Debug, Serialize)]
struct AnalyzeMealResponse {
    result: SubmitOutcome,
    dashboard: DashboardView,
}

#[derive(Debug, Serialize)]
struct MealReportUnavailable {
    meal_id: i64,
    error: &'static str,
}

// ============================================================================
// Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListPatientsParams {
    /// Re-fetch the list from the backend instead of using the loaded one
    #[serde(default)]
    pub reload: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SelectPatientParams {
    pub user_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AttachMealImageParams {
    /// Absolute path to the meal photo
    pub path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnalyzeMealParams {
    /// Attach this image first; otherwise the attached image is used
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MealIdParams {
    pub meal_id: i64,
}

// ============================================================================
// Tool Router
// ============================================================================

#[tool_router]
impl NutriViewService {
    // --- Status ---

    #[tool(description = "Get the current status of the NutriView service including build info, backend URL, session phase, and process information")]
    async fn nutriview_status(&self) -> Result<CallToolResult, McpError> {
        let snapshot = self.session.snapshot();
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&snapshot);
        json_result(&status)
    }

    #[tool(description = "Get step-by-step instructions for analyzing meals. Call this when starting a session or when unsure how to use the analysis tools.")]
    fn analysis_instructions(&self) -> Result<CallToolResult, McpError> {
        use crate::tools::status::ANALYSIS_INSTRUCTIONS;
        Ok(CallToolResult::success(vec![Content::text(ANALYSIS_INSTRUCTIONS)]))
    }

    // --- Patients ---

    #[tool(description = "List patients known to the backend and which one is selected")]
    async fn list_patients(&self, Parameters(p): Parameters<ListPatientsParams>) -> Result<CallToolResult, McpError> {
        let loaded = self.session.snapshot().patients;
        let patients = if p.reload || loaded.is_empty() {
            self.session.load_patients().await.map_err(session_error)?
        } else {
            loaded
        };
        json_result(&ListPatientsResponse {
            patients,
            selected_patient_id: self.session.snapshot().selected_patient_id,
        })
    }

    #[tool(description = "Select a patient and refresh their report, recommendations, and meal history")]
    async fn select_patient(&self, Parameters(p): Parameters<SelectPatientParams>) -> Result<CallToolResult, McpError> {
        let refresh = self.session.select_patient(p.user_id).await.map_err(session_error)?;
        json_result(&SelectPatientResponse {
            refresh,
            dashboard: self.dashboard(),
        })
    }

    // --- Analysis ---

    #[tool(description = "Attach a meal photo for the next analysis. Only checks that the file exists.")]
    fn attach_meal_image(&self, Parameters(p): Parameters<AttachMealImageParams>) -> Result<CallToolResult, McpError> {
        let attached = self.session.attach_file(&p.path).map_err(session_error)?;
        let mime_type = attached.mime_type();
        json_result(&AttachMealImageResponse { attached, mime_type })
    }

    #[tool(description = "Upload the attached meal photo for the selected patient and refresh the dashboard. Slow analyses are waited for and confirmed against the meal history.")]
    async fn analyze_meal(&self, Parameters(p): Parameters<AnalyzeMealParams>) -> Result<CallToolResult, McpError> {
        if let Some(path) = &p.path {
            self.session.attach_file(path).map_err(session_error)?;
        }
        let result = self.session.submit_analysis().await;
        json_result(&AnalyzeMealResponse {
            result,
            dashboard: self.dashboard(),
        })
    }

    #[tool(description = "Get the dashboard for the selected patient: AI assessment, top nutrients, chart series, recommendations, cache badge and last notification")]
    fn get_dashboard(&self) -> Result<CallToolResult, McpError> {
        json_result(&self.dashboard())
    }

    #[tool(description = "Re-fetch report, recommendations, and meal history for the selected patient")]
    async fn refresh_dashboard(&self) -> Result<CallToolResult, McpError> {
        let refresh = self.session.refresh().await.map_err(session_error)?;
        json_result(&SelectPatientResponse {
            refresh,
            dashboard: self.dashboard(),
        })
    }

    #[tool(description = "Dismiss the last analysis failure notification")]
    fn dismiss_notification(&self) -> Result<CallToolResult, McpError> {
        let dismissed = self.session.dismiss_notification();
        json_result(&dismissed)
    }

    // --- History ---

    #[tool(description = "List previously analyzed meals for the selected patient")]
    fn get_meal_history(&self) -> Result<CallToolResult, McpError> {
        json_result(&history::meal_history(&self.session.snapshot()))
    }

    #[tool(description = "Get the stored AI analysis of one meal from the history")]
    fn get_meal_details(&self, Parameters(p): Parameters<MealIdParams>) -> Result<CallToolResult, McpError> {
        let meal = self.session.meal_details(p.meal_id).map_err(session_error)?;
        json_result(&history::meal_details(&meal))
    }

    #[tool(description = "Get the nutrient report for a single past meal of the selected patient")]
    async fn get_meal_report(&self, Parameters(p): Parameters<MealIdParams>) -> Result<CallToolResult, McpError> {
        match self.session.view_meal_report(p.meal_id).await.map_err(session_error)? {
            Some(report) => json_result(&history::meal_report(p.meal_id, &report)),
            None => json_result(&MealReportUnavailable {
                meal_id: p.meal_id,
                error: "Patient selection changed while the report was loading",
            }),
        }
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for NutriViewService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nutriview".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("NutriView Clinical Meal Analysis".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "NutriView - meal photo analysis and nutrient adequacy for clinicians. \
                 Call analysis_instructions first. \
                 Patients: list_patients, select_patient. \
                 Analysis: attach_meal_image, analyze_meal, get_dashboard, refresh_dashboard, dismiss_notification. \
                 History: get_meal_history, get_meal_details, get_meal_report. \
                 Status: nutriview_status."
                    .into(),
            ),
        }
    }
}
