//! NutriView Status Tool
//!
//! Provides runtime status information about the NutriView service.

use serde::Serialize;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::config::ClientConfig;
use crate::session::SessionSnapshot;

/// Usage guide for assistants driving the tools
pub const ANALYSIS_INSTRUCTIONS: &str = r#"
# NutriView Meal Analysis

1. `list_patients` to see who can be analyzed. The first patient is selected on startup.
2. `select_patient` with a `user_id` to switch patients. The dashboard refreshes for that patient.
3. `attach_meal_image` with an absolute path to a meal photo.
4. `analyze_meal` uploads the photo and refreshes the dashboard.
5. `get_dashboard` shows the AI assessment, the top nutrients and recommended foods.

Notes:
- A "served from cache" badge means the backend reused an earlier analysis of the same image.
- If the backend is slow, `analyze_meal` waits and checks the meal history before giving up.
  Only report a failure to the user when the result says so.
- `get_meal_history`, `get_meal_details` and `get_meal_report` cover previously analyzed meals.
"#;

/// Status information returned by the status tool
#[derive(Debug, Serialize)]
pub struct NutriViewStatus {
    /// Build information
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,

    /// Backend connection
    pub api_url: String,
    pub request_timeout_secs: u64,

    /// Session information
    pub session_phase: &'static str,
    pub selected_patient_id: Option<i64>,
    pub patients_loaded: usize,

    /// Process information
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Status tracker for collecting runtime information
pub struct StatusTracker {
    start_time: Instant,
    config: ClientConfig,
}

impl StatusTracker {
    /// Create a new status tracker
    pub fn new(config: ClientConfig) -> Self {
        Self {
            start_time: Instant::now(),
            config,
        }
    }

    /// Get the current status
    pub fn get_status(&self, session: &SessionSnapshot) -> NutriViewStatus {
        let build_info = BuildInfo::current();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        NutriViewStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            api_url: self.config.api_url.clone(),
            request_timeout_secs: self.config.request_timeout.as_secs(),
            session_phase: session.phase.as_str(),
            selected_patient_id: session.selected_patient_id,
            patients_loaded: session.patients.len(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionPhase;

    #[test]
    fn test_status_reports_config_and_session() {
        let tracker = StatusTracker::new(ClientConfig::default());
        let session = SessionSnapshot {
            patients: Vec::new(),
            selected_patient_id: Some(4),
            selected_patient: None,
            pending_file: None,
            phase: SessionPhase::Uploading,
            in_flight: true,
            cache_badge_visible: false,
            notification: None,
            refresh_diagnostic: None,
            report: None,
            recommendations: Vec::new(),
            history: None,
        };

        let status = tracker.get_status(&session);
        assert_eq!(status.api_url, "http://localhost:8000");
        assert_eq!(status.request_timeout_secs, 30);
        assert_eq!(status.session_phase, "uploading");
        assert_eq!(status.selected_patient_id, Some(4));
        assert_eq!(status.process_id, std::process::id());
    }
}
