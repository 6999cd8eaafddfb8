//! Analysis session state
//!
//! The single value the controller mutates. Every transition is a method
//! here so the controller never juggles loose flags.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::models::{MealImage, MealRecord, NutrientReport, Patient, Recommendation};

/// How long the "served from cache" badge stays visible
pub const CACHE_BADGE_WINDOW: Duration = Duration::from_secs(4);
/// Wait before checking whether a timed-out analysis finished anyway
pub const TIMEOUT_GRACE_PERIOD: Duration = Duration::from_secs(5);
/// Upper bound on grace-period polls after a timeout
pub const MAX_RECOVERY_POLLS: u32 = 3;

// ============================================================================
// Phase and Tags
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    /// Loading data for a newly selected patient
    Refreshing,
    /// Meal image submission in progress
    Uploading,
    /// Submission timed out; polling for the background result
    AwaitingBackend { attempt: u32 },
    /// Re-fetching results after a submission
    Reconciling,
}

impl SessionPhase {
    /// True while a submission owns the session
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            SessionPhase::Uploading | SessionPhase::AwaitingBackend { .. } | SessionPhase::Reconciling
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Refreshing => "refreshing",
            SessionPhase::Uploading => "uploading",
            SessionPhase::AwaitingBackend { .. } => "awaiting_backend",
            SessionPhase::Reconciling => "reconciling",
        }
    }
}

/// Identifies which request a response belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RefreshTag {
    pub patient_id: i64,
    pub epoch: u64,
}

/// Data plus the tag it was fetched under
#[derive(Debug, Clone)]
struct Tagged<T> {
    tag: RefreshTag,
    value: T,
}

/// A user-facing failure message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    pub message: String,
    pub raised_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            raised_at: Utc::now(),
        }
    }
}

// ============================================================================
// Session State
// ============================================================================

#[derive(Debug)]
pub struct SessionState {
    patients: Vec<Patient>,
    selected_patient: Option<i64>,
    /// Tag of the latest selection
    selection: Option<RefreshTag>,
    pending_file: Option<MealImage>,
    phase: SessionPhase,
    epoch: u64,
    /// Epoch of the selection refresh still running, if any
    selection_refresh: Option<u64>,
    report: Option<Tagged<NutrientReport>>,
    recommendations: Option<Tagged<Vec<Recommendation>>>,
    history: Option<Tagged<Vec<MealRecord>>>,
    cache_badge: Option<u64>,
    badge_generation: u64,
    badge_timer: Option<JoinHandle<()>>,
    notification: Option<Notification>,
    refresh_diagnostic: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            patients: Vec::new(),
            selected_patient: None,
            selection: None,
            pending_file: None,
            phase: SessionPhase::Idle,
            epoch: 0,
            selection_refresh: None,
            report: None,
            recommendations: None,
            history: None,
            cache_badge: None,
            badge_generation: 0,
            badge_timer: None,
            notification: None,
            refresh_diagnostic: None,
        }
    }
}

/// What a new submission needs from the session
#[derive(Debug)]
pub struct SubmissionStart {
    pub patient_id: i64,
    /// Selection the submission belongs to; results are dropped once it changes
    pub selection: RefreshTag,
    pub image: MealImage,
    /// Meal ids already known for the patient, when history is loaded
    pub baseline: Option<HashSet<i64>>,
    /// Badge timer to abort
    pub stale_timer: Option<JoinHandle<()>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Patients and selection ---

    pub fn set_patients(&mut self, patients: Vec<Patient>) {
        self.patients = patients;
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn selected_patient(&self) -> Option<i64> {
        self.selected_patient
    }

    pub fn selected_patient_record(&self) -> Option<&Patient> {
        let id = self.selected_patient?;
        self.patients.iter().find(|p| p.user_id == id)
    }

    /// Whether `patient_id` may be selected given the loaded list
    pub fn knows_patient(&self, patient_id: i64) -> bool {
        self.patients.is_empty() || self.patients.iter().any(|p| p.user_id == patient_id)
    }

    /// Make `patient_id` active and tag the refresh for it.
    ///
    /// Returns the refresh tag and any badge timer that must be aborted.
    pub fn select(&mut self, patient_id: i64) -> (RefreshTag, Option<JoinHandle<()>>) {
        self.selected_patient = Some(patient_id);
        let stale_timer = self.clear_cache_badge();
        let tag = self.next_tag(patient_id);
        self.selection = Some(tag);
        self.selection_refresh = Some(tag.epoch);
        if self.phase == SessionPhase::Idle {
            self.phase = SessionPhase::Refreshing;
        }
        (tag, stale_timer)
    }

    /// Mark a selection refresh as done, if it is still the latest one
    pub fn finish_selection_refresh(&mut self, tag: RefreshTag) {
        if self.selection_refresh != Some(tag.epoch) {
            return;
        }
        self.selection_refresh = None;
        if self.phase == SessionPhase::Refreshing {
            self.phase = SessionPhase::Idle;
        }
    }

    pub fn next_tag(&mut self, patient_id: i64) -> RefreshTag {
        self.epoch += 1;
        RefreshTag {
            patient_id,
            epoch: self.epoch,
        }
    }

    pub fn is_current(&self, tag: RefreshTag) -> bool {
        self.selected_patient == Some(tag.patient_id)
    }

    /// Whether no selection happened since `selection` was made
    pub fn is_selection_current(&self, selection: RefreshTag) -> bool {
        self.selection == Some(selection)
    }

    // --- Tagged data slots ---

    fn accepts(&self, existing: Option<RefreshTag>, tag: RefreshTag) -> bool {
        if !self.is_current(tag) {
            return false;
        }
        match existing {
            Some(current) => current.epoch <= tag.epoch,
            None => true,
        }
    }

    /// Store a report unless the tag is stale. Returns whether it was applied.
    pub fn apply_report(&mut self, tag: RefreshTag, report: NutrientReport) -> bool {
        if !self.accepts(self.report.as_ref().map(|t| t.tag), tag) {
            return false;
        }
        self.report = Some(Tagged { tag, value: report });
        true
    }

    pub fn apply_recommendations(
        &mut self,
        tag: RefreshTag,
        recommendations: Vec<Recommendation>,
    ) -> bool {
        if !self.accepts(self.recommendations.as_ref().map(|t| t.tag), tag) {
            return false;
        }
        self.recommendations = Some(Tagged {
            tag,
            value: recommendations,
        });
        true
    }

    pub fn apply_history(&mut self, tag: RefreshTag, history: Vec<MealRecord>) -> bool {
        if !self.accepts(self.history.as_ref().map(|t| t.tag), tag) {
            return false;
        }
        self.history = Some(Tagged {
            tag,
            value: history,
        });
        true
    }

    /// Report for the selected patient only
    pub fn report(&self) -> Option<&NutrientReport> {
        self.report
            .as_ref()
            .filter(|t| self.is_current(t.tag))
            .map(|t| &t.value)
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        self.recommendations
            .as_ref()
            .filter(|t| self.is_current(t.tag))
            .map(|t| t.value.as_slice())
            .unwrap_or(&[])
    }

    pub fn history(&self) -> Option<&[MealRecord]> {
        self.history
            .as_ref()
            .filter(|t| self.is_current(t.tag))
            .map(|t| t.value.as_slice())
    }

    /// Meal ids known for `patient_id`, if its history is loaded
    pub fn known_meal_ids(&self, patient_id: i64) -> Option<HashSet<i64>> {
        self.history
            .as_ref()
            .filter(|t| t.tag.patient_id == patient_id)
            .map(|t| t.value.iter().map(|m| m.meal_id).collect())
    }

    pub fn set_refresh_diagnostic(&mut self, diagnostic: Option<String>) {
        self.refresh_diagnostic = diagnostic;
    }

    pub fn refresh_diagnostic(&self) -> Option<&str> {
        self.refresh_diagnostic.as_deref()
    }

    // --- Pending file and submission ---

    pub fn attach(&mut self, image: MealImage) {
        self.pending_file = Some(image);
    }

    pub fn pending_file(&self) -> Option<&MealImage> {
        self.pending_file.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Enter `Uploading` if a file and patient are present and nothing is in flight
    pub fn begin_submission(&mut self) -> Option<SubmissionStart> {
        if self.phase.is_in_flight() {
            return None;
        }
        let selection = self.selection?;
        let image = self.pending_file.clone()?;
        let patient_id = selection.patient_id;

        self.phase = SessionPhase::Uploading;
        self.notification = None;
        let stale_timer = self.clear_cache_badge();

        Some(SubmissionStart {
            patient_id,
            selection,
            baseline: self.known_meal_ids(patient_id),
            image,
            stale_timer,
        })
    }

    /// Move between in-flight phases; ignored once the submission ended
    pub fn advance_submission(&mut self, phase: SessionPhase) {
        if self.phase.is_in_flight() && phase.is_in_flight() {
            self.phase = phase;
        }
    }

    /// Leave the in-flight phases
    pub fn end_submission(&mut self) {
        if !self.phase.is_in_flight() {
            return;
        }
        self.phase = if self.selection_refresh.is_some() {
            SessionPhase::Refreshing
        } else {
            SessionPhase::Idle
        };
    }

    // --- Notifications ---

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notification = Some(Notification::new(message));
    }

    /// Notify only while `selection` is still current. Returns whether it was raised.
    pub fn notify_for(&mut self, selection: RefreshTag, message: impl Into<String>) -> bool {
        if !self.is_selection_current(selection) {
            return false;
        }
        self.notify(message);
        true
    }

    pub fn notification(&self) -> Option<&Notification> {
        self.notification.as_ref()
    }

    pub fn dismiss_notification(&mut self) -> Option<Notification> {
        self.notification.take()
    }

    // --- Cache badge ---

    /// Show the badge, returning its generation for the auto-hide timer
    pub fn show_cache_badge(&mut self) -> u64 {
        self.badge_generation += 1;
        self.cache_badge = Some(self.badge_generation);
        self.badge_generation
    }

    /// Show the badge only while `selection` is still current
    pub fn show_cache_badge_for(&mut self, selection: RefreshTag) -> Option<u64> {
        if !self.is_selection_current(selection) {
            return None;
        }
        Some(self.show_cache_badge())
    }

    /// Hide the badge if it is still the one shown as `generation`
    pub fn expire_cache_badge(&mut self, generation: u64) {
        if self.cache_badge == Some(generation) {
            self.cache_badge = None;
            self.badge_timer = None;
        }
    }

    /// Install the auto-hide timer, returning a previous one to abort
    pub fn replace_badge_timer(&mut self, timer: JoinHandle<()>) -> Option<JoinHandle<()>> {
        self.badge_timer.replace(timer)
    }

    fn clear_cache_badge(&mut self) -> Option<JoinHandle<()>> {
        self.cache_badge = None;
        self.badge_timer.take()
    }

    pub fn cache_badge_visible(&self) -> bool {
        self.cache_badge.is_some()
    }
}
