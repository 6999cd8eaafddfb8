//! Analysis session controller
//!
//! Mediates between clinician intent (select patient, attach image, analyze)
//! and the backend. Responses are tagged with the patient and epoch they
//! were requested for and dropped when the selection has moved on.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::state::{
    Notification, RefreshTag, SessionPhase, SessionState, CACHE_BADGE_WINDOW, MAX_RECOVERY_POLLS,
    TIMEOUT_GRACE_PERIOD,
};
use super::{SessionError, SessionResult};
use crate::api::NutritionBackend;
use crate::models::{MealImage, MealRecord, NutrientReport, Patient, Recommendation};

// ============================================================================
// Outcomes and Snapshot
// ============================================================================

/// Result of one report/recommendations/history refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RefreshOutcome {
    /// At least one response arrived for a superseded tag and was dropped
    pub stale: bool,
    pub failures: Vec<String>,
}

impl RefreshOutcome {
    pub fn is_clean(&self) -> bool {
        !self.stale && self.failures.is_empty()
    }
}

/// Result of `submit_analysis`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Missing file or patient, or a submission already in flight
    Skipped,
    Analyzed {
        cached: bool,
        refresh_failures: Vec<String>,
    },
    /// Timed out, then found finished on the backend
    Recovered { refresh_failures: Vec<String> },
    /// Timed out and never confirmed within the poll bound
    Unconfirmed { message: String },
    /// Timed out, and the clinician selected a patient before recovery finished
    Superseded,
    Failed { message: String },
}

/// Read-only copy of the session for views
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub patients: Vec<Patient>,
    pub selected_patient_id: Option<i64>,
    pub selected_patient: Option<Patient>,
    pub pending_file: Option<MealImage>,
    pub phase: SessionPhase,
    pub in_flight: bool,
    pub cache_badge_visible: bool,
    pub notification: Option<Notification>,
    pub refresh_diagnostic: Option<String>,
    pub report: Option<NutrientReport>,
    pub recommendations: Vec<Recommendation>,
    pub history: Option<Vec<MealRecord>>,
}

// ============================================================================
// Controller
// ============================================================================

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Leaves the in-flight phases when a submission ends, however it ends
struct InFlightGuard {
    state: Arc<Mutex<SessionState>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.state).end_submission();
    }
}

pub struct AnalysisSessionController<B> {
    backend: Arc<B>,
    state: Arc<Mutex<SessionState>>,
}

impl<B> Clone for AnalysisSessionController<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            state: Arc::clone(&self.state),
        }
    }
}

impl<B: NutritionBackend> AnalysisSessionController<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(SessionState::new())),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    // --- Patients ---

    /// Load the patient list without touching the selection
    pub async fn fetch_patients(&self) -> SessionResult<Vec<Patient>> {
        let patients = self.backend.list_patients().await.map_err(|e| {
            error!("Failed to load patients: {}", e);
            e
        })?;
        info!("Loaded {} patients", patients.len());
        self.state().set_patients(patients.clone());
        Ok(patients)
    }

    /// Load the patient list; the first patient becomes the default selection
    pub async fn load_patients(&self) -> SessionResult<Vec<Patient>> {
        let patients = self.fetch_patients().await?;

        let selected = self.state().selected_patient();
        let default_selection = match selected {
            Some(_) => None,
            None => patients.first().map(|p| p.user_id),
        };

        if let Some(patient_id) = default_selection {
            self.select_patient(patient_id).await?;
        }

        Ok(patients)
    }

    /// Make a patient active and refresh their data.
    ///
    /// Refresh failures are not errors: previous data stays and a
    /// diagnostic is recorded.
    pub async fn select_patient(&self, patient_id: i64) -> SessionResult<RefreshOutcome> {
        let selection = {
            let mut state = self.state();
            if !state.knows_patient(patient_id) {
                return Err(SessionError::UnknownPatient(patient_id));
            }
            state.select(patient_id)
        };
        let (tag, stale_timer) = selection;
        if let Some(timer) = stale_timer {
            timer.abort();
        }
        info!("Selected patient {} (epoch {})", patient_id, tag.epoch);

        let outcome = self.refresh_tagged(tag).await;
        self.state().finish_selection_refresh(tag);
        Ok(outcome)
    }

    /// Re-run the refresh for the current patient
    pub async fn refresh(&self) -> SessionResult<RefreshOutcome> {
        let selected = self.state().selected_patient();
        let patient_id = selected.ok_or(SessionError::NoPatientSelected)?;
        self.select_patient(patient_id).await
    }

    async fn refresh_tagged(&self, tag: RefreshTag) -> RefreshOutcome {
        let patient_id = tag.patient_id;
        let (report, recommendations, history) = tokio::join!(
            self.backend.get_report(patient_id, None),
            self.backend.get_recommendations(patient_id),
            self.backend.get_history(patient_id),
        );

        let mut outcome = RefreshOutcome::default();
        let mut state = self.state();

        match report {
            Ok(report) => outcome.stale |= !state.apply_report(tag, report),
            Err(e) => outcome.failures.push(format!("report: {}", e)),
        }
        match recommendations {
            Ok(recs) => outcome.stale |= !state.apply_recommendations(tag, recs),
            Err(e) => outcome.failures.push(format!("recommendations: {}", e)),
        }
        match history {
            Ok(history) => outcome.stale |= !state.apply_history(tag, history),
            Err(e) => outcome.failures.push(format!("history: {}", e)),
        }

        if outcome.stale {
            debug!(
                "Discarded stale results for patient {} (epoch {})",
                patient_id, tag.epoch
            );
        }

        if state.is_current(tag) {
            if outcome.failures.is_empty() {
                state.set_refresh_diagnostic(None);
            } else {
                let diagnostic = outcome.failures.join("; ");
                warn!("Refresh for patient {} failed: {}", patient_id, diagnostic);
                state.set_refresh_diagnostic(Some(diagnostic));
            }
        }

        outcome
    }

    // --- Meal submission ---

    /// Store the image for the next analysis. Only existence is checked.
    pub fn attach_file<P: AsRef<Path>>(&self, path: P) -> SessionResult<MealImage> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SessionError::FileNotFound(path.to_path_buf()));
        }
        let image = MealImage::new(path);
        debug!("Attached meal image `{}`", image.file_name);
        self.state().attach(image.clone());
        Ok(image)
    }

    /// Upload the attached image and refresh the patient's results.
    ///
    /// A no-op without an attached file, without a selected patient, or
    /// while another submission is in flight.
    pub async fn submit_analysis(&self) -> SubmitOutcome {
        let start = self.state().begin_submission();
        let start = match start {
            Some(start) => start,
            None => {
                debug!("Analysis skipped: no file, no patient, or already in flight");
                return SubmitOutcome::Skipped;
            }
        };
        if let Some(timer) = start.stale_timer {
            timer.abort();
        }
        let _in_flight = InFlightGuard {
            state: Arc::clone(&self.state),
        };

        let patient_id = start.patient_id;
        let selection = start.selection;
        let image = start.image;
        info!(
            "Submitting meal `{}` for patient {}",
            image.file_name, patient_id
        );

        let bytes = match tokio::fs::read(&image.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return self.fail(format!("Could not read {}: {}", image.path.display(), e));
            }
        };

        match self.backend.analyze_meal(patient_id, &image, bytes).await {
            Ok(response) => {
                if response.cached && self.show_cache_badge(selection) {
                    info!("Analysis for patient {} served from cache", patient_id);
                }
                self.state().advance_submission(SessionPhase::Reconciling);
                let tag = self.state().next_tag(patient_id);
                let outcome = self.refresh_tagged(tag).await;
                SubmitOutcome::Analyzed {
                    cached: response.cached,
                    refresh_failures: outcome.failures,
                }
            }
            Err(e) if e.is_timeout_class() => {
                self.recover_after_timeout(selection, start.baseline).await
            }
            Err(e) => self.fail(e.user_message()),
        }
    }

    fn fail(&self, message: String) -> SubmitOutcome {
        error!("Analysis failed: {}", message);
        self.state().notify(message.clone());
        SubmitOutcome::Failed { message }
    }

    /// Badge for a cached result, unless the selection moved on meanwhile
    fn show_cache_badge(&self, selection: RefreshTag) -> bool {
        let generation = self.state().show_cache_badge_for(selection);
        let generation = match generation {
            Some(generation) => generation,
            None => {
                debug!(
                    "Cache badge for patient {} dropped: selection changed",
                    selection.patient_id
                );
                return false;
            }
        };
        let state = Arc::clone(&self.state);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(CACHE_BADGE_WINDOW).await;
            lock(&state).expire_cache_badge(generation);
            debug!("Cache badge {} expired", generation);
        });
        let previous = self.state().replace_badge_timer(timer);
        if let Some(previous) = previous {
            previous.abort();
        }
        true
    }

    fn superseded(&self, patient_id: i64) -> SubmitOutcome {
        info!(
            "Stopped recovery for patient {}: another selection was made",
            patient_id
        );
        SubmitOutcome::Superseded
    }

    /// The backend may finish after the client gave up. Wait, look for a
    /// meal that was not in the baseline history, then refresh once.
    ///
    /// Stops without notifying as soon as another selection is made.
    async fn recover_after_timeout(
        &self,
        selection: RefreshTag,
        baseline: Option<HashSet<i64>>,
    ) -> SubmitOutcome {
        let patient_id = selection.patient_id;
        warn!(
            "Analysis for patient {} timed out, checking whether it completed in the background",
            patient_id
        );

        let mut confirmed = false;
        for attempt in 1..=MAX_RECOVERY_POLLS {
            self.state()
                .advance_submission(SessionPhase::AwaitingBackend { attempt });
            tokio::time::sleep(TIMEOUT_GRACE_PERIOD).await;

            let current = self.state().is_selection_current(selection);
            if !current {
                return self.superseded(patient_id);
            }

            // Without a baseline there is nothing to compare against
            let known = match &baseline {
                Some(known) => known,
                None => {
                    confirmed = true;
                    break;
                }
            };

            match self.backend.get_history(patient_id).await {
                Ok(history) if history.iter().any(|m| !known.contains(&m.meal_id)) => {
                    info!(
                        "Background analysis for patient {} confirmed on poll {}",
                        patient_id, attempt
                    );
                    confirmed = true;
                    break;
                }
                Ok(_) => debug!(
                    "No new meal for patient {} yet (poll {}/{})",
                    patient_id, attempt, MAX_RECOVERY_POLLS
                ),
                Err(e) => warn!("History poll {} for patient {} failed: {}", attempt, patient_id, e),
            }
        }

        self.state().advance_submission(SessionPhase::Reconciling);
        let tag = self.state().next_tag(patient_id);
        let outcome = self.refresh_tagged(tag).await;

        if !confirmed {
            let waited = TIMEOUT_GRACE_PERIOD.as_secs() * u64::from(MAX_RECOVERY_POLLS);
            let message = format!(
                "Analysis did not complete within {} seconds after the request timed out",
                waited
            );
            let raised = self.state().notify_for(selection, message.clone());
            if !raised {
                return self.superseded(patient_id);
            }
            error!("{}", message);
            return SubmitOutcome::Unconfirmed { message };
        }

        if !outcome.failures.is_empty() {
            let message = format!(
                "Analysis may have completed, but refreshing results failed: {}",
                outcome.failures.join("; ")
            );
            let raised = self.state().notify_for(selection, message.clone());
            if !raised {
                return self.superseded(patient_id);
            }
            warn!("{}", message);
        }

        SubmitOutcome::Recovered {
            refresh_failures: outcome.failures,
        }
    }

    // --- History ---

    /// Report scoped to one historical meal of the selected patient.
    ///
    /// `Ok(None)` when the selection changed while the request was in flight.
    pub async fn view_meal_report(&self, meal_id: i64) -> SessionResult<Option<NutrientReport>> {
        let selected = self.state().selected_patient();
        let patient_id = selected.ok_or(SessionError::NoPatientSelected)?;

        let report = self.backend.get_report(patient_id, Some(meal_id)).await?;

        if self.state().selected_patient() != Some(patient_id) {
            debug!(
                "Discarded meal {} report for patient {}: selection changed",
                meal_id, patient_id
            );
            return Ok(None);
        }
        Ok(Some(report))
    }

    /// A meal from the loaded history of the selected patient
    pub fn meal_details(&self, meal_id: i64) -> SessionResult<MealRecord> {
        let state = self.state();
        state
            .history()
            .and_then(|meals| meals.iter().find(|m| m.meal_id == meal_id))
            .cloned()
            .ok_or(SessionError::UnknownMeal(meal_id))
    }

    // --- Views ---

    pub fn dismiss_notification(&self) -> Option<Notification> {
        self.state().dismiss_notification()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            patients: state.patients().to_vec(),
            selected_patient_id: state.selected_patient(),
            selected_patient: state.selected_patient_record().cloned(),
            pending_file: state.pending_file().cloned(),
            phase: state.phase(),
            in_flight: state.phase().is_in_flight(),
            cache_badge_visible: state.cache_badge_visible(),
            notification: state.notification().cloned(),
            refresh_diagnostic: state.refresh_diagnostic().map(str::to_string),
            report: state.report().cloned(),
            recommendations: state.recommendations().to_vec(),
            history: state.history().map(<[MealRecord]>::to_vec),
        }
    }
}
