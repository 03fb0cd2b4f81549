//! The onboarding session: sole owner and mutator of one user's flow state.
//!
//! Every operation runs to completion synchronously. Validation failures are
//! reported as [`Transition::Rejected`] and keep the session on its step;
//! navigation configuration errors move the session to
//! [`SessionPhase::Failed`] for good.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::catalog::Catalog;
use super::flow;
use super::navigator::FlowNavigator;
use super::packs::{CUSTOM_PACK, PackQuery, PackRecommendation};
use super::profile::OnboardingProfile;
use super::step::{InputKind, StepDefinition, StepOption};
use super::validation::validate_response;
use crate::error::SessionError;

/// Called once with the final profile when the terminal step is committed.
pub type CompletionCallback = Box<dyn FnOnce(&OnboardingProfile) + Send + Sync>;

/// Lifecycle of a session.
///
/// Editing → Completed on the terminal step, Editing → Failed on a navigation
/// configuration error. Both are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Editing,
    Completed,
    Failed,
}

impl SessionPhase {
    pub fn can_transition_to(&self, target: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!((self, target), (Editing, Completed) | (Editing, Failed))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Editing => "editing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// Outcome of a navigation operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    /// The session moved from one step to another.
    Moved { from: String, to: String },
    /// Nothing to do (back with an empty history).
    Unchanged,
    /// The answer failed validation; the session stays put.
    Rejected { errors: Vec<String> },
    /// The terminal step was committed.
    Completed { profile: Box<OnboardingProfile> },
}

/// What a renderer needs to know about the current step.
#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub id: String,
    pub input_kind: InputKind,
    pub title: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    pub tags: Vec<String>,
    pub options: Vec<StepOption>,
    pub skippable: bool,
    pub estimated_seconds: u32,
}

/// Read-only projection of the session for the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub current_step: StepView,
    pub current_response: Value,
    pub progress_percentage: u8,
    pub is_last_step: bool,
    pub can_go_back: bool,
    pub can_proceed: bool,
    pub validation_errors: Vec<String>,
    /// Seconds.
    pub estimated_time_left: u32,
    pub available_steps: Vec<String>,
    pub is_loading: bool,
    pub show_tips: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tips: Vec<String>,
}

/// Serializable session state, used to resume after a restart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    #[serde(default)]
    pub phase: SessionPhase,
    pub current_step_id: String,
    #[serde(default)]
    pub current_response: Value,
    #[serde(default)]
    pub step_history: Vec<String>,
    #[serde(default)]
    pub available_steps: Vec<String>,
    #[serde(default)]
    pub show_tips: bool,
    #[serde(default)]
    pub is_loading: bool,
    pub profile: OnboardingProfile,
}

pub struct OnboardingSession {
    navigator: Arc<FlowNavigator>,
    session_id: Uuid,
    phase: SessionPhase,
    fault: Option<String>,
    current_step_id: String,
    current_response: Value,
    validation_errors: Vec<String>,
    step_history: Vec<String>,
    is_loading: bool,
    show_tips: bool,
    available_steps: Vec<String>,
    profile: OnboardingProfile,
    on_complete: Option<CompletionCallback>,
}

impl std::fmt::Debug for OnboardingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnboardingSession")
            .field("session_id", &self.session_id)
            .field("phase", &self.phase)
            .field("current_step_id", &self.current_step_id)
            .field("step_history", &self.step_history)
            .field("available_steps", &self.available_steps)
            .finish_non_exhaustive()
    }
}

impl OnboardingSession {
    /// Fresh session on the first catalog step with an empty profile.
    pub fn new(navigator: Arc<FlowNavigator>) -> Self {
        Self::seeded(navigator, &Map::new())
    }

    /// Fresh session whose profile starts from prior partial data. A seeded
    /// pack scopes the flow straight away.
    pub fn seeded(navigator: Arc<FlowNavigator>, seed: &Map<String, Value>) -> Self {
        let first = navigator.catalog().first().id.clone();
        let mut profile = OnboardingProfile::default();
        if !seed.is_empty() {
            profile.merge(seed);
        }
        let mut session = Self {
            navigator,
            session_id: Uuid::new_v4(),
            phase: SessionPhase::Editing,
            fault: None,
            current_step_id: first,
            current_response: Value::Null,
            validation_errors: Vec::new(),
            step_history: Vec::new(),
            is_loading: false,
            show_tips: false,
            available_steps: Vec::new(),
            profile,
            on_complete: None,
        };
        session.refresh_scope();
        session
    }

    /// Rebuild a session from a snapshot. Every step id it mentions must exist
    /// in the navigator's catalog.
    pub fn restore(
        navigator: Arc<FlowNavigator>,
        snapshot: SessionSnapshot,
    ) -> Result<Self, SessionError> {
        let catalog = navigator.catalog();
        if !catalog.contains(&snapshot.current_step_id) {
            return Err(SessionError::InvalidSnapshot(format!(
                "unknown current step {}",
                snapshot.current_step_id
            )));
        }
        if let Some(bad) = snapshot
            .step_history
            .iter()
            .chain(&snapshot.profile.progress.completed_steps)
            .chain(&snapshot.profile.progress.skipped_steps)
            .find(|id| !catalog.contains(id))
        {
            return Err(SessionError::InvalidSnapshot(format!("unknown step {bad}")));
        }

        let fault = (snapshot.phase == SessionPhase::Failed)
            .then(|| "restored from a failed session".to_string());
        let mut session = Self {
            navigator,
            session_id: snapshot.session_id,
            phase: snapshot.phase,
            fault,
            current_step_id: snapshot.current_step_id,
            current_response: snapshot.current_response,
            validation_errors: Vec::new(),
            step_history: snapshot.step_history,
            is_loading: snapshot.is_loading,
            show_tips: snapshot.show_tips,
            available_steps: Vec::new(),
            profile: snapshot.profile,
            on_complete: None,
        };
        session.refresh_scope();
        Ok(session)
    }

    /// Register the completion callback.
    pub fn on_complete(
        mut self,
        callback: impl FnOnce(&OnboardingProfile) + Send + Sync + 'static,
    ) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Set the initial tips visibility.
    pub fn with_tips(mut self, show_tips: bool) -> Self {
        self.show_tips = show_tips;
        self
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id,
            phase: self.phase,
            current_step_id: self.current_step_id.clone(),
            current_response: self.current_response.clone(),
            step_history: self.step_history.clone(),
            available_steps: self.available_steps.clone(),
            show_tips: self.show_tips,
            is_loading: self.is_loading,
            profile: self.profile.clone(),
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn current_step_id(&self) -> &str {
        &self.current_step_id
    }

    pub fn current_response(&self) -> &Value {
        &self.current_response
    }

    pub fn validation_errors(&self) -> &[String] {
        &self.validation_errors
    }

    pub fn step_history(&self) -> &[String] {
        &self.step_history
    }

    pub fn available_steps(&self) -> &[String] {
        &self.available_steps
    }

    pub fn profile(&self) -> &OnboardingProfile {
        &self.profile
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_completed(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    fn catalog(&self) -> &Catalog {
        self.navigator.catalog()
    }

    fn current_step(&self) -> Result<&StepDefinition, SessionError> {
        self.catalog()
            .get_step(&self.current_step_id)
            .ok_or_else(|| SessionError::Faulted {
                reason: format!("current step {} is not in the catalog", self.current_step_id),
            })
    }

    // ── Editing ─────────────────────────────────────────────────────

    /// Store a draft answer and validate it. Returns whether it is valid.
    pub fn set_current_response(&mut self, value: Value) -> Result<bool, SessionError> {
        self.ensure_editing()?;
        self.current_response = value;
        self.profile.progress.touch();
        Ok(self.validate_current_response())
    }

    /// Re-run the current step's rules against the draft answer. Every failing
    /// rule contributes its message.
    pub fn validate_current_response(&mut self) -> bool {
        self.validation_errors = match self.catalog().get_step(&self.current_step_id) {
            Some(step) => validate_response(step, &self.current_response),
            None => Vec::new(),
        };
        self.validation_errors.is_empty()
    }

    pub fn toggle_tips(&mut self) -> bool {
        self.show_tips = !self.show_tips;
        self.show_tips
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    /// Merge partial data into the profile and recompute the step scope.
    pub fn update_data(&mut self, partial: &Map<String, Value>) -> Result<(), SessionError> {
        self.ensure_editing()?;
        if self.profile.merge(partial) {
            debug!(pack = ?self.profile.selected_pack, "Selected pack changed");
        }
        self.profile.progress.touch();
        self.refresh_scope();
        Ok(())
    }

    // ── Navigation ──────────────────────────────────────────────────

    /// Commit the draft answer and move on, or stay with errors if it does not
    /// validate.
    pub fn go_to_next_step(&mut self) -> Result<Transition, SessionError> {
        self.ensure_editing()?;
        if !self.validate_current_response() {
            self.profile.progress.error_count += 1;
            self.profile.progress.touch();
            debug!(step = %self.current_step_id, errors = self.validation_errors.len(), "Answer rejected");
            return Ok(Transition::Rejected {
                errors: self.validation_errors.clone(),
            });
        }

        let step = self.current_step()?;
        let selects_pack = step.input_kind == InputKind::PackSelector;
        if selects_pack {
            self.check_pack_answer()?;
        }

        let from = self.current_step_id.clone();
        let answer = std::mem::take(&mut self.current_response);
        self.step_history.push(from.clone());
        if selects_pack {
            self.profile.selected_pack = answer.as_str().map(String::from);
        }
        self.profile.record_answer(&from, answer.clone());
        self.profile.progress.mark_completed(&from);
        self.refresh_scope();

        self.advance(from, &answer)
    }

    /// Return to the previous step. Both the step being left and the step
    /// returned to lose their completed or skipped status.
    pub fn go_to_previous_step(&mut self) -> Result<Transition, SessionError> {
        self.ensure_editing()?;
        let Some(previous) = self.step_history.pop() else {
            return Ok(Transition::Unchanged);
        };

        let leaving = std::mem::replace(&mut self.current_step_id, previous);
        self.profile.progress.unvisit(&leaving);
        self.profile.progress.unvisit(&self.current_step_id);
        self.current_response = self
            .profile
            .answer(&self.current_step_id)
            .cloned()
            .unwrap_or(Value::Null);
        self.validation_errors.clear();
        self.profile.progress.back_count += 1;
        self.profile.progress.touch();
        self.refresh_scope();

        debug!(from = %leaving, to = %self.current_step_id, "Went back");
        Ok(Transition::Moved {
            from: leaving,
            to: self.current_step_id.clone(),
        })
    }

    /// Skip the current step, advancing as if it were answered with null.
    pub fn skip_current_step(&mut self) -> Result<Transition, SessionError> {
        self.ensure_editing()?;
        let step = self.current_step()?;
        if !step.skippable {
            warn!(step = %step.id, "Refused to skip a required step");
            return Err(SessionError::NotSkippable {
                step: step.id.clone(),
            });
        }

        let from = self.current_step_id.clone();
        self.current_response = Value::Null;
        self.validation_errors.clear();
        self.step_history.push(from.clone());
        self.profile.record_answer(&from, Value::Null);
        self.profile.progress.mark_skipped(&from);
        self.profile.progress.skip_count += 1;

        self.advance(from, &Value::Null)
    }

    fn advance(&mut self, from: String, answer: &Value) -> Result<Transition, SessionError> {
        let next = self
            .navigator
            .next_step(&from, answer, &self.profile, &self.available_steps);

        match next {
            Ok(Some(to)) => {
                self.current_step_id = to.clone();
                self.current_response = Value::Null;
                self.validation_errors.clear();
                self.profile.progress.touch();
                debug!(from = %from, to = %to, "Advanced");
                Ok(Transition::Moved { from, to })
            }
            Ok(None) => Ok(self.complete()),
            Err(e) => {
                self.fail(&e);
                Err(e)
            }
        }
    }

    fn complete(&mut self) -> Transition {
        let now = Utc::now();
        self.phase = SessionPhase::Completed;
        self.profile.completed_at = Some(now);
        self.profile.last_updated = now;
        self.profile.progress.touch();
        info!(
            session_id = %self.session_id,
            pack = ?self.profile.selected_pack,
            answers = self.profile.answers.len(),
            "Onboarding completed"
        );
        if let Some(callback) = self.on_complete.take() {
            callback(&self.profile);
        }
        Transition::Completed {
            profile: Box::new(self.profile.clone()),
        }
    }

    fn fail(&mut self, err: &SessionError) {
        error!(
            session_id = %self.session_id,
            step = %self.current_step_id,
            "Onboarding navigation failed: {err}"
        );
        if self.phase.can_transition_to(SessionPhase::Failed) {
            self.phase = SessionPhase::Failed;
        }
        self.fault = Some(err.to_string());
    }

    fn ensure_editing(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Editing => Ok(()),
            SessionPhase::Completed => Err(SessionError::AlreadyCompleted),
            SessionPhase::Failed => Err(SessionError::Faulted {
                reason: self.fault.clone().unwrap_or_default(),
            }),
        }
    }

    /// A pack answer must be null, the custom pack, or a known pack id.
    fn check_pack_answer(&self) -> Result<(), SessionError> {
        match &self.current_response {
            Value::Null => Ok(()),
            Value::String(pack) if pack == CUSTOM_PACK || self.navigator.packs().get(pack).is_some() => {
                Ok(())
            }
            Value::String(pack) => Err(SessionError::UnknownPack(pack.clone())),
            other => Err(SessionError::UnknownPack(other.to_string())),
        }
    }

    fn refresh_scope(&mut self) {
        self.available_steps = self.navigator.available_steps(&self.profile);
        self.profile.progress.total_steps = self.available_steps.len();
    }

    // ── Presentation ────────────────────────────────────────────────

    /// Packs ranked for what the profile says so far.
    pub fn recommendations(&self, limit: usize) -> Vec<PackRecommendation> {
        let query = PackQuery::from_profile(&self.profile);
        self.navigator.packs().top_recommendations(&query, limit)
    }

    /// Seconds left over the effective steps not yet completed or skipped.
    pub fn estimated_time_left(&self) -> u32 {
        let progress = &self.profile.progress;
        self.available_steps
            .iter()
            .filter(|id| !progress.is_completed(id) && !progress.is_skipped(id))
            .filter_map(|id| self.catalog().get_step(id))
            .map(|step| step.estimated_seconds)
            .sum()
    }

    /// Every pack in catalog order, then the custom pack.
    fn pack_options(&self) -> Vec<StepOption> {
        self.navigator
            .packs()
            .packs()
            .iter()
            .map(|pack| StepOption::new(&pack.id, &pack.name))
            .chain(std::iter::once(StepOption::new(CUSTOM_PACK, "Build my own")))
            .collect()
    }

    pub fn view(&self) -> Result<SessionView, SessionError> {
        let step = self.current_step()?;
        let options = match step.input_kind {
            InputKind::PackSelector if step.options.is_empty() => self.pack_options(),
            _ => flow::dynamic_options(&step.id, &self.profile)
                .unwrap_or_else(|| step.options.clone()),
        };

        Ok(SessionView {
            session_id: self.session_id,
            phase: self.phase,
            current_step: StepView {
                id: step.id.clone(),
                input_kind: step.input_kind,
                title: step.title.clone(),
                prompt: step.prompt.clone(),
                subtitle: step.subtitle.clone(),
                tags: step.tags.clone(),
                options,
                skippable: step.skippable,
                estimated_seconds: step.estimated_seconds,
            },
            current_response: self.current_response.clone(),
            progress_percentage: self.profile.progress.percentage(),
            is_last_step: self
                .navigator
                .is_last_step(&self.current_step_id, &self.available_steps),
            can_go_back: self.phase == SessionPhase::Editing && !self.step_history.is_empty(),
            can_proceed: self.validation_errors.is_empty() && !self.is_loading,
            validation_errors: self.validation_errors.clone(),
            estimated_time_left: self.estimated_time_left(),
            available_steps: self.available_steps.clone(),
            is_loading: self.is_loading,
            show_tips: self.show_tips,
            tips: if self.show_tips {
                step.tips.clone()
            } else {
                Vec::new()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::onboarding::packs::PackCatalog;
    use crate::onboarding::step::NextStep;

    fn navigator() -> Arc<FlowNavigator> {
        let catalog = Arc::new(Catalog::builtin().unwrap());
        let packs = Arc::new(PackCatalog::builtin(&catalog).unwrap());
        Arc::new(FlowNavigator::new(catalog, packs))
    }

    fn answer(session: &mut OnboardingSession, value: Value) -> Transition {
        session.set_current_response(value).unwrap();
        session.go_to_next_step().unwrap()
    }

    #[test]
    fn starts_on_first_step_with_full_scope() {
        let session = OnboardingSession::new(navigator());
        assert_eq!(session.current_step_id(), "welcome");
        assert_eq!(session.phase(), SessionPhase::Editing);
        assert_eq!(session.available_steps().len(), session.catalog().len());
        assert!(session.step_history().is_empty());
    }

    #[test]
    fn invalid_answer_is_rejected_and_counted() {
        let mut session = OnboardingSession::new(navigator());
        assert!(!session.set_current_response(json!("")).unwrap());
        let transition = session.go_to_next_step().unwrap();
        assert!(matches!(transition, Transition::Rejected { ref errors } if !errors.is_empty()));
        assert_eq!(session.current_step_id(), "welcome");
        assert_eq!(session.profile().progress.error_count, 1);
        assert!(session.profile().progress.completed_steps.is_empty());
    }

    #[test]
    fn revalidation_is_idempotent() {
        let mut session = OnboardingSession::new(navigator());
        session.set_current_response(json!("1")).unwrap();
        let first = session.validation_errors().to_vec();
        session.validate_current_response();
        assert_eq!(session.validation_errors(), first.as_slice());
    }

    #[test]
    fn next_commits_answer_and_pushes_history() {
        let mut session = OnboardingSession::new(navigator());
        let transition = answer(&mut session, json!("Alex"));
        assert_eq!(
            transition,
            Transition::Moved {
                from: "welcome".into(),
                to: "pack-selection".into()
            }
        );
        assert_eq!(session.step_history(), ["welcome".to_string()]);
        assert_eq!(session.profile().answer("welcome"), Some(&json!("Alex")));
        assert!(session.profile().progress.is_completed("welcome"));
        assert_eq!(session.current_response(), &Value::Null);
    }

    #[test]
    fn pack_selection_scopes_steps() {
        let mut session = OnboardingSession::new(navigator());
        answer(&mut session, json!("Alex"));
        answer(&mut session, json!("wellness"));
        assert_eq!(session.profile().selected_pack.as_deref(), Some("wellness"));
        assert_eq!(
            session.available_steps(),
            [
                "welcome",
                "pack-selection",
                "lifestyle-preferences",
                "dietary-preferences",
                "sleep-habits",
                "personal-info",
                "health-conditions",
                "notifications-preferences",
                "completion",
            ]
        );
        assert_eq!(session.current_step_id(), "lifestyle-preferences");
        assert_eq!(session.profile().progress.total_steps, 9);
    }

    #[test]
    fn unknown_pack_is_refused_without_state_change() {
        let mut session = OnboardingSession::new(navigator());
        answer(&mut session, json!("Alex"));
        session.set_current_response(json!("bogus")).unwrap();
        let err = session.go_to_next_step().unwrap_err();
        assert_eq!(err, SessionError::UnknownPack("bogus".into()));
        assert!(!err.is_fatal());
        assert_eq!(session.current_step_id(), "pack-selection");
        assert_eq!(session.current_response(), &json!("bogus"));
        assert_eq!(session.phase(), SessionPhase::Editing);
    }

    #[test]
    fn non_string_pack_answer_is_refused() {
        let mut session = OnboardingSession::new(navigator());
        answer(&mut session, json!("Alex"));
        for bad in [json!(42), json!(["wellness"]), json!({"id": "wellness"})] {
            session.set_current_response(bad.clone()).unwrap();
            let err = session.go_to_next_step().unwrap_err();
            assert_eq!(err, SessionError::UnknownPack(bad.to_string()));
            assert!(!err.is_fatal());
            assert_eq!(session.current_step_id(), "pack-selection");
            assert!(session.profile().selected_pack.is_none());
            assert!(!session.profile().progress.is_completed("pack-selection"));
        }
    }

    #[test]
    fn skip_after_back_drops_committed_answer() {
        let seed = json!({"selectedPack": "wellness"});
        let mut session = OnboardingSession::seeded(navigator(), seed.as_object().unwrap());
        answer(&mut session, json!("Alex"));
        answer(&mut session, json!("wellness"));
        answer(&mut session, json!("sedentary"));
        answer(&mut session, json!(["vegan"]));
        session.go_to_previous_step().unwrap();
        assert_eq!(session.current_step_id(), "dietary-preferences");
        assert_eq!(session.current_response(), &json!(["vegan"]));

        session.skip_current_step().unwrap();
        assert!(session.profile().progress.is_skipped("dietary-preferences"));
        assert!(session.profile().answer("dietary-preferences").is_none());
    }

    #[test]
    fn history_symmetry() {
        let mut session = OnboardingSession::new(navigator());
        let start = session.current_step_id().to_string();
        let completed_before = session.profile().progress.completed_steps.clone();

        answer(&mut session, json!("Alex"));
        answer(&mut session, json!("fitness"));
        answer(&mut session, json!(["gain-muscle"]));
        for _ in 0..3 {
            session.go_to_previous_step().unwrap();
        }

        assert_eq!(session.current_step_id(), start);
        assert_eq!(session.profile().progress.completed_steps, completed_before);
        assert_eq!(session.profile().progress.back_count, 3);
        assert_eq!(session.current_response(), &json!("Alex"));
    }

    #[test]
    fn back_with_empty_history_is_a_no_op() {
        let mut session = OnboardingSession::new(navigator());
        assert_eq!(session.go_to_previous_step().unwrap(), Transition::Unchanged);
        assert_eq!(session.profile().progress.back_count, 0);
    }

    #[test]
    fn skip_requires_skippable_step() {
        let mut session = OnboardingSession::new(navigator());
        let err = session.skip_current_step().unwrap_err();
        assert_eq!(err, SessionError::NotSkippable { step: "welcome".into() });
        assert_eq!(session.current_step_id(), "welcome");
    }

    #[test]
    fn skip_exclusivity() {
        let seed = json!({"selectedPack": "wellness"});
        let mut session = OnboardingSession::seeded(navigator(), seed.as_object().unwrap());
        answer(&mut session, json!("Alex"));
        answer(&mut session, json!("wellness"));
        answer(&mut session, json!("sedentary"));

        assert_eq!(session.current_step_id(), "dietary-preferences");
        session.set_current_response(json!("vegan")).unwrap();
        session.go_to_next_step().unwrap();
        session.go_to_previous_step().unwrap();
        session.skip_current_step().unwrap();

        let progress = &session.profile().progress;
        assert!(progress.is_skipped("dietary-preferences"));
        for id in &progress.completed_steps {
            assert!(!progress.is_skipped(id), "{id} in both sets");
        }
        assert_eq!(progress.skip_count, 1);
        assert_eq!(session.current_step_id(), "sleep-habits");
    }

    #[test]
    fn seeded_pack_scopes_immediately() {
        let seed = json!({"selectedPack": "senior", "age": 67});
        let session = OnboardingSession::seeded(navigator(), seed.as_object().unwrap());
        assert_eq!(session.available_steps().len(), 2 + 2 + 4);
        assert_eq!(session.profile().age(), Some(67));
    }

    #[test]
    fn personal_info_requires_age() {
        let seed = json!({"selectedPack": "senior"});
        let mut session = OnboardingSession::seeded(navigator(), seed.as_object().unwrap());
        answer(&mut session, json!("Alex"));
        answer(&mut session, json!("senior"));
        answer(&mut session, json!("sedentary"));
        answer(&mut session, json!("1-2-sessions"));
        assert_eq!(session.current_step_id(), "personal-info");

        session.set_current_response(json!({"gender": "female"})).unwrap();
        let transition = session.go_to_next_step().unwrap();
        assert!(matches!(transition, Transition::Rejected { .. }));
        assert_eq!(session.current_step_id(), "personal-info");
        assert!(session.validation_errors().iter().any(|e| e.contains("age")));
    }

    #[test]
    fn completion_fires_callback_once() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        let seed = json!({"selectedPack": "senior"});
        let mut session = OnboardingSession::seeded(navigator(), seed.as_object().unwrap())
            .on_complete(move |profile| sink.lock().unwrap().push(profile.clone()));

        answer(&mut session, json!("Alex"));
        answer(&mut session, json!("senior"));
        answer(&mut session, json!("lightly-active"));
        answer(&mut session, json!("daily"));
        answer(&mut session, json!({"age": 70}));
        session.skip_current_step().unwrap(); // health-conditions
        session.skip_current_step().unwrap(); // notifications
        assert!(session.view().unwrap().is_last_step);
        let transition = session.go_to_next_step().unwrap();

        assert!(matches!(transition, Transition::Completed { .. }));
        assert!(session.is_completed());
        assert_eq!(session.go_to_next_step().unwrap_err(), SessionError::AlreadyCompleted);

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let profile = &calls[0];
        assert!(profile.is_completed());
        for step in ["welcome", "pack-selection", "lifestyle-preferences", "training-availability", "personal-info"] {
            assert!(profile.answer(step).is_some(), "{step} missing");
        }
    }

    #[test]
    fn unknown_branch_target_faults_session() {
        fn nowhere(_: &Value, _: &OnboardingProfile) -> String {
            "nowhere".to_string()
        }
        let catalog = Arc::new(
            Catalog::new(vec![
                StepDefinition::new("a", InputKind::Text, "a").next(NextStep::Computed(nowhere)),
            ])
            .unwrap(),
        );
        let packs = Arc::new(PackCatalog::new(Vec::new(), &catalog).unwrap());
        let mut session = OnboardingSession::new(Arc::new(FlowNavigator::new(catalog, packs)));

        session.set_current_response(json!("x")).unwrap();
        let err = session.go_to_next_step().unwrap_err();
        assert!(matches!(err, SessionError::UnknownStep { ref to, .. } if to == "nowhere"));
        assert_eq!(session.phase(), SessionPhase::Failed);
        assert!(matches!(
            session.go_to_previous_step(),
            Err(SessionError::Faulted { .. })
        ));
    }

    #[test]
    fn view_reflects_state() {
        let mut session = OnboardingSession::new(navigator());
        let view = session.view().unwrap();
        assert!(!view.can_go_back);
        assert!(view.can_proceed);
        assert!(view.tips.is_empty());
        assert_eq!(view.progress_percentage, 0);

        session.toggle_tips();
        session.set_loading(true);
        let view = session.view().unwrap();
        assert!(!view.tips.is_empty());
        assert!(!view.can_proceed);
    }

    #[test]
    fn view_offers_positions_for_chosen_sport() {
        let seed = json!({"selectedPack": "athlete"});
        let mut session = OnboardingSession::seeded(navigator(), seed.as_object().unwrap());
        answer(&mut session, json!("Alex"));
        answer(&mut session, json!("athlete"));
        answer(&mut session, json!("football"));
        let view = session.view().unwrap();
        assert_eq!(view.current_step.id, "position-selection");
        assert!(!view.current_step.options.is_empty());
    }

    #[test]
    fn pack_selector_lists_packs_and_custom() {
        let mut session = OnboardingSession::new(navigator());
        answer(&mut session, json!("Alex"));
        let options = session.view().unwrap().current_step.options;
        assert_eq!(options.len(), 7);
        assert_eq!(options[0].id, "athlete");
        assert_eq!(options[6].id, CUSTOM_PACK);
    }

    #[test]
    fn eta_shrinks_as_steps_complete() {
        let mut session = OnboardingSession::new(navigator());
        let before = session.estimated_time_left();
        answer(&mut session, json!("Alex"));
        assert_eq!(session.estimated_time_left(), before - 30);
    }

    #[test]
    fn snapshot_restore_roundtrip() {
        let mut session = OnboardingSession::new(navigator());
        answer(&mut session, json!("Alex"));
        session.set_current_response(json!("fitness")).unwrap();

        let snapshot = session.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: SessionSnapshot = serde_json::from_str(&json).unwrap();
        let restored = OnboardingSession::restore(navigator(), parsed).unwrap();

        assert_eq!(restored.session_id(), session.session_id());
        assert_eq!(restored.current_step_id(), "pack-selection");
        assert_eq!(restored.current_response(), &json!("fitness"));
        assert_eq!(restored.step_history(), session.step_history());
    }

    #[test]
    fn restore_rejects_unknown_steps() {
        let mut snapshot = OnboardingSession::new(navigator()).snapshot();
        snapshot.step_history.push("ghost".into());
        assert!(matches!(
            OnboardingSession::restore(navigator(), snapshot),
            Err(SessionError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn phase_transitions() {
        use SessionPhase::*;
        assert!(Editing.can_transition_to(Completed));
        assert!(Editing.can_transition_to(Failed));
        assert!(!Completed.can_transition_to(Editing));
        assert!(!Failed.can_transition_to(Completed));
        assert!(Completed.is_terminal());
        assert_eq!(Failed.to_string(), "failed");
    }
}
