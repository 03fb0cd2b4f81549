//! OnboardingManager: owns one user's session and persists it.
//!
//! Navigation always runs against the in-memory session; persistence happens
//! after the lock is released and its failures are only logged.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::config::OnboardingConfig;
use crate::error::SessionError;
use crate::store::Database;

use super::navigator::FlowNavigator;
use super::packs::PackRecommendation;
use super::profile::OnboardingProfile;
use super::session::{OnboardingSession, SessionSnapshot, SessionView, Transition};

/// Keys under which onboarding data lives in the settings table.
pub mod settings_keys {
    pub const ONBOARDING_SESSION: &str = "onboarding_session";
    pub const ONBOARDING_PROFILE: &str = "onboarding_profile";
}

/// Number of packs offered by default.
pub const DEFAULT_RECOMMENDATIONS: usize = 3;

/// Result of an operation, as returned to the presentation layer.
#[derive(Debug, Clone, Serialize)]
pub struct OnboardingStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transition: Option<Transition>,
    pub session: SessionView,
}

/// Coordinates one onboarding session with its persistence collaborator.
pub struct OnboardingManager {
    db: Arc<dyn Database>,
    navigator: Arc<FlowNavigator>,
    user_id: String,
    autosave: bool,
    session: RwLock<OnboardingSession>,
}

impl OnboardingManager {
    /// Resume the user's stored session, or start a new one seeded with
    /// `seed`. A stored snapshot that no longer fits the catalog is dropped.
    pub async fn start_or_resume(
        db: Arc<dyn Database>,
        navigator: Arc<FlowNavigator>,
        config: &OnboardingConfig,
        seed: &Map<String, Value>,
    ) -> Self {
        let user_id = config.user_id.clone();
        let stored = match db
            .get_setting(&user_id, settings_keys::ONBOARDING_SESSION)
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                warn!(user_id = %user_id, "Failed to load onboarding session: {e}");
                None
            }
        };

        let resumed = stored.and_then(|value| {
            let snapshot = serde_json::from_value::<SessionSnapshot>(value)
                .map_err(|e| warn!(user_id = %user_id, "Discarding unreadable session: {e}"))
                .ok()?;
            OnboardingSession::restore(Arc::clone(&navigator), snapshot)
                .map_err(|e| warn!(user_id = %user_id, "Discarding stored session: {e}"))
                .ok()
        });

        let session = match resumed {
            Some(session) => {
                info!(
                    user_id = %user_id,
                    step = %session.current_step_id(),
                    phase = %session.phase(),
                    "Onboarding session resumed"
                );
                session
            }
            None => {
                let session = OnboardingSession::seeded(Arc::clone(&navigator), seed)
                    .with_tips(config.show_tips);
                info!(user_id = %user_id, session_id = %session.session_id(), "Onboarding session started");
                session
            }
        };

        Self {
            db,
            navigator,
            user_id,
            autosave: config.autosave,
            session: RwLock::new(session),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn navigator(&self) -> &FlowNavigator {
        &self.navigator
    }

    /// Current presentation view.
    pub async fn view(&self) -> Result<SessionView, SessionError> {
        self.session.read().await.view()
    }

    /// Current in-memory profile.
    pub async fn profile(&self) -> OnboardingProfile {
        self.session.read().await.profile().clone()
    }

    /// Packs ranked for the profile so far.
    pub async fn recommendations(&self, limit: usize) -> Vec<PackRecommendation> {
        self.session.read().await.recommendations(limit)
    }

    pub async fn set_response(&self, value: Value) -> Result<OnboardingStatus, SessionError> {
        let (_, session) = self.apply(|s| s.set_current_response(value)).await?;
        Ok(OnboardingStatus {
            transition: None,
            session,
        })
    }

    pub async fn next(&self) -> Result<OnboardingStatus, SessionError> {
        let (transition, session) = self.apply(OnboardingSession::go_to_next_step).await?;
        if let Transition::Completed { profile } = &transition {
            self.finalize(profile).await;
        }
        Ok(OnboardingStatus {
            transition: Some(transition),
            session,
        })
    }

    pub async fn back(&self) -> Result<OnboardingStatus, SessionError> {
        let (transition, session) = self.apply(OnboardingSession::go_to_previous_step).await?;
        Ok(OnboardingStatus {
            transition: Some(transition),
            session,
        })
    }

    pub async fn skip(&self) -> Result<OnboardingStatus, SessionError> {
        let (transition, session) = self.apply(OnboardingSession::skip_current_step).await?;
        if let Transition::Completed { profile } = &transition {
            self.finalize(profile).await;
        }
        Ok(OnboardingStatus {
            transition: Some(transition),
            session,
        })
    }

    pub async fn toggle_tips(&self) -> Result<OnboardingStatus, SessionError> {
        let (_, session) = self.apply(|s| Ok(s.toggle_tips())).await?;
        Ok(OnboardingStatus {
            transition: None,
            session,
        })
    }

    /// Mark the session busy while the presentation layer waits on
    /// something. `can_proceed` stays false until it is cleared.
    pub async fn set_loading(&self, loading: bool) -> Result<OnboardingStatus, SessionError> {
        let (_, session) = self.apply(|s| {
            s.set_loading(loading);
            Ok(())
        })
        .await?;
        Ok(OnboardingStatus {
            transition: None,
            session,
        })
    }

    pub async fn update_data(
        &self,
        partial: &Map<String, Value>,
    ) -> Result<OnboardingStatus, SessionError> {
        let (_, session) = self.apply(|s| s.update_data(partial)).await?;
        Ok(OnboardingStatus {
            transition: None,
            session,
        })
    }

    /// Run one reducer operation under the write lock, then persist the
    /// resulting snapshot once the lock is released.
    async fn apply<T>(
        &self,
        op: impl FnOnce(&mut OnboardingSession) -> Result<T, SessionError>,
    ) -> Result<(T, SessionView), SessionError> {
        let (result, snapshot) = {
            let mut session = self.session.write().await;
            let result = op(&mut *session).and_then(|value| Ok((value, session.view()?)));
            (result, session.snapshot())
        };
        if self.autosave {
            self.persist_snapshot(&snapshot).await;
        }
        result
    }

    /// Persist the session snapshot to the settings table.
    async fn persist_snapshot(&self, snapshot: &SessionSnapshot) {
        let value = match serde_json::to_value(snapshot) {
            Ok(v) => v,
            Err(e) => {
                warn!(user_id = %self.user_id, "Failed to serialize onboarding session: {e}");
                return;
            }
        };
        if let Err(e) = self
            .db
            .set_setting(&self.user_id, settings_keys::ONBOARDING_SESSION, &value)
            .await
        {
            warn!(user_id = %self.user_id, "Failed to persist onboarding session: {e}");
        }
    }

    /// Save the final profile and archive it.
    async fn finalize(&self, profile: &OnboardingProfile) {
        match serde_json::to_value(profile) {
            Ok(value) => {
                if let Err(e) = self
                    .db
                    .set_setting(&self.user_id, settings_keys::ONBOARDING_PROFILE, &value)
                    .await
                {
                    warn!(user_id = %self.user_id, "Failed to persist onboarding profile: {e}");
                }
            }
            Err(e) => warn!(user_id = %self.user_id, "Failed to serialize onboarding profile: {e}"),
        }

        if let Err(e) = self.db.archive_profile(&self.user_id, profile).await {
            warn!(user_id = %self.user_id, "Failed to archive onboarding profile: {e}");
        }
    }
}
