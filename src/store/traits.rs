//! `Database` trait: the single async interface the onboarding engine
//! persists through.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;
use crate::onboarding::OnboardingProfile;

/// A completed onboarding profile as archived.
#[derive(Debug, Clone)]
pub struct ArchivedProfile {
    pub user_id: String,
    pub selected_pack: Option<String>,
    pub profile: OnboardingProfile,
    pub completed_at: DateTime<Utc>,
}

/// Backend-agnostic persistence for onboarding sessions and profiles.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Settings ────────────────────────────────────────────────────

    /// Get a JSON setting for a user.
    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or replace a JSON setting for a user.
    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Delete a setting. Returns true if it existed.
    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError>;

    // ── Completed profiles ──────────────────────────────────────────

    /// Store (or replace) the final profile of a completed onboarding.
    async fn archive_profile(
        &self,
        user_id: &str,
        profile: &OnboardingProfile,
    ) -> Result<(), DatabaseError>;

    /// Get the archived profile for a user, if onboarding was completed.
    async fn get_archived_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<ArchivedProfile>, DatabaseError>;
}
