//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::onboarding::OnboardingProfile;
use crate::store::migrations;
use crate::store::traits::{ArchivedProfile, Database};

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests and ephemeral runs).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let backend = Self::from_database(db)?;
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn from_database(db: LibSqlDatabase) -> Result<Self, DatabaseError> {
        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Settings ────────────────────────────────────────────────────

    async fn get_setting(
        &self,
        user_id: &str,
        key: &str,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT value FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let value_str: String = row
                    .get(0)
                    .map_err(|e| DatabaseError::Query(format!("get_setting: {e}")))?;
                let value = serde_json::from_str(&value_str)
                    .map_err(|e| DatabaseError::Serialization(format!("{key}: {e}")))?;
                Ok(Some(value))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_setting: {e}"))),
        }
    }

    async fn set_setting(
        &self,
        user_id: &str,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();
        let value_str = serde_json::to_string(value)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        conn.execute(
            "INSERT INTO settings (user_id, key, value, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id, key) DO UPDATE SET value = ?3, updated_at = ?4",
            params![user_id, key, value_str, now],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("set_setting: {e}")))?;

        debug!(user_id, key, "Setting saved");
        Ok(())
    }

    async fn delete_setting(&self, user_id: &str, key: &str) -> Result<bool, DatabaseError> {
        let conn = self.conn();
        let count = conn
            .execute(
                "DELETE FROM settings WHERE user_id = ?1 AND key = ?2",
                params![user_id, key],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("delete_setting: {e}")))?;
        Ok(count > 0)
    }

    // ── Completed profiles ──────────────────────────────────────────

    async fn archive_profile(
        &self,
        user_id: &str,
        profile: &OnboardingProfile,
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let profile_json = serde_json::to_string(profile)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
        let completed_at = profile.completed_at.unwrap_or_else(Utc::now).to_rfc3339();

        conn.execute(
            "INSERT INTO completed_profiles (user_id, selected_pack, profile, completed_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (user_id) DO UPDATE SET
                selected_pack = ?2, profile = ?3, completed_at = ?4",
            params![
                user_id,
                profile.selected_pack.clone(),
                profile_json,
                completed_at
            ],
        )
        .await
        .map_err(|e| DatabaseError::Query(format!("archive_profile: {e}")))?;

        info!(user_id, pack = ?profile.selected_pack, "Onboarding profile archived");
        Ok(())
    }

    async fn get_archived_profile(
        &self,
        user_id: &str,
    ) -> Result<Option<ArchivedProfile>, DatabaseError> {
        let conn = self.conn();
        let mut rows = conn
            .query(
                "SELECT user_id, selected_pack, profile, completed_at
                 FROM completed_profiles WHERE user_id = ?1",
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_archived_profile: {e}")))?;

        let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("get_archived_profile: {e}")))?
        else {
            return Ok(None);
        };

        let read = |e: libsql::Error| DatabaseError::Query(format!("get_archived_profile: {e}"));
        let user_id: String = row.get(0).map_err(read)?;
        let selected_pack: Option<String> = row.get(1).map_err(read)?;
        let profile_json: String = row.get(2).map_err(read)?;
        let completed_at: String = row.get(3).map_err(read)?;

        let profile = serde_json::from_str(&profile_json)
            .map_err(|e| DatabaseError::Serialization(format!("archived profile: {e}")))?;

        Ok(Some(ArchivedProfile {
            user_id,
            selected_pack,
            profile,
            completed_at: parse_datetime(&completed_at),
        }))
    }
}
