//! Error types for the onboarding engine.

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Problems with the static step or pack catalogs.
///
/// These are detected when a catalog is built. A catalog that constructed
/// successfully never produces them later.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Step catalog is empty")]
    Empty,

    #[error("Duplicate step id: {0}")]
    DuplicateStep(String),

    #[error("Step {from} points at unknown step {to}")]
    UnknownTarget { from: String, to: String },

    #[error("Step {step} depends on unknown step {dependency}")]
    UnknownDependency { step: String, dependency: String },

    #[error("Invalid pattern {pattern:?} on step {step}: {reason}")]
    InvalidPattern {
        step: String,
        pattern: String,
        reason: String,
    },

    #[error("Duplicate pack id: {0}")]
    DuplicatePack(String),

    #[error("Pack {pack} asks unknown step {step}")]
    UnknownPackQuestion { pack: String, step: String },
}

/// Errors raised by the onboarding session reducer.
///
/// Validation failures are not errors; they stay inside the session as
/// `validation_errors`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// Navigation produced a step id missing from the catalog. Fatal.
    #[error("Step {from} navigated to unknown step {to}")]
    UnknownStep { from: String, to: String },

    #[error("Step {step} cannot be skipped")]
    NotSkippable { step: String },

    #[error("Onboarding is already completed")]
    AlreadyCompleted,

    #[error("Session is faulted: {reason}")]
    Faulted { reason: String },

    /// Every remaining candidate after a step had unmet dependencies. Fatal.
    #[error("No displayable step after {from}")]
    NoDisplayableStep { from: String },

    #[error("Unknown pack: {0}")]
    UnknownPack(String),

    #[error("Invalid session snapshot: {0}")]
    InvalidSnapshot(String),
}

impl SessionError {
    /// Whether the session can keep going after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownStep { .. } | Self::NoDisplayableStep { .. } | Self::Faulted { .. }
        )
    }
}

/// Result type alias for the crate.
pub type Result<T> = std::result::Result<T, Error>;
