//! Onboarding flow engine.
//!
//! A declarative step graph ([`Catalog`]) walked by a per-user reducer
//! ([`OnboardingSession`]) that validates answers, accumulates an
//! [`OnboardingProfile`], and narrows the flow to the steps of the selected
//! smart pack. The [`OnboardingManager`] wraps one session behind a lock and
//! persists it best-effort.

pub mod catalog;
pub mod flow;
pub mod manager;
pub mod navigator;
pub mod packs;
pub mod profile;
pub mod routes;
pub mod session;
pub mod step;
pub mod validation;

pub use catalog::Catalog;
pub use manager::{OnboardingManager, OnboardingStatus};
pub use navigator::FlowNavigator;
pub use packs::{Difficulty, PackCatalog, PackQuery, PackRecommendation, SmartPack};
pub use profile::{OnboardingProfile, Progress};
pub use routes::{OnboardingRouteState, onboarding_routes};
pub use session::{OnboardingSession, SessionPhase, SessionSnapshot, SessionView, Transition};
pub use step::{InputKind, NextStep, StepDefinition, StepOption, ValidationRule};

use std::sync::Arc;

use crate::error::Result;

/// Build the navigator over the built-in step catalog and packs.
pub fn builtin_navigator() -> Result<Arc<FlowNavigator>> {
    let catalog = Arc::new(Catalog::builtin()?);
    let packs = Arc::new(PackCatalog::builtin(&catalog)?);
    Ok(Arc::new(FlowNavigator::new(catalog, packs)))
}
