//! FitHero onboarding: a guided, pack-aware onboarding flow.

pub mod cli;
pub mod config;
pub mod error;
pub mod onboarding;
pub mod store;
