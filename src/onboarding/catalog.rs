//! Step catalog: the static onboarding graph and its lookups.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use super::flow;
use super::profile::OnboardingProfile;
use super::step::StepDefinition;
use crate::error::{CatalogError, SessionError};

/// Ordered, immutable set of step definitions.
#[derive(Debug, Clone)]
pub struct Catalog {
    steps: Vec<StepDefinition>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, checking ids, static targets, and dependencies.
    pub fn new(steps: Vec<StepDefinition>) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut index = HashMap::with_capacity(steps.len());
        for (i, step) in steps.iter().enumerate() {
            if index.insert(step.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateStep(step.id.clone()));
            }
        }

        for step in &steps {
            for target in step.next_step.static_targets() {
                if !index.contains_key(target) {
                    return Err(CatalogError::UnknownTarget {
                        from: step.id.clone(),
                        to: target.to_string(),
                    });
                }
            }
            for dependency in &step.dependencies {
                if !index.contains_key(dependency) {
                    return Err(CatalogError::UnknownDependency {
                        step: step.id.clone(),
                        dependency: dependency.clone(),
                    });
                }
            }
        }

        Ok(Self { steps, index })
    }

    /// The built-in fitness onboarding catalog.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(flow::builtin_steps()?)
    }

    pub fn get_step(&self, id: &str) -> Option<&StepDefinition> {
        self.index.get(id).map(|&i| &self.steps[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Position of a step in catalog order.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn first(&self) -> &StepDefinition {
        &self.steps[0]
    }

    pub fn last(&self) -> &StepDefinition {
        &self.steps[self.steps.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// Step ids in catalog order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.id.as_str())
    }

    /// Resolve the step after `current_id`. `Ok(None)` means `current_id` is
    /// terminal. A target missing from the catalog is a configuration error.
    pub fn resolve_next_step(
        &self,
        current_id: &str,
        answer: &Value,
        profile: &OnboardingProfile,
    ) -> Result<Option<String>, SessionError> {
        let step = self
            .get_step(current_id)
            .ok_or_else(|| SessionError::UnknownStep {
                from: current_id.to_string(),
                to: current_id.to_string(),
            })?;

        match step.next_step.resolve(answer, profile) {
            None => Ok(None),
            Some(next) if self.contains(&next) => Ok(Some(next)),
            Some(next) => Err(SessionError::UnknownStep {
                from: current_id.to_string(),
                to: next,
            }),
        }
    }

    /// True iff every dependency of the step is among `completed_steps`.
    /// Unknown steps can never be displayed.
    pub fn can_display(&self, step_id: &str, completed_steps: &[String]) -> bool {
        let Some(step) = self.get_step(step_id) else {
            return false;
        };
        let completed: HashSet<&str> = completed_steps.iter().map(String::as_str).collect();
        step.dependencies
            .iter()
            .all(|dep| completed.contains(dep.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::onboarding::step::{InputKind, NextStep};

    fn step(id: &str, next: NextStep) -> StepDefinition {
        StepDefinition::new(id, InputKind::Text, id).next(next)
    }

    fn to_b(_: &Value, _: &OnboardingProfile) -> String {
        "b".to_string()
    }

    fn to_nowhere(_: &Value, _: &OnboardingProfile) -> String {
        "nowhere".to_string()
    }

    #[test]
    fn builtin_catalog_is_valid() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.first().id, "welcome");
        assert_eq!(catalog.last().id, "completion");
        assert!(catalog.get_step("personal-info").is_some());
        assert!(catalog.get_step("nope").is_none());
    }

    #[test]
    fn rejects_empty_catalog() {
        assert!(matches!(Catalog::new(vec![]), Err(CatalogError::Empty)));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Catalog::new(vec![
            step("a", NextStep::Terminal),
            step("a", NextStep::Terminal),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateStep(id) if id == "a"));
    }

    #[test]
    fn rejects_unknown_fixed_target() {
        let err = Catalog::new(vec![step("a", NextStep::fixed("zzz"))]).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownTarget { to, .. } if to == "zzz"));
    }

    #[test]
    fn rejects_unknown_branch_target() {
        let err = Catalog::new(vec![
            step(
                "a",
                NextStep::Branch {
                    cases: vec![(json!(1), "missing".to_string())],
                    otherwise: "a".to_string(),
                },
            ),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownTarget { to, .. } if to == "missing"));
    }

    #[test]
    fn rejects_unknown_dependency() {
        let err = Catalog::new(vec![
            step("a", NextStep::Terminal).depends_on(&["ghost"]),
        ])
        .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownDependency { dependency, .. } if dependency == "ghost"));
    }

    #[test]
    fn resolve_fixed_and_terminal() {
        let catalog = Catalog::new(vec![
            step("a", NextStep::fixed("b")),
            step("b", NextStep::Terminal),
        ])
        .unwrap();
        let profile = OnboardingProfile::default();
        assert_eq!(
            catalog.resolve_next_step("a", &json!("x"), &profile).unwrap(),
            Some("b".to_string())
        );
        assert_eq!(catalog.resolve_next_step("b", &json!("x"), &profile).unwrap(), None);
    }

    #[test]
    fn resolve_computed_branch() {
        let catalog = Catalog::new(vec![
            step("a", NextStep::Computed(to_b)),
            step("b", NextStep::Terminal),
        ])
        .unwrap();
        let profile = OnboardingProfile::default();
        assert_eq!(
            catalog.resolve_next_step("a", &Value::Null, &profile).unwrap(),
            Some("b".to_string())
        );
    }

    #[test]
    fn computed_branch_to_unknown_step_is_an_error() {
        let catalog = Catalog::new(vec![step("a", NextStep::Computed(to_nowhere))]).unwrap();
        let err = catalog
            .resolve_next_step("a", &Value::Null, &OnboardingProfile::default())
            .unwrap_err();
        assert_eq!(
            err,
            SessionError::UnknownStep {
                from: "a".into(),
                to: "nowhere".into()
            }
        );
        assert!(err.is_fatal());
    }

    #[test]
    fn can_display_checks_dependencies() {
        let catalog = Catalog::builtin().unwrap();
        assert!(!catalog.can_display("position-selection", &[]));
        assert!(catalog.can_display("position-selection", &["sport-selection".to_string()]));
        assert!(catalog.can_display("welcome", &[]));
        assert!(!catalog.can_display("unknown", &[]));
    }
}
