//! Flow navigator: next-step resolution restricted to the selected pack.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::catalog::Catalog;
use super::packs::{CUSTOM_PACK, PackCatalog};
use super::profile::OnboardingProfile;
use crate::error::SessionError;

/// Steps every scoped flow opens with.
pub const LEAD_IN_STEPS: &[&str] = &["welcome", "pack-selection"];

/// Steps asked whatever pack is selected, in the order they close the flow.
pub const ALWAYS_ASKED_STEPS: &[&str] = &[
    "personal-info",
    "health-conditions",
    "notifications-preferences",
    "completion",
];

const MODULE_SELECTION_STEP: &str = "module-selection";

/// Steps each custom-pack module contributes.
const MODULE_STEPS: &[(&str, &[&str])] = &[
    (
        "sport",
        &["sport-selection", "position-selection", "sport-level", "season-period"],
    ),
    (
        "workout",
        &["fitness-experience", "equipment-available", "training-availability"],
    ),
    ("nutrition", &["dietary-preferences", "nutrition-objectives"]),
    ("sleep", &["sleep-habits"]),
    ("recovery", &["lifestyle-preferences"]),
    ("hydration", &["lifestyle-preferences"]),
    ("mental", &["lifestyle-preferences"]),
    ("analytics", &["main-objectives"]),
    ("social", &[]),
];

/// Resolves where the flow goes next, given the step catalog and the packs.
#[derive(Debug, Clone)]
pub struct FlowNavigator {
    catalog: Arc<Catalog>,
    packs: Arc<PackCatalog>,
}

impl FlowNavigator {
    pub fn new(catalog: Arc<Catalog>, packs: Arc<PackCatalog>) -> Self {
        Self { catalog, packs }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn packs(&self) -> &PackCatalog {
        &self.packs
    }

    /// The effective step list for a profile.
    ///
    /// Without a pack this is the whole catalog. With a pack it is the lead-in
    /// steps, the pack's own questions, then the always-asked steps. The
    /// custom pack swaps the pack questions for module-selection followed by
    /// the steps of each selected module, in catalog order.
    pub fn available_steps(&self, profile: &OnboardingProfile) -> Vec<String> {
        let Some(pack_id) = profile.selected_pack.as_deref() else {
            return self.catalog.ids().map(String::from).collect();
        };

        let middle: Vec<String> = if pack_id == CUSTOM_PACK {
            let mut picked: Vec<&str> = profile
                .selected_modules()
                .iter()
                .filter_map(|m| MODULE_STEPS.iter().find(|(id, _)| *id == m.as_str()))
                .flat_map(|(_, steps)| steps.iter().copied())
                .collect();
            picked.sort_by_key(|id| self.catalog.position(id));
            picked.dedup();
            std::iter::once(MODULE_SELECTION_STEP)
                .chain(picked)
                .map(String::from)
                .collect()
        } else if let Some(pack) = self.packs.get(pack_id) {
            pack.questions.clone()
        } else {
            warn!(pack = %pack_id, "Unknown pack selected, using the full catalog");
            return self.catalog.ids().map(String::from).collect();
        };

        LEAD_IN_STEPS
            .iter()
            .map(|s| s.to_string())
            .chain(
                middle
                    .into_iter()
                    .filter(|id| !ALWAYS_ASKED_STEPS.contains(&id.as_str())),
            )
            .chain(ALWAYS_ASKED_STEPS.iter().map(|s| s.to_string()))
            .filter(|id| self.catalog.contains(id))
            .collect()
    }

    /// Next step after committing `answer` on `current_id`, or `Ok(None)` at
    /// the end of the flow.
    ///
    /// A catalog target outside `available` is replaced by the successor of
    /// `current_id` in `available`. Steps whose dependencies are not in
    /// `completed` are passed over as if answered with null.
    pub fn next_step(
        &self,
        current_id: &str,
        answer: &Value,
        profile: &OnboardingProfile,
        available: &[String],
    ) -> Result<Option<String>, SessionError> {
        let mut candidate = self.scoped_next(current_id, answer, profile, available)?;

        for _ in 0..=self.catalog.len() {
            match candidate {
                Some(id) if !self.catalog.can_display(&id, &profile.progress.completed_steps) => {
                    debug!(step = %id, "Dependencies unmet, passing over step");
                    candidate = self.scoped_next(&id, &Value::Null, profile, available)?;
                }
                resolved => return Ok(resolved),
            }
        }

        Err(SessionError::NoDisplayableStep {
            from: current_id.to_string(),
        })
    }

    fn scoped_next(
        &self,
        current_id: &str,
        answer: &Value,
        profile: &OnboardingProfile,
        available: &[String],
    ) -> Result<Option<String>, SessionError> {
        let Some(target) = self.catalog.resolve_next_step(current_id, answer, profile)? else {
            return Ok(None);
        };
        if available.is_empty() || available.contains(&target) {
            return Ok(Some(target));
        }

        let successor = available
            .iter()
            .position(|id| id == current_id)
            .and_then(|i| available.get(i + 1));
        Ok(Some(successor.cloned().unwrap_or(target)))
    }

    /// True iff `current_id` closes the effective step list.
    pub fn is_last_step(&self, current_id: &str, available: &[String]) -> bool {
        match available.last() {
            Some(last) => last == current_id,
            None => self.catalog.last().id == current_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn navigator() -> FlowNavigator {
        let catalog = Arc::new(Catalog::builtin().unwrap());
        let packs = Arc::new(PackCatalog::builtin(&catalog).unwrap());
        FlowNavigator::new(catalog, packs)
    }

    fn with_pack(pack: &str) -> OnboardingProfile {
        OnboardingProfile {
            selected_pack: Some(pack.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn no_pack_means_full_catalog() {
        let nav = navigator();
        let steps = nav.available_steps(&OnboardingProfile::default());
        assert_eq!(steps.len(), nav.catalog().len());
        assert_eq!(steps.first().map(String::as_str), Some("welcome"));
    }

    #[test]
    fn wellness_scope_is_exact() {
        let steps = navigator().available_steps(&with_pack("wellness"));
        assert_eq!(
            steps,
            vec![
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
    }

    #[test]
    fn unknown_pack_falls_back_to_full_catalog() {
        let nav = navigator();
        assert_eq!(
            nav.available_steps(&with_pack("mystery")).len(),
            nav.catalog().len()
        );
    }

    #[test]
    fn custom_pack_scopes_selected_modules_in_catalog_order() {
        let mut profile = with_pack(CUSTOM_PACK);
        profile.record_answer("module-selection", json!(["sleep", "nutrition", "mental", "recovery"]));
        let steps = navigator().available_steps(&profile);
        assert_eq!(
            steps,
            vec![
                "welcome",
                "pack-selection",
                "module-selection",
                "lifestyle-preferences",
                "dietary-preferences",
                "sleep-habits",
                "nutrition-objectives",
                "personal-info",
                "health-conditions",
                "notifications-preferences",
                "completion",
            ]
        );
    }

    #[test]
    fn out_of_scope_target_moves_to_scope_successor() {
        let nav = navigator();
        let profile = with_pack("wellness");
        let scope = nav.available_steps(&profile);
        let next = nav
            .next_step("pack-selection", &json!("wellness"), &profile, &scope)
            .unwrap();
        assert_eq!(next.as_deref(), Some("lifestyle-preferences"));

        let next = nav
            .next_step("sleep-habits", &json!(8), &profile, &scope)
            .unwrap();
        assert_eq!(next.as_deref(), Some("personal-info"));
    }

    #[test]
    fn in_scope_branch_is_followed() {
        let nav = navigator();
        let mut profile = with_pack("athlete");
        profile.progress.mark_completed("sport-selection");
        let scope = nav.available_steps(&profile);

        let next = nav
            .next_step("sport-selection", &json!("football"), &profile, &scope)
            .unwrap();
        assert_eq!(next.as_deref(), Some("position-selection"));

        let next = nav
            .next_step("sport-selection", &json!("yoga"), &profile, &scope)
            .unwrap();
        assert_eq!(next.as_deref(), Some("sport-level"));
    }

    #[test]
    fn steps_with_unmet_dependencies_are_passed_over() {
        let nav = navigator();
        let profile = OnboardingProfile::default();
        let scope = nav.available_steps(&profile);
        // sport-selection is not completed, so position-selection cannot show.
        let next = nav
            .next_step("sport-selection", &json!("football"), &profile, &scope)
            .unwrap();
        assert_eq!(next.as_deref(), Some("sport-level"));
    }

    #[test]
    fn terminal_step_has_no_next() {
        let nav = navigator();
        let profile = OnboardingProfile::default();
        let scope = nav.available_steps(&profile);
        assert_eq!(
            nav.next_step("completion", &Value::Null, &profile, &scope).unwrap(),
            None
        );
    }

    #[test]
    fn last_step_uses_scope_or_catalog() {
        let nav = navigator();
        let scope = nav.available_steps(&with_pack("senior"));
        assert!(nav.is_last_step("completion", &scope));
        assert!(!nav.is_last_step("personal-info", &scope));
        assert!(nav.is_last_step("completion", &[]));
        assert!(nav.is_last_step("b", &["a".to_string(), "b".to_string()]));
    }
}
