//! The profile accumulated during onboarding, plus its progress record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Schema version stamped on every profile.
pub const PROFILE_VERSION: &str = "1.0";

/// Progress through the flow.
///
/// `completed_steps` and `skipped_steps` are ordered sets: insertion order is
/// kept and a step id lives in at most one of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Progress {
    pub completed_steps: Vec<String>,
    pub skipped_steps: Vec<String>,
    pub total_steps: usize,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub skip_count: u32,
    pub back_count: u32,
    pub error_count: u32,
}

impl Progress {
    pub fn new(total_steps: usize) -> Self {
        let now = Utc::now();
        Self {
            completed_steps: Vec::new(),
            skipped_steps: Vec::new(),
            total_steps,
            started_at: now,
            last_activity: now,
            skip_count: 0,
            back_count: 0,
            error_count: 0,
        }
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completed_steps.iter().any(|s| s == id)
    }

    pub fn is_skipped(&self, id: &str) -> bool {
        self.skipped_steps.iter().any(|s| s == id)
    }

    /// Mark a step completed, pulling it out of the skipped set if needed.
    pub fn mark_completed(&mut self, id: &str) {
        self.skipped_steps.retain(|s| s != id);
        if !self.is_completed(id) {
            self.completed_steps.push(id.to_string());
        }
    }

    /// Mark a step skipped, pulling it out of the completed set if needed.
    pub fn mark_skipped(&mut self, id: &str) {
        self.completed_steps.retain(|s| s != id);
        if !self.is_skipped(id) {
            self.skipped_steps.push(id.to_string());
        }
    }

    /// Forget that a step was completed or skipped. Returns whether anything
    /// was removed.
    pub fn unvisit(&mut self, id: &str) -> bool {
        let before = self.completed_steps.len() + self.skipped_steps.len();
        self.completed_steps.retain(|s| s != id);
        self.skipped_steps.retain(|s| s != id);
        before != self.completed_steps.len() + self.skipped_steps.len()
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Whole-number completion percentage.
    pub fn percentage(&self) -> u8 {
        if self.total_steps == 0 {
            return 0;
        }
        let ratio = self.completed_steps.len() as f64 / self.total_steps as f64;
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

/// Everything the user has told us so far.
///
/// Answers are keyed by step id, or by a semantic field name when seeded from
/// prior data (`age`, `sport`, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OnboardingProfile {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_pack: Option<String>,
    #[serde(default)]
    pub answers: BTreeMap<String, Value>,
    pub progress: Progress,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Default for OnboardingProfile {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            version: PROFILE_VERSION.to_string(),
            selected_pack: None,
            answers: BTreeMap::new(),
            progress: Progress::new(0),
            started_at: now,
            last_updated: now,
            completed_at: None,
        }
    }
}

impl OnboardingProfile {
    /// Merge a partial object into the profile. `selectedPack` /
    /// `selected_pack` set the pack, `null` values remove answers, everything
    /// else is stored as an answer.
    ///
    /// Returns true if the selected pack changed.
    pub fn merge(&mut self, partial: &Map<String, Value>) -> bool {
        let previous_pack = self.selected_pack.clone();
        for (key, value) in partial {
            match key.as_str() {
                "selectedPack" | "selected_pack" => {
                    self.selected_pack = value.as_str().map(String::from);
                }
                _ if value.is_null() => {
                    self.answers.remove(key);
                }
                _ => {
                    self.answers.insert(key.clone(), value.clone());
                }
            }
        }
        self.last_updated = Utc::now();
        previous_pack != self.selected_pack
    }

    /// Store the committed answer for a step.
    pub fn record_answer(&mut self, step_id: &str, value: Value) {
        if value.is_null() {
            self.answers.remove(step_id);
        } else {
            self.answers.insert(step_id.to_string(), value);
        }
        self.last_updated = Utc::now();
    }

    pub fn answer(&self, step_id: &str) -> Option<&Value> {
        self.answers.get(step_id)
    }

    /// Look a field up by any of its names, first among top-level answers and
    /// then inside form answers.
    pub fn lookup(&self, names: &[&str]) -> Option<&Value> {
        let top = names
            .iter()
            .filter_map(|name| self.answers.get(*name))
            .find(|v| !v.is_null());
        if top.is_some() {
            return top;
        }
        self.answers
            .values()
            .filter_map(Value::as_object)
            .flat_map(|form| names.iter().filter_map(move |name| form.get(*name)))
            .find(|v| !v.is_null())
    }

    pub fn first_name(&self) -> Option<&str> {
        self.lookup(&["welcome", "firstName", "first_name"])
            .and_then(Value::as_str)
    }

    pub fn age(&self) -> Option<u32> {
        self.lookup(&["age"]).and_then(as_u32)
    }

    pub fn sport(&self) -> Option<&str> {
        self.lookup(&["sport-selection", "sport"])
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    pub fn objectives(&self) -> Vec<String> {
        self.lookup(&["main-objectives", "objectives", "fitnessGoals"])
            .map(string_list)
            .unwrap_or_default()
    }

    pub fn experience(&self) -> Option<&str> {
        self.lookup(&["fitness-experience", "experience", "sport-level"])
            .and_then(Value::as_str)
    }

    pub fn availability(&self) -> Option<&str> {
        self.lookup(&["training-availability", "availability"])
            .and_then(Value::as_str)
    }

    /// `None` when the user has not answered the health question at all.
    pub fn health_conditions(&self) -> Option<Vec<String>> {
        self.lookup(&["health-conditions", "healthConditions", "health_conditions"])
            .map(string_list)
    }

    pub fn selected_modules(&self) -> Vec<String> {
        self.lookup(&["module-selection", "selectedModules", "selected_modules"])
            .map(string_list)
            .unwrap_or_default()
    }

    pub fn wanted_features(&self) -> Vec<String> {
        self.lookup(&["wantedFeatures", "wanted_features"])
            .map(string_list)
            .unwrap_or_default()
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// A single string counts as a one-element list.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        Value::String(s) if !s.is_empty() => vec![s.clone()],
        _ => Vec::new(),
    }
}
