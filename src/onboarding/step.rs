//! Step definitions: the static building blocks of the onboarding graph.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::profile::OnboardingProfile;

/// How a step collects its answer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Text,
    Number,
    Slider,
    SingleChoice,
    MultiChoice,
    Boolean,
    PackSelector,
    SportSelector,
    Form,
    Info,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Slider => "slider",
            Self::SingleChoice => "single_choice",
            Self::MultiChoice => "multi_choice",
            Self::Boolean => "boolean",
            Self::PackSelector => "pack_selector",
            Self::SportSelector => "sport_selector",
            Self::Form => "form",
            Self::Info => "info",
        };
        write!(f, "{s}")
    }
}

/// A selectable answer on a choice step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepOption {
    pub id: String,
    pub label: String,
    pub value: Value,
}

impl StepOption {
    /// Option whose value is its own id.
    pub fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            value: Value::String(id.to_string()),
        }
    }
}

/// What a validation rule checks.
#[derive(Debug, Clone)]
pub enum RuleKind {
    /// Fails on null, blank strings, and empty lists.
    Required,
    /// Lower bound on string length, list length, or numeric value.
    Min(f64),
    /// Upper bound on string length, list length, or numeric value.
    Max(f64),
    /// Strings must match the expression.
    Pattern(Regex),
}

/// A single validation rule with the message shown when it fails.
#[derive(Debug, Clone)]
pub struct ValidationRule {
    pub kind: RuleKind,
    /// For form answers (JSON objects), the field the rule applies to.
    /// `None` applies the rule to the whole answer.
    pub field: Option<String>,
    pub message: String,
}

impl ValidationRule {
    pub fn required(message: &str) -> Self {
        Self {
            kind: RuleKind::Required,
            field: None,
            message: message.to_string(),
        }
    }

    pub fn min(bound: f64, message: &str) -> Self {
        Self {
            kind: RuleKind::Min(bound),
            field: None,
            message: message.to_string(),
        }
    }

    pub fn max(bound: f64, message: &str) -> Self {
        Self {
            kind: RuleKind::Max(bound),
            field: None,
            message: message.to_string(),
        }
    }

    pub fn pattern(expr: &str, message: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            kind: RuleKind::Pattern(Regex::new(expr)?),
            field: None,
            message: message.to_string(),
        })
    }

    /// Scope the rule to one field of an object answer.
    pub fn on_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }
}

/// A pure branch function. Receives `Value::Null` when the step was skipped
/// and must not panic on it.
pub type BranchFn = fn(&Value, &OnboardingProfile) -> String;

/// Where a step leads once it is answered.
#[derive(Debug, Clone)]
pub enum NextStep {
    /// Always the same step.
    Fixed(String),
    /// Switch on the answer, authored as plain data.
    Branch {
        cases: Vec<(Value, String)>,
        otherwise: String,
    },
    /// Computed from the answer and everything collected so far.
    Computed(BranchFn),
    /// End of the flow.
    Terminal,
}

impl NextStep {
    pub fn fixed(id: &str) -> Self {
        Self::Fixed(id.to_string())
    }

    /// Resolve the next step id. `None` means the flow is finished.
    pub fn resolve(&self, answer: &Value, profile: &OnboardingProfile) -> Option<String> {
        match self {
            Self::Fixed(id) => Some(id.clone()),
            Self::Branch { cases, otherwise } => Some(
                cases
                    .iter()
                    .find(|(when, _)| when == answer)
                    .map(|(_, goto)| goto.clone())
                    .unwrap_or_else(|| otherwise.clone()),
            ),
            Self::Computed(branch) => Some(branch(answer, profile)),
            Self::Terminal => None,
        }
    }

    /// Targets known without evaluating anything. Computed branches are
    /// checked at runtime instead.
    pub fn static_targets(&self) -> Vec<&str> {
        match self {
            Self::Fixed(id) => vec![id.as_str()],
            Self::Branch { cases, otherwise } => cases
                .iter()
                .map(|(_, goto)| goto.as_str())
                .chain(std::iter::once(otherwise.as_str()))
                .collect(),
            Self::Computed(_) | Self::Terminal => Vec::new(),
        }
    }
}

/// One screen of the onboarding flow. Immutable once the catalog is built.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    pub id: String,
    pub input_kind: InputKind,
    pub title: String,
    pub prompt: String,
    pub subtitle: Option<String>,
    pub tags: Vec<String>,
    pub options: Vec<StepOption>,
    pub validation_rules: Vec<ValidationRule>,
    pub next_step: NextStep,
    pub estimated_seconds: u32,
    /// Steps that must be completed before this one may be shown.
    pub dependencies: Vec<String>,
    pub skippable: bool,
    pub tips: Vec<String>,
}

impl StepDefinition {
    pub fn new(id: &str, input_kind: InputKind, prompt: &str) -> Self {
        Self {
            id: id.to_string(),
            input_kind,
            title: String::new(),
            prompt: prompt.to_string(),
            subtitle: None,
            tags: Vec::new(),
            options: Vec::new(),
            validation_rules: Vec::new(),
            next_step: NextStep::Terminal,
            estimated_seconds: 30,
            dependencies: Vec::new(),
            skippable: false,
            tips: Vec::new(),
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle = Some(subtitle.to_string());
        self
    }

    pub fn tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn options(mut self, options: Vec<StepOption>) -> Self {
        self.options = options;
        self
    }

    pub fn rule(mut self, rule: ValidationRule) -> Self {
        self.validation_rules.push(rule);
        self
    }

    pub fn next(mut self, next_step: NextStep) -> Self {
        self.next_step = next_step;
        self
    }

    pub fn then(self, id: &str) -> Self {
        self.next(NextStep::fixed(id))
    }

    pub fn seconds(mut self, estimated_seconds: u32) -> Self {
        self.estimated_seconds = estimated_seconds;
        self
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.dependencies = ids.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn skippable(mut self) -> Self {
        self.skippable = true;
        self
    }

    pub fn tip(mut self, tip: &str) -> Self {
        self.tips.push(tip.to_string());
        self
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.next_step, NextStep::Terminal)
    }
}
