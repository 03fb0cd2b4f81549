//! Answer validation against a step's rules.

use serde_json::Value;

use super::step::{RuleKind, StepDefinition, ValidationRule};

/// Evaluate every rule of `step` against `response` and collect the messages
/// of all failing rules, in rule order.
pub fn validate_response(step: &StepDefinition, response: &Value) -> Vec<String> {
    step.validation_rules
        .iter()
        .filter(|rule| !rule_passes(rule, response))
        .map(|rule| rule.message.clone())
        .collect()
}

fn rule_passes(rule: &ValidationRule, response: &Value) -> bool {
    let target = match &rule.field {
        Some(field) => response.get(field).unwrap_or(&Value::Null),
        None => response,
    };

    match &rule.kind {
        RuleKind::Required => !is_empty(target),
        RuleKind::Min(bound) => measure(target).is_none_or(|m| m >= *bound),
        RuleKind::Max(bound) => measure(target).is_none_or(|m| m <= *bound),
        RuleKind::Pattern(regex) => target.as_str().is_none_or(|s| regex.is_match(s)),
    }
}

/// Null, blank strings, and empty collections count as no answer.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// The quantity min/max compare: character count for strings, length for
/// lists, the value itself for numbers. Other shapes are not bounded.
fn measure(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => Some(s.chars().count() as f64),
        Value::Array(items) => Some(items.len() as f64),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::onboarding::step::InputKind;

    fn name_step() -> StepDefinition {
        StepDefinition::new("welcome", InputKind::Text, "Name?")
            .rule(ValidationRule::required("required"))
            .rule(ValidationRule::min(2.0, "too short"))
            .rule(ValidationRule::pattern(r"^[A-Za-z]+$", "letters only").unwrap())
    }

    #[test]
    fn required_rejects_empty_shapes() {
        let step = StepDefinition::new("s", InputKind::Text, "?")
            .rule(ValidationRule::required("required"));
        for empty in [Value::Null, json!(""), json!("   "), json!([]), json!({})] {
            assert_eq!(validate_response(&step, &empty), vec!["required"], "{empty}");
        }
        for present in [json!("x"), json!(0), json!(false), json!(["a"])] {
            assert!(validate_response(&step, &present).is_empty(), "{present}");
        }
    }

    #[test]
    fn collects_every_failure_in_rule_order() {
        let errors = validate_response(&name_step(), &json!("7"));
        assert_eq!(errors, vec!["too short", "letters only"]);
    }

    #[test]
    fn null_fails_required_only() {
        let errors = validate_response(&name_step(), &Value::Null);
        assert_eq!(errors, vec!["required"]);
    }

    #[test]
    fn min_max_on_numbers() {
        let step = StepDefinition::new("sleep", InputKind::Slider, "?")
            .rule(ValidationRule::min(3.0, "low"))
            .rule(ValidationRule::max(14.0, "high"));
        assert_eq!(validate_response(&step, &json!(2)), vec!["low"]);
        assert_eq!(validate_response(&step, &json!(15.5)), vec!["high"]);
        assert!(validate_response(&step, &json!(8)).is_empty());
        assert!(validate_response(&step, &json!(3)).is_empty());
    }

    #[test]
    fn min_max_count_characters_not_bytes() {
        let step = StepDefinition::new("welcome", InputKind::Text, "?")
            .rule(ValidationRule::max(3.0, "long"));
        assert!(validate_response(&step, &json!("Zoé")).is_empty());
    }

    #[test]
    fn min_max_on_lists() {
        let step = StepDefinition::new("goals", InputKind::MultiChoice, "?")
            .rule(ValidationRule::max(2.0, "too many"));
        assert_eq!(validate_response(&step, &json!(["a", "b", "c"])), vec!["too many"]);
        assert!(validate_response(&step, &json!(["a"])).is_empty());
    }

    #[test]
    fn field_rules_apply_to_form_members() {
        let step = StepDefinition::new("personal-info", InputKind::Form, "?")
            .rule(ValidationRule::required("info required"))
            .rule(ValidationRule::required("age required").on_field("age"))
            .rule(ValidationRule::min(13.0, "too young").on_field("age"));

        assert_eq!(
            validate_response(&step, &json!({"gender": "male"})),
            vec!["age required"]
        );
        assert_eq!(validate_response(&step, &json!({"age": 9})), vec!["too young"]);
        assert!(validate_response(&step, &json!({"age": 30})).is_empty());
        assert_eq!(
            validate_response(&step, &Value::Null),
            vec!["info required", "age required"]
        );
    }

    #[test]
    fn revalidation_is_idempotent() {
        let step = name_step();
        let response = json!("1");
        assert_eq!(
            validate_response(&step, &response),
            validate_response(&step, &response)
        );
    }
}
