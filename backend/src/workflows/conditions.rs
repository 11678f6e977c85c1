// Workflow Conditions - Matching trigger conditions against event payloads

use assistant_shared::{ConditionOperator, Trigger, TriggerCondition};
use serde_json::Value;

use super::TriggerEvent;

/// Resolve a dot-separated path inside a JSON object.
pub fn lookup<'a>(payload: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(payload, |current, segment| current.get(segment))
}

/// Evaluate one condition. Missing fields and type mismatches never match.
pub fn condition_matches(condition: &TriggerCondition, payload: &Value) -> bool {
    let Some(field_value) = lookup(payload, &condition.field) else {
        return false;
    };

    match condition.operator {
        ConditionOperator::Equals => match (field_value.as_str(), condition.value.as_str()) {
            (Some(_), Some(_)) => compare_strings(field_value, &condition.value, |s, p| s == p),
            _ => match (as_number(field_value), as_number(&condition.value)) {
                (Some(v), Some(c)) => v == c,
                _ => field_value == &condition.value,
            },
        },
        ConditionOperator::Contains => {
            compare_strings(field_value, &condition.value, |s, p| s.contains(p))
        }
        ConditionOperator::StartsWith => {
            compare_strings(field_value, &condition.value, |s, p| s.starts_with(p))
        }
        ConditionOperator::EndsWith => {
            compare_strings(field_value, &condition.value, |s, p| s.ends_with(p))
        }
        ConditionOperator::GreaterThan => {
            match (as_number(field_value), as_number(&condition.value)) {
                (Some(v), Some(c)) => v > c,
                _ => false,
            }
        }
        ConditionOperator::LessThan => {
            match (as_number(field_value), as_number(&condition.value)) {
                (Some(v), Some(c)) => v < c,
                _ => false,
            }
        }
    }
}

/// A trigger matches an event of the same type when every condition holds.
/// A trigger without conditions matches every event of its type.
pub fn trigger_matches(trigger: &Trigger, event: &TriggerEvent) -> bool {
    trigger.trigger_type == event.trigger_type
        && trigger
            .conditions
            .iter()
            .all(|c| condition_matches(c, &event.payload))
}

fn compare_strings(field_value: &Value, pattern: &Value, op: impl Fn(&str, &str) -> bool) -> bool {
    match (field_value.as_str(), pattern.as_str()) {
        (Some(s), Some(p)) => op(&s.to_lowercase(), &p.to_lowercase()),
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
