// Workflow Actions - Parameter rendering and loggable summaries

use assistant_shared::{ActionKind, FileOperationKind, HttpMethod};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::conditions::lookup;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([^}]+?)\s*\}\}").expect("placeholder pattern is valid"));

/// Replace `{{field}}` placeholders with values from the event payload.
/// Unknown placeholders are left as written.
pub fn render_placeholders(template: &str, payload: &Value) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &regex::Captures| {
            match lookup(payload, &caps[1]) {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Null) | None => caps[0].to_string(),
                Some(other) => other.to_string(),
            }
        })
        .into_owned()
}

fn render_value(value: &Value, payload: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(render_placeholders(s, payload)),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), render_value(v, payload)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| render_value(v, payload)).collect()),
        _ => value.clone(),
    }
}

/// Render every string parameter of an action against the payload.
pub fn render_action(kind: &ActionKind, payload: &Value) -> Result<ActionKind, serde_json::Error> {
    let raw = serde_json::to_value(kind)?;
    serde_json::from_value(render_value(&raw, payload))
}

/// Short, loggable description of what an action would do.
pub fn describe(kind: &ActionKind) -> String {
    match kind {
        ActionKind::Notification { title, .. } => format!("notify '{}'", title),
        ActionKind::Email { to, subject, .. } => format!("email {} '{}'", to, subject),
        ActionKind::FileOperation {
            operation,
            source,
            destination,
        } => match destination {
            Some(dest) => format!("{} {} -> {}", file_verb(operation), source, dest),
            None => format!("{} {}", file_verb(operation), source),
        },
        ActionKind::ApiCall { url, method, .. } => format!("{} {}", http_verb(method), url),
        ActionKind::TaskCreation { title, .. } => format!("create task '{}'", title),
        ActionKind::CalendarEvent {
            title,
            starts_in_minutes,
            ..
        } => format!("schedule '{}' in {}m", title, starts_in_minutes),
        ActionKind::Backup {
            source,
            destination,
            ..
        } => format!("back up {} to {}", source, destination),
        ActionKind::Reminder {
            message,
            remind_in_minutes,
        } => format!("remind '{}' in {}m", message, remind_in_minutes),
    }
}

fn file_verb(operation: &FileOperationKind) -> &'static str {
    match operation {
        FileOperationKind::Move => "move",
        FileOperationKind::Copy => "copy",
        FileOperationKind::Delete => "delete",
        FileOperationKind::Rename => "rename",
    }
}

fn http_verb(method: &HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "GET",
        HttpMethod::Post => "POST",
        HttpMethod::Put => "PUT",
        HttpMethod::Patch => "PATCH",
        HttpMethod::Delete => "DELETE",
    }
}
