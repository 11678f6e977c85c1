// Workflow Triggers - Events that a trigger source hands to the rule store

use assistant_shared::TriggerType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload for trigger events
pub type EventPayload = serde_json::Value;

/// An event that can start rule executions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    #[serde(default = "Uuid::new_v4")]
    pub event_id: Uuid,
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub payload: EventPayload,
    #[serde(default)]
    pub source: EventSource,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

/// Where the event came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    #[default]
    User,
    System,
    Api,
    Mailbox,
    Calendar,
    FileWatcher,
    Scheduler,
    Geofence,
    Webhook,
}

impl TriggerEvent {
    pub fn new(trigger_type: TriggerType, payload: EventPayload, source: EventSource) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            trigger_type,
            payload,
            source,
            timestamp: Utc::now(),
        }
    }

    /// The event recorded when a user presses "execute" on a rule
    pub fn manual(payload: EventPayload) -> Self {
        Self::new(TriggerType::Manual, payload, EventSource::User)
    }

    pub fn email_received(from: &str, subject: &str, body_preview: &str) -> Self {
        Self::new(
            TriggerType::Email,
            serde_json::json!({
                "from": from,
                "subject": subject,
                "body_preview": body_preview
            }),
            EventSource::Mailbox,
        )
    }

    pub fn calendar_event_starting(title: &str, minutes_until_start: i64) -> Self {
        Self::new(
            TriggerType::Calendar,
            serde_json::json!({
                "title": title,
                "minutes_until_start": minutes_until_start
            }),
            EventSource::Calendar,
        )
    }

    pub fn file_created(path: &str, size_bytes: u64) -> Self {
        let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
        Self::new(
            TriggerType::File,
            serde_json::json!({
                "path": path,
                "name": name,
                "size_bytes": size_bytes
            }),
            EventSource::FileWatcher,
        )
    }

    pub fn schedule_tick(schedule_name: &str) -> Self {
        let now = Utc::now();
        Self::new(
            TriggerType::Time,
            serde_json::json!({
                "schedule": schedule_name,
                "hour": now.format("%H").to_string(),
                "weekday": now.format("%A").to_string()
            }),
            EventSource::Scheduler,
        )
    }

    pub fn location_entered(place: &str, latitude: f64, longitude: f64) -> Self {
        Self::new(
            TriggerType::Location,
            serde_json::json!({
                "place": place,
                "latitude": latitude,
                "longitude": longitude
            }),
            EventSource::Geofence,
        )
    }

    pub fn webhook_received(hook: &str, body: serde_json::Value) -> Self {
        Self::new(
            TriggerType::Webhook,
            serde_json::json!({
                "hook": hook,
                "body": body
            }),
            EventSource::Webhook,
        )
    }
}
