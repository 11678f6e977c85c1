use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// Current time at microsecond precision, the resolution Postgres keeps.
pub fn utc_now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// Event category that starts a rule's evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Email,
    Calendar,
    File,
    Time,
    Location,
    Webhook,
    Manual,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Calendar => "calendar",
            Self::File => "file",
            Self::Time => "time",
            Self::Location => "location",
            Self::Webhook => "webhook",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    Contains,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
}

/// A single comparison against a field of the trigger event payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerCondition {
    /// Payload field, dot-separated for nested objects
    pub field: String,
    pub operator: ConditionOperator,
    pub value: serde_json::Value,
}

impl TriggerCondition {
    pub fn new(field: &str, operator: ConditionOperator, value: serde_json::Value) -> Self {
        Self {
            field: field.to_string(),
            operator,
            value,
        }
    }

    pub fn equals(field: &str, value: serde_json::Value) -> Self {
        Self::new(field, ConditionOperator::Equals, value)
    }

    pub fn contains(field: &str, value: &str) -> Self {
        Self::new(field, ConditionOperator::Contains, serde_json::Value::String(value.to_string()))
    }

    pub fn starts_with(field: &str, value: &str) -> Self {
        Self::new(field, ConditionOperator::StartsWith, serde_json::Value::String(value.to_string()))
    }

    pub fn ends_with(field: &str, value: &str) -> Self {
        Self::new(field, ConditionOperator::EndsWith, serde_json::Value::String(value.to_string()))
    }

    pub fn greater_than(field: &str, value: f64) -> Self {
        Self::new(field, ConditionOperator::GreaterThan, serde_json::json!(value))
    }

    pub fn less_than(field: &str, value: f64) -> Self {
        Self::new(field, ConditionOperator::LessThan, serde_json::json!(value))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trigger {
    pub id: Uuid,
    pub trigger_type: TriggerType,
    pub conditions: Vec<TriggerCondition>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Notification,
    Email,
    FileOperation,
    ApiCall,
    TaskCreation,
    CalendarEvent,
    Backup,
    Reminder,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::Email => "email",
            Self::FileOperation => "file_operation",
            Self::ApiCall => "api_call",
            Self::TaskCreation => "task_creation",
            Self::CalendarEvent => "calendar_event",
            Self::Backup => "backup",
            Self::Reminder => "reminder",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FileOperationKind {
    Move,
    Copy,
    Delete,
    Rename,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

/// Typed parameters for each action type.
///
/// Serialized as `{"type": "...", "parameters": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "parameters", rename_all = "snake_case")]
pub enum ActionKind {
    Notification {
        title: String,
        message: String,
    },
    Email {
        to: String,
        subject: String,
        body: String,
    },
    FileOperation {
        operation: FileOperationKind,
        source: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        destination: Option<String>,
    },
    ApiCall {
        url: String,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<serde_json::Value>,
    },
    TaskCreation {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notes: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        due_in_hours: Option<u32>,
    },
    CalendarEvent {
        title: String,
        starts_in_minutes: u32,
        duration_minutes: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
    },
    Backup {
        source: String,
        destination: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retention_days: Option<u32>,
    },
    Reminder {
        message: String,
        remind_in_minutes: u32,
    },
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Notification { .. } => ActionType::Notification,
            Self::Email { .. } => ActionType::Email,
            Self::FileOperation { .. } => ActionType::FileOperation,
            Self::ApiCall { .. } => ActionType::ApiCall,
            Self::TaskCreation { .. } => ActionType::TaskCreation,
            Self::CalendarEvent { .. } => ActionType::CalendarEvent,
            Self::Backup { .. } => ActionType::Backup,
            Self::Reminder { .. } => ActionType::Reminder,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowAction {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: ActionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowRule {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub enabled: bool,
    pub priority: Priority,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub trigger: Trigger,
    pub actions: Vec<WorkflowAction>,
    pub execution_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_executed: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkflowRule {
    /// Build a fresh rule from a draft, assigning new ids and zeroed counters.
    pub fn from_draft(draft: RuleDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name.trim().to_string(),
            description: draft.description,
            enabled: draft.enabled,
            priority: draft.priority,
            tags: draft.tags,
            trigger: draft.trigger.into(),
            actions: draft.actions.into_iter().map(WorkflowAction::from).collect(),
            execution_count: 0,
            success_count: 0,
            failure_count: 0,
            last_executed: None,
            created_at: utc_now(),
            updated_at: None,
        }
    }

    /// The editable shape of this rule, without ids and counters.
    pub fn to_draft(&self) -> RuleDraft {
        RuleDraft {
            name: self.name.clone(),
            description: self.description.clone(),
            enabled: self.enabled,
            priority: self.priority,
            tags: self.tags.clone(),
            trigger: TriggerDraft {
                trigger_type: self.trigger.trigger_type,
                conditions: self.trigger.conditions.clone(),
            },
            actions: self
                .actions
                .iter()
                .map(|a| ActionDraft {
                    name: a.name.clone(),
                    description: a.description.clone(),
                    enabled: a.enabled,
                    kind: a.kind.clone(),
                })
                .collect(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TriggerDraft {
    pub trigger_type: TriggerType,
    #[serde(default)]
    pub conditions: Vec<TriggerCondition>,
}

impl TriggerDraft {
    pub fn new(trigger_type: TriggerType) -> Self {
        Self {
            trigger_type,
            conditions: Vec::new(),
        }
    }

    pub fn with_condition(mut self, condition: TriggerCondition) -> Self {
        self.conditions.push(condition);
        self
    }
}

impl From<TriggerDraft> for Trigger {
    fn from(draft: TriggerDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            trigger_type: draft.trigger_type,
            conditions: draft.conditions,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(flatten)]
    pub kind: ActionKind,
}

impl ActionDraft {
    pub fn new(name: &str, kind: ActionKind) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            enabled: true,
            kind,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn notification(title: &str, message: &str) -> Self {
        Self::new(
            "Send Notification",
            ActionKind::Notification {
                title: title.to_string(),
                message: message.to_string(),
            },
        )
    }

    pub fn email(to: &str, subject: &str, body: &str) -> Self {
        Self::new(
            "Send Email",
            ActionKind::Email {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            },
        )
    }

    pub fn move_file(source: &str, destination: &str) -> Self {
        Self::new(
            "Move File",
            ActionKind::FileOperation {
                operation: FileOperationKind::Move,
                source: source.to_string(),
                destination: Some(destination.to_string()),
            },
        )
    }

    pub fn api_call(url: &str, method: HttpMethod, body: Option<serde_json::Value>) -> Self {
        Self::new(
            "Call API",
            ActionKind::ApiCall {
                url: url.to_string(),
                method,
                headers: BTreeMap::new(),
                body,
            },
        )
    }

    pub fn create_task(title: &str, due_in_hours: Option<u32>) -> Self {
        Self::new(
            "Create Task",
            ActionKind::TaskCreation {
                title: title.to_string(),
                notes: None,
                due_in_hours,
            },
        )
    }

    pub fn calendar_event(title: &str, starts_in_minutes: u32, duration_minutes: u32) -> Self {
        Self::new(
            "Create Calendar Event",
            ActionKind::CalendarEvent {
                title: title.to_string(),
                starts_in_minutes,
                duration_minutes,
                location: None,
            },
        )
    }

    pub fn backup(source: &str, destination: &str, retention_days: Option<u32>) -> Self {
        Self::new(
            "Run Backup",
            ActionKind::Backup {
                source: source.to_string(),
                destination: destination.to_string(),
                retention_days,
            },
        )
    }

    pub fn reminder(message: &str, remind_in_minutes: u32) -> Self {
        Self::new(
            "Set Reminder",
            ActionKind::Reminder {
                message: message.to_string(),
                remind_in_minutes,
            },
        )
    }
}

impl From<ActionDraft> for WorkflowAction {
    fn from(draft: ActionDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: draft.name.trim().to_string(),
            description: draft.description,
            enabled: draft.enabled,
            kind: draft.kind,
        }
    }
}

/// Everything needed to create a rule; ids and counters are assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub trigger: TriggerDraft,
    #[serde(default)]
    pub actions: Vec<ActionDraft>,
}

impl RuleDraft {
    pub fn new(name: &str, trigger: TriggerDraft) -> Self {
        Self {
            name: name.to_string(),
            description: None,
            enabled: true,
            priority: Priority::default(),
            tags: BTreeSet::new(),
            trigger,
            actions: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    pub fn with_action(mut self, action: ActionDraft) -> Self {
        self.actions.push(action);
        self
    }
}

/// Partial update; absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RulePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub enabled: Option<bool>,
    pub priority: Option<Priority>,
    pub tags: Option<BTreeSet<String>>,
    pub trigger: Option<TriggerDraft>,
    pub actions: Option<Vec<ActionDraft>>,
}

impl RulePatch {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Outcome of one action within an execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionOutcome {
    pub action_id: Uuid,
    pub action_name: String,
    pub action_type: ActionType,
    pub success: bool,
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: i64,
}

impl ActionOutcome {
    pub fn success(action: &WorkflowAction, output: serde_json::Value, duration_ms: i64) -> Self {
        Self {
            action_id: action.id,
            action_name: action.name.clone(),
            action_type: action.kind.action_type(),
            success: true,
            skipped: false,
            output: Some(output),
            error: None,
            duration_ms,
        }
    }

    pub fn failure(action: &WorkflowAction, error: &str, duration_ms: i64) -> Self {
        Self {
            action_id: action.id,
            action_name: action.name.clone(),
            action_type: action.kind.action_type(),
            success: false,
            skipped: false,
            output: None,
            error: Some(error.to_string()),
            duration_ms,
        }
    }

    pub fn skipped(action: &WorkflowAction) -> Self {
        Self {
            action_id: action.id,
            action_name: action.name.clone(),
            action_type: action.kind.action_type(),
            success: false,
            skipped: true,
            output: None,
            error: None,
            duration_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub rule_id: Uuid,
    pub trigger_type: TriggerType,
    pub status: ExecutionStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub action_results: Vec<ActionOutcome>,
}

impl WorkflowExecution {
    /// New execution record, already in the running state.
    pub fn start(rule_id: Uuid, trigger_type: TriggerType) -> Self {
        Self {
            id: Uuid::new_v4(),
            rule_id,
            trigger_type,
            status: ExecutionStatus::Running,
            start_time: utc_now(),
            end_time: None,
            error_message: None,
            action_results: Vec::new(),
        }
    }

    pub fn complete(&mut self) {
        self.status = ExecutionStatus::Completed;
        self.end_time = Some(utc_now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = ExecutionStatus::Failed;
        self.error_message = Some(error.into());
        self.end_time = Some(utc_now());
    }
}

/// A system-provided starting point for a new rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowTemplate {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub rule: RuleDraft,
}
