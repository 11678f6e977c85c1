// Workflow Rule Store - Rule lifecycle, manual execution and event processing

use assistant_shared::{
    utc_now, ExecutionStatus, RuleDraft, RulePatch, WorkflowExecution, WorkflowRule,
    WorkflowTemplate,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::conditions::trigger_matches;
use super::executor::{ActionDispatcher, LoggingDispatcher, WorkflowExecutor};
use super::repository::{MemoryRepository, WorkflowRepository};
use super::templates::builtin_templates;
use super::TriggerEvent;
use crate::error::{ValidationBuilder, WorkflowError};

pub const MAX_NAME_LENGTH: usize = 200;

/// Optional overrides applied when instantiating a template
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateOverrides {
    pub name: Option<String>,
    pub enabled: Option<bool>,
}

pub struct WorkflowRuleStore {
    repository: Arc<dyn WorkflowRepository>,
    executor: WorkflowExecutor,
    templates: Vec<WorkflowTemplate>,
}

impl WorkflowRuleStore {
    pub fn new(repository: Arc<dyn WorkflowRepository>, dispatcher: Arc<dyn ActionDispatcher>) -> Self {
        Self {
            repository,
            executor: WorkflowExecutor::new(dispatcher),
            templates: builtin_templates(),
        }
    }

    /// Store backed by a fresh memory repository and the logging dispatcher
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryRepository::new()), Arc::new(LoggingDispatcher))
    }

    pub async fn create_rule(&self, draft: RuleDraft) -> Result<WorkflowRule, WorkflowError> {
        validate_draft(&draft)?;

        let rule = WorkflowRule::from_draft(draft);
        self.repository.insert_rule(&rule).await?;

        info!(rule_id = %rule.id, "Created workflow rule '{}'", rule.name);
        Ok(rule)
    }

    pub async fn update_rule(&self, id: Uuid, patch: RulePatch) -> Result<WorkflowRule, WorkflowError> {
        let mut rule = self
            .repository
            .get_rule(id)
            .await?
            .ok_or(WorkflowError::NotFound(id))?;

        validate_patch(&patch)?;

        if let Some(name) = patch.name {
            rule.name = name.trim().to_string();
        }
        if let Some(description) = patch.description {
            rule.description = Some(description);
        }
        if let Some(enabled) = patch.enabled {
            rule.enabled = enabled;
        }
        if let Some(priority) = patch.priority {
            rule.priority = priority;
        }
        if let Some(tags) = patch.tags {
            rule.tags = tags;
        }
        if let Some(trigger) = patch.trigger {
            rule.trigger = trigger.into();
        }
        if let Some(actions) = patch.actions {
            rule.actions = actions.into_iter().map(Into::into).collect();
        }
        rule.updated_at = Some(utc_now());

        if !self.repository.save_rule(&rule).await? {
            return Err(WorkflowError::NotFound(id));
        }

        info!(rule_id = %id, "Updated workflow rule '{}'", rule.name);
        // Re-read so counters recorded while the patch was applied come back too
        self.get_rule(id).await
    }

    /// Idempotent: deleting an unknown id is not an error. Returns whether
    /// a rule was removed. Execution history is kept.
    pub async fn delete_rule(&self, id: Uuid) -> Result<bool, WorkflowError> {
        let removed = self.repository.remove_rule(id).await?;
        if removed {
            info!(rule_id = %id, "Deleted workflow rule");
        }
        Ok(removed)
    }

    /// Run a rule now, regardless of its enabled flag.
    pub async fn execute_rule(
        &self,
        id: Uuid,
        context: serde_json::Value,
    ) -> Result<WorkflowExecution, WorkflowError> {
        let rule = self
            .repository
            .get_rule(id)
            .await?
            .ok_or(WorkflowError::NotFound(id))?;

        self.run(&rule, &TriggerEvent::manual(context)).await
    }

    /// Execute every enabled rule whose trigger matches the event, in rule
    /// insertion order.
    pub async fn process_event(&self, event: TriggerEvent) -> Result<Vec<WorkflowExecution>, WorkflowError> {
        info!(
            event_id = %event.event_id,
            "Processing {} event from {:?}",
            event.trigger_type,
            event.source
        );

        let rules = self.repository.list_rules().await?;
        let mut executions = Vec::new();

        for rule in rules.iter().filter(|r| r.enabled && trigger_matches(&r.trigger, &event)) {
            let execution = self.run(rule, &event).await?;
            executions.push(execution);
        }

        Ok(executions)
    }

    async fn run(
        &self,
        rule: &WorkflowRule,
        event: &TriggerEvent,
    ) -> Result<WorkflowExecution, WorkflowError> {
        let mut execution = WorkflowExecution::start(rule.id, event.trigger_type);
        self.repository.insert_execution(&execution).await?;

        self.executor
            .run(rule, &mut execution, event.payload.clone())
            .await;
        self.repository.save_execution(&execution).await?;

        let succeeded = execution.status == ExecutionStatus::Completed;
        let finished_at = execution.end_time.unwrap_or_else(utc_now);
        if self
            .repository
            .record_run(rule.id, succeeded, finished_at)
            .await?
            .is_none()
        {
            warn!(rule_id = %rule.id, "Rule was removed while executing; counters not updated");
        }

        Ok(execution)
    }

    pub async fn get_rules(&self) -> Result<Vec<WorkflowRule>, WorkflowError> {
        self.repository.list_rules().await
    }

    pub async fn get_rule(&self, id: Uuid) -> Result<WorkflowRule, WorkflowError> {
        self.repository
            .get_rule(id)
            .await?
            .ok_or(WorkflowError::NotFound(id))
    }

    pub async fn get_executions(&self) -> Result<Vec<WorkflowExecution>, WorkflowError> {
        self.repository.list_executions(None).await
    }

    pub async fn get_executions_for(&self, rule_id: Uuid) -> Result<Vec<WorkflowExecution>, WorkflowError> {
        self.repository.list_executions(Some(rule_id)).await
    }

    pub fn get_templates(&self) -> &[WorkflowTemplate] {
        &self.templates
    }

    pub async fn create_from_template(
        &self,
        template_id: &str,
        overrides: TemplateOverrides,
    ) -> Result<WorkflowRule, WorkflowError> {
        let template = self
            .templates
            .iter()
            .find(|t| t.id == template_id)
            .ok_or_else(|| WorkflowError::TemplateNotFound(template_id.to_string()))?;

        let mut draft = template.rule.clone();
        if let Some(name) = overrides.name {
            draft.name = name;
        }
        if let Some(enabled) = overrides.enabled {
            draft.enabled = enabled;
        }

        self.create_rule(draft).await
    }
}

fn check_name(builder: ValidationBuilder, name: &str) -> ValidationBuilder {
    let name = name.trim();
    builder
        .check(name.is_empty(), "name", "Name is required")
        .check(
            name.chars().count() > MAX_NAME_LENGTH,
            "name",
            "Name must be 200 characters or less",
        )
}

fn check_action_names<'a>(
    mut builder: ValidationBuilder,
    names: impl Iterator<Item = &'a str>,
) -> ValidationBuilder {
    for (index, name) in names.enumerate() {
        builder = builder.check(
            name.trim().is_empty(),
            &format!("actions[{}].name", index),
            "Action name is required",
        );
    }
    builder
}

pub fn validate_draft(draft: &RuleDraft) -> Result<(), WorkflowError> {
    let builder = check_name(ValidationBuilder::new(), &draft.name).check(
        draft.actions.is_empty(),
        "actions",
        "At least one action is required",
    );
    let builder = check_action_names(builder, draft.actions.iter().map(|a| a.name.as_str()));

    match builder.into_draft_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn validate_patch(patch: &RulePatch) -> Result<(), WorkflowError> {
    let mut builder = ValidationBuilder::new();
    if let Some(name) = &patch.name {
        builder = check_name(builder, name);
    }
    if let Some(actions) = &patch.actions {
        builder = builder.check(actions.is_empty(), "actions", "At least one action is required");
        builder = check_action_names(builder, actions.iter().map(|a| a.name.as_str()));
    }

    match builder.into_draft_error() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
