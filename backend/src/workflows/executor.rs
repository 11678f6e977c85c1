// Workflow Executor - Runs a rule's actions through an action dispatcher

use assistant_shared::{ActionOutcome, TriggerType, WorkflowAction, WorkflowExecution, WorkflowRule};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::actions::{describe, render_action};

/// Context for one rule execution
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub execution_id: Uuid,
    pub rule_id: Uuid,
    pub trigger_type: TriggerType,
    pub event_payload: serde_json::Value,
}

/// Failure reported by an action executor
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum DispatchError {
    #[error("action rejected: {0}")]
    Rejected(String),

    #[error("{service} unavailable: {message}")]
    Unavailable { service: String, message: String },

    #[error("invalid action parameters: {0}")]
    InvalidParameters(String),
}

/// Hands actions to whatever actually performs them (mailer, webhook client, ...).
#[async_trait]
pub trait ActionDispatcher: Send + Sync {
    async fn dispatch(
        &self,
        action: &WorkflowAction,
        context: &ExecutionContext,
    ) -> Result<serde_json::Value, DispatchError>;
}

/// Records each dispatch through `tracing` and reports it as accepted.
/// Performs no external side effects.
#[derive(Debug, Clone, Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl ActionDispatcher for LoggingDispatcher {
    async fn dispatch(
        &self,
        action: &WorkflowAction,
        context: &ExecutionContext,
    ) -> Result<serde_json::Value, DispatchError> {
        let summary = describe(&action.kind);
        info!(
            execution_id = %context.execution_id,
            rule_id = %context.rule_id,
            action_type = %action.kind.action_type(),
            "Dispatching action '{}': {}",
            action.name,
            summary
        );

        Ok(serde_json::json!({
            "accepted": true,
            "action_type": action.kind.action_type(),
            "summary": summary
        }))
    }
}

pub struct WorkflowExecutor {
    dispatcher: Arc<dyn ActionDispatcher>,
}

impl WorkflowExecutor {
    pub fn new(dispatcher: Arc<dyn ActionDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// Run every enabled action of `rule` in order, recording outcomes on
    /// `execution`. The first failing action stops the run and fails it.
    pub async fn run(
        &self,
        rule: &WorkflowRule,
        execution: &mut WorkflowExecution,
        event_payload: serde_json::Value,
    ) {
        let context = ExecutionContext {
            execution_id: execution.id,
            rule_id: rule.id,
            trigger_type: execution.trigger_type,
            event_payload,
        };

        for action in &rule.actions {
            if !action.enabled {
                execution.action_results.push(ActionOutcome::skipped(action));
                continue;
            }

            let start = Instant::now();
            let result = match render_action(&action.kind, &context.event_payload) {
                Ok(kind) => {
                    let rendered = WorkflowAction {
                        kind,
                        ..action.clone()
                    };
                    self.dispatcher.dispatch(&rendered, &context).await
                }
                Err(e) => Err(DispatchError::InvalidParameters(e.to_string())),
            };
            let duration_ms = start.elapsed().as_millis() as i64;

            match result {
                Ok(output) => {
                    execution
                        .action_results
                        .push(ActionOutcome::success(action, output, duration_ms));
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(
                        "Action '{}' of rule '{}' failed: {}",
                        action.name, rule.name, message
                    );
                    execution
                        .action_results
                        .push(ActionOutcome::failure(action, &message, duration_ms));
                    execution.fail(format!("Action '{}' failed: {}", action.name, message));
                    error!(execution_id = %execution.id, "Workflow '{}' failed", rule.name);
                    return;
                }
            }
        }

        execution.complete();
        info!(execution_id = %execution.id, "Workflow '{}' completed", rule.name);
    }
}
