// PostgreSQL-backed workflow repository

use assistant_shared::{
    Priority, Trigger, TriggerType, WorkflowAction, WorkflowExecution, WorkflowRule,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::repository::{RepoResult, WorkflowRepository};
use crate::error::WorkflowError;

const RULE_COLUMNS: &str = r#"
    id, name, description, enabled, priority, tags, trigger, actions,
    execution_count, success_count, failure_count, last_executed, created_at, updated_at
"#;

const EXECUTION_COLUMNS: &str = r#"
    id, rule_id, trigger_type, status, start_time, end_time, error_message, action_results
"#;

type RuleRow = (
    Uuid,
    String,
    Option<String>,
    bool,
    String,
    Vec<String>,
    serde_json::Value,
    serde_json::Value,
    i64,
    i64,
    i64,
    Option<DateTime<Utc>>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

type ExecutionRow = (
    Uuid,
    Uuid,
    String,
    String,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
    Option<String>,
    serde_json::Value,
);

/// Store a unit enum as its serde name, e.g. `Priority::High` -> `high`.
fn enum_to_text<T: Serialize>(value: &T) -> RepoResult<String> {
    Ok(serde_json::to_string(value)?.trim_matches('"').to_string())
}

fn enum_from_text<T: DeserializeOwned>(text: &str) -> RepoResult<T> {
    Ok(serde_json::from_str(&format!("\"{}\"", text))?)
}

fn rule_from_row(row: RuleRow) -> RepoResult<WorkflowRule> {
    let priority: Priority = enum_from_text(&row.4)?;
    let trigger: Trigger = serde_json::from_value(row.6)?;
    let actions: Vec<WorkflowAction> = serde_json::from_value(row.7)?;

    Ok(WorkflowRule {
        id: row.0,
        name: row.1,
        description: row.2,
        enabled: row.3,
        priority,
        tags: row.5.into_iter().collect(),
        trigger,
        actions,
        execution_count: row.8 as u64,
        success_count: row.9 as u64,
        failure_count: row.10 as u64,
        last_executed: row.11,
        created_at: row.12,
        updated_at: row.13,
    })
}

fn execution_from_row(row: ExecutionRow) -> RepoResult<WorkflowExecution> {
    let trigger_type: TriggerType = enum_from_text(&row.2)?;

    Ok(WorkflowExecution {
        id: row.0,
        rule_id: row.1,
        trigger_type,
        status: enum_from_text(&row.3)?,
        start_time: row.4,
        end_time: row.5,
        error_message: row.6,
        action_results: serde_json::from_value(row.7)?,
    })
}

pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowRepository for PgRepository {
    async fn list_rules(&self) -> RepoResult<Vec<WorkflowRule>> {
        let rows = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {} FROM workflow_rules ORDER BY seq ASC",
            RULE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(rule_from_row).collect()
    }

    async fn get_rule(&self, id: Uuid) -> RepoResult<Option<WorkflowRule>> {
        let row = sqlx::query_as::<_, RuleRow>(&format!(
            "SELECT {} FROM workflow_rules WHERE id = $1",
            RULE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(rule_from_row).transpose()
    }

    async fn insert_rule(&self, rule: &WorkflowRule) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_rules
            (id, name, description, enabled, priority, tags, trigger, actions,
             execution_count, success_count, failure_count, last_executed, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(rule.id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.enabled)
        .bind(enum_to_text(&rule.priority)?)
        .bind(rule.tags.iter().cloned().collect::<Vec<String>>())
        .bind(serde_json::to_value(&rule.trigger)?)
        .bind(serde_json::to_value(&rule.actions)?)
        .bind(rule.execution_count as i64)
        .bind(rule.success_count as i64)
        .bind(rule.failure_count as i64)
        .bind(rule.last_executed)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_rule(&self, rule: &WorkflowRule) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_rules
            SET name = $2, description = $3, enabled = $4, priority = $5, tags = $6,
                trigger = $7, actions = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(rule.id)
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(rule.enabled)
        .bind(enum_to_text(&rule.priority)?)
        .bind(rule.tags.iter().cloned().collect::<Vec<String>>())
        .bind(serde_json::to_value(&rule.trigger)?)
        .bind(serde_json::to_value(&rule.actions)?)
        .bind(rule.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn remove_rule(&self, id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM workflow_rules WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn record_run(
        &self,
        id: Uuid,
        succeeded: bool,
        at: DateTime<Utc>,
    ) -> RepoResult<Option<WorkflowRule>> {
        let row = sqlx::query_as::<_, RuleRow>(&format!(
            r#"
            UPDATE workflow_rules
            SET execution_count = execution_count + 1,
                success_count = success_count + CASE WHEN $2 THEN 1 ELSE 0 END,
                failure_count = failure_count + CASE WHEN $2 THEN 0 ELSE 1 END,
                last_executed = $3
            WHERE id = $1
            RETURNING {}
            "#,
            RULE_COLUMNS
        ))
        .bind(id)
        .bind(succeeded)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?;

        row.map(rule_from_row).transpose()
    }

    async fn list_executions(&self, rule_id: Option<Uuid>) -> RepoResult<Vec<WorkflowExecution>> {
        let rows = match rule_id {
            Some(rule_id) => {
                sqlx::query_as::<_, ExecutionRow>(&format!(
                    "SELECT {} FROM workflow_executions WHERE rule_id = $1 ORDER BY seq ASC",
                    EXECUTION_COLUMNS
                ))
                .bind(rule_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ExecutionRow>(&format!(
                    "SELECT {} FROM workflow_executions ORDER BY seq ASC",
                    EXECUTION_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter().map(execution_from_row).collect()
    }

    async fn insert_execution(&self, execution: &WorkflowExecution) -> RepoResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workflow_executions
            (id, rule_id, trigger_type, status, start_time, end_time, error_message, action_results)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(execution.id)
        .bind(execution.rule_id)
        .bind(enum_to_text(&execution.trigger_type)?)
        .bind(enum_to_text(&execution.status)?)
        .bind(execution.start_time)
        .bind(execution.end_time)
        .bind(&execution.error_message)
        .bind(serde_json::to_value(&execution.action_results)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn save_execution(&self, execution: &WorkflowExecution) -> RepoResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_executions
            SET status = $2, end_time = $3, error_message = $4, action_results = $5
            WHERE id = $1
            "#,
        )
        .bind(execution.id)
        .bind(enum_to_text(&execution.status)?)
        .bind(execution.end_time)
        .bind(&execution.error_message)
        .bind(serde_json::to_value(&execution.action_results)?)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(WorkflowError::Database(format!(
                "execution {} was never recorded",
                execution.id
            )));
        }

        Ok(())
    }
}
