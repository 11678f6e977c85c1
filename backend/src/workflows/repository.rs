// Workflow Repository - Persistence seam for rules and execution records

use assistant_shared::{WorkflowExecution, WorkflowRule};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::WorkflowError;

pub type RepoResult<T> = Result<T, WorkflowError>;

/// Storage for rules and executions. Lists come back in insertion order.
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn list_rules(&self) -> RepoResult<Vec<WorkflowRule>>;

    async fn get_rule(&self, id: Uuid) -> RepoResult<Option<WorkflowRule>>;

    async fn insert_rule(&self, rule: &WorkflowRule) -> RepoResult<()>;

    /// Overwrite the editable fields of an existing rule. Counters and
    /// `last_executed` keep their stored values. Returns false when no rule
    /// has that id.
    async fn save_rule(&self, rule: &WorkflowRule) -> RepoResult<bool>;

    /// Returns true when a rule was removed.
    async fn remove_rule(&self, id: Uuid) -> RepoResult<bool>;

    /// Bump the rule's counters after a finished execution and return the
    /// updated rule, or None if the rule no longer exists.
    async fn record_run(
        &self,
        id: Uuid,
        succeeded: bool,
        at: DateTime<Utc>,
    ) -> RepoResult<Option<WorkflowRule>>;

    async fn list_executions(&self, rule_id: Option<Uuid>) -> RepoResult<Vec<WorkflowExecution>>;

    async fn insert_execution(&self, execution: &WorkflowExecution) -> RepoResult<()>;

    async fn save_execution(&self, execution: &WorkflowExecution) -> RepoResult<()>;
}

/// Serialized form of the memory repository
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub rules: Vec<WorkflowRule>,
    pub executions: Vec<WorkflowExecution>,
}

/// In-process repository, optionally mirrored to a JSON snapshot file after
/// every write.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<Snapshot>,
    snapshot_path: Option<PathBuf>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path` if it exists and persist every change back to it.
    pub async fn with_snapshot_file(path: impl AsRef<Path>) -> RepoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Loaded {} workflow rules and {} executions from {}",
            snapshot.rules.len(),
            snapshot.executions.len(),
            path.display()
        );

        Ok(Self {
            state: RwLock::new(snapshot),
            snapshot_path: Some(path),
        })
    }

    async fn persist(&self, state: &Snapshot) -> RepoResult<()> {
        if let Some(path) = &self.snapshot_path {
            let bytes = serde_json::to_vec_pretty(state)?;
            tokio::fs::write(path, bytes).await?;
            debug!("Workflow snapshot written to {}", path.display());
        }
        Ok(())
    }
}

#[async_trait]
impl WorkflowRepository for MemoryRepository {
    async fn list_rules(&self) -> RepoResult<Vec<WorkflowRule>> {
        Ok(self.state.read().await.rules.clone())
    }

    async fn get_rule(&self, id: Uuid) -> RepoResult<Option<WorkflowRule>> {
        Ok(self.state.read().await.rules.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_rule(&self, rule: &WorkflowRule) -> RepoResult<()> {
        let mut state = self.state.write().await;
        state.rules.push(rule.clone());
        self.persist(&state).await
    }

    async fn save_rule(&self, rule: &WorkflowRule) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        let Some(existing) = state.rules.iter_mut().find(|r| r.id == rule.id) else {
            return Ok(false);
        };
        existing.name = rule.name.clone();
        existing.description = rule.description.clone();
        existing.enabled = rule.enabled;
        existing.priority = rule.priority;
        existing.tags = rule.tags.clone();
        existing.trigger = rule.trigger.clone();
        existing.actions = rule.actions.clone();
        existing.updated_at = rule.updated_at;
        self.persist(&state).await?;
        Ok(true)
    }

    async fn remove_rule(&self, id: Uuid) -> RepoResult<bool> {
        let mut state = self.state.write().await;
        let before = state.rules.len();
        state.rules.retain(|r| r.id != id);
        let removed = state.rules.len() != before;
        if removed {
            self.persist(&state).await?;
        }
        Ok(removed)
    }

    async fn record_run(
        &self,
        id: Uuid,
        succeeded: bool,
        at: DateTime<Utc>,
    ) -> RepoResult<Option<WorkflowRule>> {
        let mut state = self.state.write().await;
        let Some(rule) = state.rules.iter_mut().find(|r| r.id == id) else {
            return Ok(None);
        };
        rule.execution_count += 1;
        if succeeded {
            rule.success_count += 1;
        } else {
            rule.failure_count += 1;
        }
        rule.last_executed = Some(at);
        let updated = rule.clone();
        self.persist(&state).await?;
        Ok(Some(updated))
    }

    async fn list_executions(&self, rule_id: Option<Uuid>) -> RepoResult<Vec<WorkflowExecution>> {
        let state = self.state.read().await;
        Ok(state
            .executions
            .iter()
            .filter(|e| rule_id.is_none_or(|id| e.rule_id == id))
            .cloned()
            .collect())
    }

    async fn insert_execution(&self, execution: &WorkflowExecution) -> RepoResult<()> {
        let mut state = self.state.write().await;
        state.executions.push(execution.clone());
        self.persist(&state).await
    }

    async fn save_execution(&self, execution: &WorkflowExecution) -> RepoResult<()> {
        let mut state = self.state.write().await;
        match state.executions.iter_mut().find(|e| e.id == execution.id) {
            Some(existing) => *existing = execution.clone(),
            None => state.executions.push(execution.clone()),
        }
        self.persist(&state).await
    }
}
