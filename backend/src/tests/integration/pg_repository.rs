use assistant_shared::{utc_now, ExecutionStatus, TriggerType, WorkflowExecution, WorkflowRule};

use crate::tests::{fixtures::*, test_pool};
use crate::workflows::{PgRepository, WorkflowRepository};

// These run only against a real database: set TEST_DATABASE_URL.

#[tokio::test]
async fn test_pg_rule_round_trip() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repo = PgRepository::new(pool);

    let rule = WorkflowRule::from_draft(kitchen_sink_draft());
    repo.insert_rule(&rule).await.unwrap();

    let loaded = repo.get_rule(rule.id).await.unwrap().unwrap();
    assert_eq!(loaded, rule);

    let at = utc_now();
    let updated = repo.record_run(rule.id, false, at).await.unwrap().unwrap();
    assert_eq!(updated.execution_count, 1);
    assert_eq!(updated.failure_count, 1);
    assert_eq!(updated.last_executed, Some(at));

    assert!(repo.remove_rule(rule.id).await.unwrap());
    assert!(!repo.remove_rule(rule.id).await.unwrap());
    assert!(repo.get_rule(rule.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_pg_execution_lifecycle() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repo = PgRepository::new(pool);

    let rule = WorkflowRule::from_draft(manual_draft());
    repo.insert_rule(&rule).await.unwrap();

    let mut execution = WorkflowExecution::start(rule.id, TriggerType::Manual);
    repo.insert_execution(&execution).await.unwrap();
    execution.complete();
    repo.save_execution(&execution).await.unwrap();

    let executions = repo.list_executions(Some(rule.id)).await.unwrap();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].status, ExecutionStatus::Completed);
    assert_eq!(executions[0], execution);

    repo.remove_rule(rule.id).await.unwrap();
    // history survives rule deletion
    assert_eq!(repo.list_executions(Some(rule.id)).await.unwrap().len(), 1);
}
