use assistant_shared::{
    ActionDraft, ExecutionStatus, RuleDraft, RulePatch, TriggerCondition, TriggerDraft, TriggerType,
    WorkflowRule,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::WorkflowError;
use crate::tests::{fixtures::*, helpers::*};
use crate::workflows::{
    LoggingDispatcher, MemoryRepository, TemplateOverrides, TriggerEvent, WorkflowRuleStore,
};

#[tokio::test]
async fn test_created_rule_ids_are_unique() {
    let store = WorkflowRuleStore::in_memory();
    for _ in 0..20 {
        store.create_rule(manual_draft()).await.unwrap();
    }

    let rules = store.get_rules().await.unwrap();
    let ids: HashSet<Uuid> = rules.iter().map(|r| r.id).collect();
    assert_eq!(rules.len(), 20);
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_create_rule_without_actions_is_rejected() {
    let store = WorkflowRuleStore::in_memory();
    let mut draft = manual_draft();
    draft.actions.clear();

    let result = store.create_rule(draft).await;

    assert!(matches!(result, Err(WorkflowError::InvalidDraft { .. })));
    assert!(store.get_rules().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_disable_leaves_other_fields_untouched() {
    let store = WorkflowRuleStore::in_memory();
    let created = store.create_rule(kitchen_sink_draft()).await.unwrap();

    store
        .update_rule(created.id, RulePatch::enabled(false))
        .await
        .unwrap();

    let rules = store.get_rules().await.unwrap();
    let stored = rules.iter().find(|r| r.id == created.id).unwrap();
    assert!(!stored.enabled);
    assert!(stored.updated_at.is_some());

    let expected = WorkflowRule {
        enabled: false,
        updated_at: stored.updated_at,
        ..created
    };
    assert_eq!(*stored, expected);
}

#[tokio::test]
async fn test_update_unknown_rule_is_not_found() {
    let store = WorkflowRuleStore::in_memory();
    let id = Uuid::new_v4();

    let result = store.update_rule(id, RulePatch::enabled(true)).await;

    assert!(matches!(result, Err(WorkflowError::NotFound(missing)) if missing == id));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let store = WorkflowRuleStore::in_memory();
    let rule = store.create_rule(manual_draft()).await.unwrap();
    let keep = store.create_rule(manual_draft()).await.unwrap();

    assert!(store.delete_rule(rule.id).await.unwrap());
    assert!(!store.delete_rule(rule.id).await.unwrap());

    let ids: Vec<Uuid> = store.get_rules().await.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![keep.id]);
}

#[tokio::test]
async fn test_execute_increments_count_and_appends_one_execution() {
    let store = WorkflowRuleStore::in_memory();
    let rule = store.create_rule(manual_draft()).await.unwrap();

    let execution = store
        .execute_rule(rule.id, json!({ "subject": "Quarterly numbers" }))
        .await
        .unwrap();

    assert_eq!(execution.rule_id, rule.id);
    assert_eq!(execution.trigger_type, TriggerType::Manual);
    assert_eq!(execution.status, ExecutionStatus::Completed);
    assert!(execution.end_time.is_some());

    let updated = store.get_rule(rule.id).await.unwrap();
    assert_eq!(updated.execution_count, 1);
    assert_eq!(updated.success_count, 1);
    assert!(updated.last_executed.is_some());

    let executions = store.get_executions().await.unwrap();
    assert_eq!(executions, vec![execution]);
}

#[tokio::test]
async fn test_disabled_rule_can_still_be_executed_manually() {
    let store = WorkflowRuleStore::in_memory();
    let mut draft = manual_draft();
    draft.enabled = false;
    let rule = store.create_rule(draft).await.unwrap();

    let execution = store.execute_rule(rule.id, json!({})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_boss_email_alert_scenario() {
    let store = WorkflowRuleStore::in_memory();
    store.create_rule(boss_alert_draft()).await.unwrap();

    let rules = store.get_rules().await.unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].name, "Boss Email Alert");
    assert_eq!(rules[0].trigger.trigger_type, TriggerType::Email);
    assert_eq!(rules[0].trigger.conditions.len(), 1);
    assert_eq!(rules[0].actions.len(), 1);
}

#[tokio::test]
async fn test_execute_unknown_rule_leaves_history_alone() {
    let store = WorkflowRuleStore::in_memory();
    let rule = store.create_rule(manual_draft()).await.unwrap();
    store.execute_rule(rule.id, json!({})).await.unwrap();

    let missing = Uuid::new_v4();
    let result = store.execute_rule(missing, json!({})).await;

    assert!(matches!(result, Err(WorkflowError::NotFound(id)) if id == missing));
    assert_eq!(store.get_executions().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_snapshot_reload_preserves_rules_field_for_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("workflows.json");

    let (rule, execution) = {
        let repo = MemoryRepository::with_snapshot_file(&path).await.unwrap();
        let store = WorkflowRuleStore::new(Arc::new(repo), Arc::new(LoggingDispatcher));
        let rule = store.create_rule(kitchen_sink_draft()).await.unwrap();
        let execution = store.execute_rule(rule.id, json!({ "id": 7 })).await.unwrap();
        (store.get_rule(rule.id).await.unwrap(), execution)
    };

    let repo = MemoryRepository::with_snapshot_file(&path).await.unwrap();
    let store = WorkflowRuleStore::new(Arc::new(repo), Arc::new(LoggingDispatcher));

    assert_eq!(store.get_rule(rule.id).await.unwrap(), rule);
    assert_eq!(store.get_executions_for(rule.id).await.unwrap(), vec![execution]);
}

#[tokio::test]
async fn test_failed_action_fails_the_execution() {
    let store = failing_store();
    let draft = manual_draft()
        .with_action(ActionDraft::new("fail loudly", ActionDraft::reminder("x", 1).kind))
        .with_action(ActionDraft::reminder("never reached", 1));
    let rule = store.create_rule(draft).await.unwrap();

    let execution = store.execute_rule(rule.id, json!({})).await.unwrap();

    assert_eq!(execution.status, ExecutionStatus::Failed);
    assert!(execution.error_message.as_deref().unwrap().contains("fail loudly"));
    assert_eq!(execution.action_results.len(), 2);
    assert!(execution.action_results[0].success);
    assert!(!execution.action_results[1].success);

    let updated = store.get_rule(rule.id).await.unwrap();
    assert_eq!(updated.failure_count, 1);
    assert_eq!(updated.success_count, 0);
}

#[tokio::test]
async fn test_counters_add_up_after_mixed_runs() {
    let store = failing_store();
    let good = store.create_rule(manual_draft()).await.unwrap();
    let bad = store
        .create_rule(
            manual_draft().with_action(ActionDraft::new("fail", ActionDraft::reminder("x", 1).kind)),
        )
        .await
        .unwrap();

    for _ in 0..3 {
        store.execute_rule(good.id, json!({})).await.unwrap();
        store.execute_rule(bad.id, json!({})).await.unwrap();
    }
    store.execute_rule(good.id, json!({})).await.unwrap();

    for rule in store.get_rules().await.unwrap() {
        assert_eq!(rule.execution_count, rule.success_count + rule.failure_count);
    }
    let good = store.get_rule(good.id).await.unwrap();
    assert_eq!((good.execution_count, good.success_count), (4, 4));
    let bad = store.get_rule(bad.id).await.unwrap();
    assert_eq!((bad.execution_count, bad.failure_count), (3, 3));

    assert_eq!(store.get_executions_for(bad.id).await.unwrap().len(), 3);
    assert_eq!(store.get_executions().await.unwrap().len(), 7);
}

#[tokio::test]
async fn test_process_event_runs_matching_enabled_rules_only() {
    let store = WorkflowRuleStore::in_memory();
    let boss = store.create_rule(boss_alert_draft()).await.unwrap();

    let mut disabled = boss_alert_draft();
    disabled.enabled = false;
    store.create_rule(disabled).await.unwrap();

    store
        .create_rule(notification_draft(TriggerType::Calendar))
        .await
        .unwrap();
    let catch_all = store
        .create_rule(notification_draft(TriggerType::Email))
        .await
        .unwrap();

    let executions = store
        .process_event(TriggerEvent::email_received(
            "Boss@Corp.com",
            "Budget",
            "Please review",
        ))
        .await
        .unwrap();

    let rule_ids: Vec<Uuid> = executions.iter().map(|e| e.rule_id).collect();
    assert_eq!(rule_ids, vec![boss.id, catch_all.id]);
    assert!(executions.iter().all(|e| e.trigger_type == TriggerType::Email));

    let none = store
        .process_event(TriggerEvent::email_received("friend@home.net", "Hi", ""))
        .await
        .unwrap();
    assert_eq!(none.len(), 1);
    assert_eq!(none[0].rule_id, catch_all.id);
}

#[tokio::test]
async fn test_conditions_all_must_match() {
    let store = WorkflowRuleStore::in_memory();
    let draft = RuleDraft {
        trigger: TriggerDraft::new(TriggerType::File)
            .with_condition(TriggerCondition::ends_with("path", ".pdf"))
            .with_condition(TriggerCondition::greater_than("size_bytes", 1024.0)),
        ..manual_draft()
    };
    store.create_rule(draft).await.unwrap();

    let small = store
        .process_event(TriggerEvent::file_created("/downloads/a.pdf", 10))
        .await
        .unwrap();
    let large = store
        .process_event(TriggerEvent::file_created("/downloads/a.pdf", 4096))
        .await
        .unwrap();

    assert!(small.is_empty());
    assert_eq!(large.len(), 1);
}

#[tokio::test]
async fn test_template_instantiation_matches_template_shape() {
    let store = WorkflowRuleStore::in_memory();

    for template in store.get_templates().to_vec() {
        let rule = store
            .create_from_template(&template.id, TemplateOverrides::default())
            .await
            .unwrap();
        assert_eq!(rule.to_draft(), template.rule);
    }

    assert_eq!(store.get_rules().await.unwrap().len(), store.get_templates().len());
}

#[tokio::test]
async fn test_template_overrides_and_unknown_template() {
    let store = WorkflowRuleStore::in_memory();

    let rule = store
        .create_from_template(
            "daily-backup",
            TemplateOverrides {
                name: Some("Nightly Photos".to_string()),
                enabled: Some(false),
            },
        )
        .await
        .unwrap();
    assert_eq!(rule.name, "Nightly Photos");
    assert!(!rule.enabled);

    let result = store
        .create_from_template("no-such-template", TemplateOverrides::default())
        .await;
    assert!(matches!(result, Err(WorkflowError::TemplateNotFound(_))));
}

#[tokio::test]
async fn test_update_replaces_trigger_and_actions_but_keeps_counters() {
    let store = WorkflowRuleStore::in_memory();
    let rule = store.create_rule(manual_draft()).await.unwrap();
    store.execute_rule(rule.id, json!({})).await.unwrap();
    store.execute_rule(rule.id, json!({})).await.unwrap();

    let patch = RulePatch {
        trigger: Some(
            TriggerDraft::new(TriggerType::Email)
                .with_condition(TriggerCondition::contains("subject", "invoice")),
        ),
        actions: Some(vec![
            ActionDraft::reminder("Pay it", 30),
            ActionDraft::notification("Invoice in", "{{subject}}"),
        ]),
        ..Default::default()
    };
    let updated = store.update_rule(rule.id, patch).await.unwrap();

    assert_eq!(updated.trigger.trigger_type, TriggerType::Email);
    assert_ne!(updated.trigger.id, rule.trigger.id);
    assert_eq!(updated.actions.len(), 2);
    let old_ids: HashSet<Uuid> = rule.actions.iter().map(|a| a.id).collect();
    assert!(updated.actions.iter().all(|a| !old_ids.contains(&a.id)));
    assert_ne!(updated.actions[0].id, updated.actions[1].id);
    assert_eq!(updated.execution_count, 2);
    assert_eq!(updated.success_count, 2);
    assert!(updated.last_executed.is_some());
    assert_eq!(store.get_rule(rule.id).await.unwrap(), updated);

    let result = store
        .update_rule(
            rule.id,
            RulePatch {
                actions: Some(vec![]),
                ..Default::default()
            },
        )
        .await;
    assert!(matches!(result, Err(WorkflowError::InvalidDraft { .. })));
    assert_eq!(store.get_rule(rule.id).await.unwrap(), updated);
}

#[tokio::test]
async fn test_calendar_event_runs_meeting_reminder() {
    let store = WorkflowRuleStore::in_memory();
    let rule = store
        .create_from_template("meeting-reminder", TemplateOverrides::default())
        .await
        .unwrap();

    let soon = store
        .process_event(TriggerEvent::calendar_event_starting("Standup", 10))
        .await
        .unwrap();
    let later = store
        .process_event(TriggerEvent::calendar_event_starting("Planning", 30))
        .await
        .unwrap();

    assert_eq!(soon.len(), 1);
    assert_eq!(soon[0].rule_id, rule.id);
    assert_eq!(soon[0].trigger_type, TriggerType::Calendar);
    assert!(later.is_empty());
}

#[tokio::test]
async fn test_webhook_event_runs_forwarder() {
    let store = WorkflowRuleStore::in_memory();
    let rule = store
        .create_from_template("webhook-forwarder", TemplateOverrides::default())
        .await
        .unwrap();

    let executions = store
        .process_event(TriggerEvent::webhook_received("github", json!({ "action": "opened" })))
        .await
        .unwrap();

    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].rule_id, rule.id);
    assert_eq!(executions[0].status, ExecutionStatus::Completed);
}

#[tokio::test]
async fn test_location_and_schedule_events_match_on_payload() {
    let store = WorkflowRuleStore::in_memory();
    let office = store
        .create_rule(RuleDraft {
            trigger: TriggerDraft::new(TriggerType::Location)
                .with_condition(TriggerCondition::equals("place", json!("Office"))),
            ..manual_draft()
        })
        .await
        .unwrap();
    let nightly = store
        .create_rule(RuleDraft {
            trigger: TriggerDraft::new(TriggerType::Time)
                .with_condition(TriggerCondition::equals("schedule", json!("nightly"))),
            ..manual_draft()
        })
        .await
        .unwrap();

    let arrived = store
        .process_event(TriggerEvent::location_entered("office", 52.52, 13.40))
        .await
        .unwrap();
    let home = store
        .process_event(TriggerEvent::location_entered("Home", 52.50, 13.30))
        .await
        .unwrap();
    assert_eq!(arrived.len(), 1);
    assert_eq!(arrived[0].rule_id, office.id);
    assert!(home.is_empty());

    let tick = store
        .process_event(TriggerEvent::schedule_tick("nightly"))
        .await
        .unwrap();
    let hourly = store
        .process_event(TriggerEvent::schedule_tick("hourly"))
        .await
        .unwrap();
    assert_eq!(tick.len(), 1);
    assert_eq!(tick[0].rule_id, nightly.id);
    assert_eq!(tick[0].trigger_type, TriggerType::Time);
    assert!(hourly.is_empty());
}
