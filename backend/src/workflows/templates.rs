// Built-in workflow templates offered as starting points for new rules

use assistant_shared::{
    ActionDraft, HttpMethod, Priority, RuleDraft, TriggerCondition, TriggerDraft, TriggerType,
    WorkflowTemplate,
};

fn template(id: &str, category: &str, description: &str, rule: RuleDraft) -> WorkflowTemplate {
    WorkflowTemplate {
        id: id.to_string(),
        name: rule.name.clone(),
        description: description.to_string(),
        category: category.to_string(),
        rule,
    }
}

/// The system-provided catalog, in display order.
pub fn builtin_templates() -> Vec<WorkflowTemplate> {
    vec![
        template(
            "boss-email-alert",
            "email",
            "Get a notification whenever your manager emails you",
            RuleDraft::new(
                "Boss Email Alert",
                TriggerDraft::new(TriggerType::Email)
                    .with_condition(TriggerCondition::contains("from", "boss@")),
            )
            .with_priority(Priority::High)
            .with_tag("email")
            .with_action(ActionDraft::notification(
                "Email from your boss",
                "{{subject}}",
            )),
        ),
        template(
            "daily-backup",
            "files",
            "Back up your documents folder every night",
            RuleDraft::new(
                "Daily Backup",
                TriggerDraft::new(TriggerType::Time)
                    .with_condition(TriggerCondition::equals("hour", serde_json::json!("02"))),
            )
            .with_tag("backup")
            .with_action(ActionDraft::backup("~/Documents", "~/Backups/documents", Some(30)))
            .with_action(ActionDraft::notification("Backup finished", "Documents were backed up")),
        ),
        template(
            "meeting-reminder",
            "calendar",
            "Remind yourself shortly before meetings start",
            RuleDraft::new(
                "Meeting Reminder",
                TriggerDraft::new(TriggerType::Calendar)
                    .with_condition(TriggerCondition::less_than("minutes_until_start", 16.0)),
            )
            .with_tag("calendar")
            .with_action(ActionDraft::reminder("{{title}} starts soon", 10)),
        ),
        template(
            "invoice-filing",
            "files",
            "File downloaded invoices and add a task to pay them",
            RuleDraft::new(
                "Invoice Filing",
                TriggerDraft::new(TriggerType::File)
                    .with_condition(TriggerCondition::starts_with("name", "invoice"))
                    .with_condition(TriggerCondition::ends_with("name", ".pdf")),
            )
            .with_tag("finance")
            .with_action(ActionDraft::move_file("{{path}}", "~/Documents/Invoices/{{name}}"))
            .with_action(ActionDraft::create_task("Pay invoice {{name}}", Some(72))),
        ),
        template(
            "webhook-forwarder",
            "integrations",
            "Forward incoming webhook bodies to another service",
            RuleDraft::new("Webhook Forwarder", TriggerDraft::new(TriggerType::Webhook))
                .with_priority(Priority::Low)
                .with_tag("integration")
                .with_action(ActionDraft::api_call(
                    "https://example.com/hooks/forward",
                    HttpMethod::Post,
                    Some(serde_json::json!({ "hook": "{{hook}}", "body": "{{body}}" })),
                )),
        ),
    ]
}
