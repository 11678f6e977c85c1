// Workflow Automation Engine
//
// Rule store for the assistant: triggers, conditions and actions, with an
// append-only execution history.

pub mod actions;
pub mod conditions;
pub mod executor;
pub mod postgres;
pub mod repository;
pub mod store;
pub mod templates;
pub mod triggers;

pub use executor::LoggingDispatcher;
pub use postgres::PgRepository;
pub use repository::{MemoryRepository, WorkflowRepository};
pub use store::{TemplateOverrides, WorkflowRuleStore};
pub use triggers::TriggerEvent;
